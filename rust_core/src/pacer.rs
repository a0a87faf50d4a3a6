//! Fixed delay between successive processed candidates in batch mode.

use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

/// Default spacing between enrichment calls.
pub const DEFAULT_PACE_DELAY: Duration = Duration::from_secs(2);

#[derive(Debug)]
pub struct Pacer {
    delay: Duration,
    started: bool,
}

impl Pacer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            started: false,
        }
    }

    /// Call before each processed candidate. The first call returns
    /// immediately; later calls sleep for the configured delay.
    pub async fn wait_turn(&mut self) {
        if !self.started {
            self.started = true;
            return;
        }
        if self.delay.is_zero() {
            return;
        }
        debug!("pacing for {}ms", self.delay.as_millis());
        sleep(self.delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[tokio::test]
    async fn test_first_turn_is_immediate() {
        let mut pacer = Pacer::new(Duration::from_secs(30));
        let start = Instant::now();
        pacer.wait_turn().await;
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_delay_between_turns() {
        let mut pacer = Pacer::new(Duration::from_millis(20));
        let start = Instant::now();
        for _ in 0..3 {
            pacer.wait_turn().await;
        }
        assert!(start.elapsed() >= Duration::from_millis(40));
    }

    #[tokio::test]
    async fn test_zero_delay_never_sleeps() {
        let mut pacer = Pacer::new(Duration::ZERO);
        let start = Instant::now();
        for _ in 0..100 {
            pacer.wait_turn().await;
        }
        assert!(start.elapsed() < Duration::from_secs(1));
    }
}
