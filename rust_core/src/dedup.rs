//! Already-processed checks.
//!
//! A check is a single read against the store. It is advisory: nothing stops
//! another run from writing the same record between this read and our own
//! write (see [`crate::db`]).

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};

use crate::db::RecordStore;
use crate::models::Candidate;

/// Default recency window for the windowed policy.
pub const DEFAULT_WINDOW_HOURS: i64 = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DedupPolicy {
    /// Excluded if a processed marker exists, regardless of age.
    Permanent,
    /// Excluded if a feed entry was created within the window.
    Windowed { window: Duration },
}

impl DedupPolicy {
    /// Whether `candidate` was already processed as of `now`.
    pub async fn is_processed(
        &self,
        store: &dyn RecordStore,
        candidate: &Candidate,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        match self {
            DedupPolicy::Permanent => store.marker_exists(&candidate.id).await,
            DedupPolicy::Windowed { window } => {
                store.feed_entry_since(&candidate.id, now - *window).await
            }
        }
    }
}
