//! Fetch → validate → dedup → enrich → sink → record.
//!
//! One pipeline serves both run modes. The [`Sink`] picks the mode:
//!
//! | Mode            | Selection            | Dedup policy | Record            | Pacer |
//! |-----------------|----------------------|--------------|-------------------|-------|
//! | `SinglePublish` | first eligible       | permanent    | `ProcessedMarker` | off   |
//! | `BatchLog`      | up to `batch_size`   | windowed     | `FeedEntry`       | on    |
//!
//! Candidates are processed one at a time. Nothing here prevents two
//! overlapping runs from selecting the same candidate; serialize invocations
//! externally if that matters.

use anyhow::anyhow;
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::clients::polymarket::MarketFeed;
use crate::db::RecordStore;
use crate::dedup::{DedupPolicy, DEFAULT_WINDOW_HOURS};
use crate::enrichment::{Enricher, EnrichmentStatus};
use crate::error::PipelineError;
use crate::models::{Candidate, NormalizedMarket};
use crate::pacer::{Pacer, DEFAULT_PACE_DELAY};
use crate::sink::{self, Sink};
use crate::validation::validate_candidate;

pub const NO_ELIGIBLE_MESSAGE: &str = "No eligible candidate found";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    SinglePublish,
    BatchLog,
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Candidates requested from the feed
    pub fetch_limit: usize,
    /// Max candidates enriched and logged per batch run
    pub batch_size: usize,
    /// Recency window for batch-mode dedup
    pub dedup_window: chrono::Duration,
    /// Spacing between processed candidates in batch mode
    pub pace_delay: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            fetch_limit: 10,
            batch_size: 5,
            dedup_window: chrono::Duration::hours(DEFAULT_WINDOW_HOURS),
            pace_delay: DEFAULT_PACE_DELAY,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub fetched: usize,
    pub validation_skips: usize,
    pub dedup_skips: usize,
    /// Candidates skipped because the dedup read itself failed
    pub dedup_errors: usize,
    pub enrichment_degraded: usize,
    pub processed: usize,
    /// Batch mode: candidates whose feed entry could not be written
    pub failed: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunReport {
    Published {
        event_id: String,
        title: String,
        post_id: String,
        /// Set when the post went out but its processed marker was not written
        record_warning: Option<String>,
        stats: RunStats,
    },
    Logged {
        processed: usize,
        stats: RunStats,
    },
    NoEligibleCandidate {
        stats: RunStats,
    },
}

impl RunReport {
    pub fn stats(&self) -> &RunStats {
        match self {
            RunReport::Published { stats, .. }
            | RunReport::Logged { stats, .. }
            | RunReport::NoEligibleCandidate { stats } => stats,
        }
    }
}

/// Trigger result payload for a finished run.
pub fn trigger_response(result: &Result<RunReport, PipelineError>) -> Value {
    match result {
        Ok(RunReport::Published {
            title,
            post_id,
            record_warning,
            ..
        }) => {
            let mut body = json!({
                "success": true,
                "posted": title,
                "tweet_id": post_id,
            });
            if let Some(warning) = record_warning {
                body["warning"] = json!(warning);
            }
            body
        }
        Ok(RunReport::Logged { processed, stats }) => {
            let mut body = json!({ "success": true, "processed": processed });
            if stats.failed > 0 {
                body["failed"] = json!(stats.failed);
                body["warning"] = json!(format!(
                    "{} feed entries could not be written",
                    stats.failed
                ));
            } else if *processed == 0 {
                body["message"] = json!(NO_ELIGIBLE_MESSAGE);
            }
            body
        }
        Ok(RunReport::NoEligibleCandidate { .. }) => {
            json!({ "success": true, "message": NO_ELIGIBLE_MESSAGE })
        }
        Err(e) => json!({
            "success": false,
            "error": e.to_string(),
            "code": e.code(),
        }),
    }
}

pub struct Pipeline {
    config: PipelineConfig,
    feed: Arc<dyn MarketFeed>,
    enricher: Enricher,
    store: Arc<dyn RecordStore>,
    sink: Sink,
}

impl Pipeline {
    pub fn new(
        config: PipelineConfig,
        feed: Arc<dyn MarketFeed>,
        enricher: Enricher,
        store: Arc<dyn RecordStore>,
        sink: Sink,
    ) -> Self {
        Self {
            config,
            feed,
            enricher,
            store,
            sink,
        }
    }

    pub fn mode(&self) -> RunMode {
        match self.sink {
            Sink::Publish(_) => RunMode::SinglePublish,
            Sink::Log => RunMode::BatchLog,
        }
    }

    pub fn dedup_policy(&self) -> DedupPolicy {
        match self.mode() {
            RunMode::SinglePublish => DedupPolicy::Permanent,
            RunMode::BatchLog => DedupPolicy::Windowed {
                window: self.config.dedup_window,
            },
        }
    }

    /// Execute one run. Only fetch and publish failures are errors.
    pub async fn run(&self) -> Result<RunReport, PipelineError> {
        let candidates = self
            .feed
            .fetch_trending(self.config.fetch_limit)
            .await
            .map_err(PipelineError::Fetch)?;
        if candidates.is_empty() {
            return Err(PipelineError::Fetch(anyhow!("feed returned no candidates")));
        }

        info!(
            mode = ?self.mode(),
            fetched = candidates.len(),
            enrichment = self.enricher.is_enabled(),
            "run started"
        );

        let mut stats = RunStats {
            fetched: candidates.len(),
            ..Default::default()
        };

        let report = match &self.sink {
            Sink::Publish(publisher) => {
                self.run_single_publish(&candidates, publisher.as_ref(), &mut stats)
                    .await?
            }
            Sink::Log => self.run_batch_log(&candidates, &mut stats).await,
        };

        let stats = report.stats();
        info!(
            fetched = stats.fetched,
            validation_skips = stats.validation_skips,
            dedup_skips = stats.dedup_skips,
            dedup_errors = stats.dedup_errors,
            enrichment_degraded = stats.enrichment_degraded,
            processed = stats.processed,
            failed = stats.failed,
            "run finished"
        );
        Ok(report)
    }

    async fn run_single_publish(
        &self,
        candidates: &[Candidate],
        publisher: &dyn crate::clients::x::PollPublisher,
        stats: &mut RunStats,
    ) -> Result<RunReport, PipelineError> {
        let policy = self.dedup_policy();

        for candidate in candidates {
            let Some(market) = self.screen(candidate, &policy, stats).await else {
                continue;
            };

            let commentary = self.enrich(candidate, &market, stats).await;

            let post_id = sink::publish(publisher, candidate, &market, &commentary)
                .await
                .map_err(|source| PipelineError::Publish {
                    event_id: candidate.id.clone(),
                    source,
                })?;
            stats.processed = 1;
            info!(event_id = %candidate.id, post_id = %post_id, "candidate published");

            let marker = sink::processed_marker(candidate, Utc::now());
            let record_warning = match self.store.insert_marker(&marker).await {
                Ok(()) => None,
                Err(e) => {
                    warn!(
                        event_id = %candidate.id,
                        post_id = %post_id,
                        "post published but processed marker not written; event may be selected again: {:#}",
                        e
                    );
                    Some(format!(
                        "post {} published but processed marker for {} was not written: {:#}",
                        post_id, candidate.id, e
                    ))
                }
            };

            return Ok(RunReport::Published {
                event_id: candidate.id.clone(),
                title: candidate.title.clone(),
                post_id,
                record_warning,
                stats: stats.clone(),
            });
        }

        info!("{}", NO_ELIGIBLE_MESSAGE);
        Ok(RunReport::NoEligibleCandidate {
            stats: stats.clone(),
        })
    }

    async fn run_batch_log(&self, candidates: &[Candidate], stats: &mut RunStats) -> RunReport {
        let policy = self.dedup_policy();
        let mut pacer = Pacer::new(self.config.pace_delay);

        for candidate in candidates {
            if stats.processed + stats.failed >= self.config.batch_size {
                debug!(batch_size = self.config.batch_size, "batch size reached");
                break;
            }

            let Some(market) = self.screen(candidate, &policy, stats).await else {
                continue;
            };

            pacer.wait_turn().await;
            let commentary = self.enrich(candidate, &market, stats).await;

            let entry = sink::feed_entry(candidate, &market, &commentary, Utc::now());
            match self.store.insert_feed_entry(&entry).await {
                Ok(()) => {
                    stats.processed += 1;
                    info!(market_id = %entry.market_id, odds = entry.odds, "feed entry logged");
                }
                Err(e) => {
                    stats.failed += 1;
                    warn!(market_id = %entry.market_id, "feed entry not written: {:#}", e);
                }
            }
        }

        if stats.processed == 0 && stats.failed == 0 {
            info!("{}", NO_ELIGIBLE_MESSAGE);
        }
        RunReport::Logged {
            processed: stats.processed,
            stats: stats.clone(),
        }
    }

    /// Validation then dedup. `None` means the candidate is skipped.
    async fn screen(
        &self,
        candidate: &Candidate,
        policy: &DedupPolicy,
        stats: &mut RunStats,
    ) -> Option<NormalizedMarket> {
        let market = match validate_candidate(candidate) {
            Ok(market) => market,
            Err(reason) => {
                stats.validation_skips += 1;
                debug!(event_id = %candidate.id, reason = %reason, "candidate skipped");
                return None;
            }
        };

        match policy
            .is_processed(self.store.as_ref(), candidate, Utc::now())
            .await
        {
            Ok(false) => Some(market),
            Ok(true) => {
                stats.dedup_skips += 1;
                debug!(event_id = %candidate.id, "candidate already processed");
                None
            }
            Err(e) => {
                // Unknown state; skipping avoids a possible double post.
                stats.dedup_errors += 1;
                warn!(event_id = %candidate.id, "dedup check failed, skipping: {:#}", e);
                None
            }
        }
    }

    async fn enrich(
        &self,
        candidate: &Candidate,
        market: &NormalizedMarket,
        stats: &mut RunStats,
    ) -> String {
        let enrichment = self
            .enricher
            .enrich(&candidate.title, market.prob_yes())
            .await;
        if enrichment.status == EnrichmentStatus::Degraded {
            stats.enrichment_degraded += 1;
        }
        enrichment.text
    }
}
