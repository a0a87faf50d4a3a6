//! Run-level error taxonomy.
//!
//! Only failures that end a run are errors here. Validation and dedup skips,
//! degraded enrichment and batch-mode write failures are absorbed by the
//! pipeline and reported through [`crate::pipeline::RunReport`].

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Upstream feed failed or returned nothing.
    #[error("market feed unavailable: {0:#}")]
    Fetch(#[source] anyhow::Error),

    /// The social post could not be created (single-publish mode).
    #[error("publish failed for event {event_id}: {source:#}")]
    Publish {
        event_id: String,
        #[source]
        source: anyhow::Error,
    },
}

impl PipelineError {
    pub fn code(&self) -> &'static str {
        match self {
            PipelineError::Fetch(_) => "FETCH_ERROR",
            PipelineError::Publish { .. } => "PUBLISH_ERROR",
        }
    }
}
