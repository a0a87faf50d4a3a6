//! Polypulse Core - trending prediction-market pipeline.
//!
//! This crate provides:
//! - Gamma trending-events client and outcome normalization
//! - Optional LLM commentary with deterministic fallback
//! - Dedup policies over a Postgres (or in-memory) record store
//! - Single-publish (social poll) and batch-log (dashboard feed) runs

pub mod clients;
pub mod db;
pub mod dedup;
pub mod enrichment;
pub mod error;
pub mod models;
pub mod pacer;
pub mod pipeline;
pub mod sink;
pub mod validation;

pub use dedup::DedupPolicy;
pub use enrichment::{Enricher, Enrichment, EnrichmentStatus, Profile};
pub use error::PipelineError;
pub use models::{Candidate, FeedEntry, Market, NormalizedMarket, ProcessedMarker};
pub use pipeline::{trigger_response, Pipeline, PipelineConfig, RunMode, RunReport, RunStats};
pub use sink::Sink;
pub use validation::{validate_candidate, SkipReason};
