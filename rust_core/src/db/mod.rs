//! Persistence for processed markers and feed entries.
//!
//! Both collections are append-only. Dedup is a two-step protocol: a read
//! (`marker_exists` / `feed_entry_since`) followed later by an insert. The two
//! steps are not atomic, so overlapping runs can both see "not processed" and
//! both write. The primary key on `posted_events.event_id` turns the second
//! marker insert into an error; feed entries have no such backstop because
//! their history is additive.

pub mod health;
pub mod memory;
pub mod pool;
pub mod postgres;
pub mod schema;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::{FeedEntry, ProcessedMarker};

pub use memory::MemoryStore;
pub use pool::{create_pool, DbPoolConfig};
pub use postgres::PgStore;

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Whether a processed marker exists for this event, at any age.
    async fn marker_exists(&self, event_id: &str) -> Result<bool>;

    async fn insert_marker(&self, marker: &ProcessedMarker) -> Result<()>;

    /// Whether a feed entry for this market was created strictly after `since`.
    async fn feed_entry_since(&self, market_id: &str, since: DateTime<Utc>) -> Result<bool>;

    async fn insert_feed_entry(&self, entry: &FeedEntry) -> Result<()>;

    /// Newest feed entries first.
    async fn recent_feed_entries(&self, limit: usize) -> Result<Vec<FeedEntry>>;
}
