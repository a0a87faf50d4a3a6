//! In-process [`RecordStore`] for tests and database-less dry runs.

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::{Mutex, MutexGuard};

use super::RecordStore;
use crate::models::{FeedEntry, ProcessedMarker};

#[derive(Debug, Default)]
struct Collections {
    markers: Vec<ProcessedMarker>,
    feed: Vec<FeedEntry>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a store with existing records.
    pub fn with_records(markers: Vec<ProcessedMarker>, feed: Vec<FeedEntry>) -> Self {
        Self {
            inner: Mutex::new(Collections { markers, feed }),
        }
    }

    pub fn markers(&self) -> Vec<ProcessedMarker> {
        self.lock().map(|c| c.markers.clone()).unwrap_or_default()
    }

    pub fn feed_entries(&self) -> Vec<FeedEntry> {
        self.lock().map(|c| c.feed.clone()).unwrap_or_default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Collections>> {
        self.inner
            .lock()
            .map_err(|_| anyhow!("memory store lock poisoned"))
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn marker_exists(&self, event_id: &str) -> Result<bool> {
        Ok(self.lock()?.markers.iter().any(|m| m.event_id == event_id))
    }

    async fn insert_marker(&self, marker: &ProcessedMarker) -> Result<()> {
        let mut inner = self.lock()?;
        // Same constraint as the posted_events primary key
        if inner.markers.iter().any(|m| m.event_id == marker.event_id) {
            bail!("duplicate key value violates unique constraint: event_id={}", marker.event_id);
        }
        inner.markers.push(marker.clone());
        Ok(())
    }

    async fn feed_entry_since(&self, market_id: &str, since: DateTime<Utc>) -> Result<bool> {
        Ok(self
            .lock()?
            .feed
            .iter()
            .any(|e| e.market_id == market_id && e.created_at > since))
    }

    async fn insert_feed_entry(&self, entry: &FeedEntry) -> Result<()> {
        self.lock()?.feed.push(entry.clone());
        Ok(())
    }

    async fn recent_feed_entries(&self, limit: usize) -> Result<Vec<FeedEntry>> {
        let mut entries = self.lock()?.feed.clone();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        entries.truncate(limit);
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn entry(market_id: &str, age_hours: i64) -> FeedEntry {
        FeedEntry {
            market_id: market_id.to_string(),
            market_title: "t".to_string(),
            market_slug: "s".to_string(),
            commentary: String::new(),
            odds: 50,
            created_at: Utc::now() - Duration::hours(age_hours),
        }
    }

    #[tokio::test]
    async fn test_duplicate_marker_rejected() {
        let store = MemoryStore::new();
        let marker = ProcessedMarker {
            event_id: "a".to_string(),
            title: "A".to_string(),
            created_at: Utc::now(),
        };
        store.insert_marker(&marker).await.unwrap();
        assert!(store.insert_marker(&marker).await.is_err());
        assert!(store.marker_exists("a").await.unwrap());
        assert!(!store.marker_exists("b").await.unwrap());
    }

    #[tokio::test]
    async fn test_recent_feed_entries_newest_first() {
        let store = MemoryStore::with_records(
            vec![],
            vec![entry("old", 20), entry("new", 1), entry("mid", 5)],
        );
        let recent = store.recent_feed_entries(2).await.unwrap();
        let ids: Vec<&str> = recent.iter().map(|e| e.market_id.as_str()).collect();
        assert_eq!(ids, vec!["new", "mid"]);
    }

    #[tokio::test]
    async fn test_feed_entry_since_is_strict() {
        let e = entry("m", 0);
        let created = e.created_at;
        let store = MemoryStore::with_records(vec![], vec![e]);
        assert!(!store.feed_entry_since("m", created).await.unwrap());
        assert!(store
            .feed_entry_since("m", created - Duration::seconds(1))
            .await
            .unwrap());
    }
}
