//! PostgreSQL-backed [`RecordStore`].

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::debug;

use super::RecordStore;
use crate::models::{FeedEntry, ProcessedMarker};

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Feed entry row as stored in `alpha_logs`
#[derive(Debug, Clone, sqlx::FromRow)]
struct FeedEntryRow {
    market_id: String,
    market_title: String,
    market_slug: String,
    chill_analysis: String,
    odds: i16,
    created_at: DateTime<Utc>,
}

impl From<FeedEntryRow> for FeedEntry {
    fn from(row: FeedEntryRow) -> Self {
        FeedEntry {
            market_id: row.market_id,
            market_title: row.market_title,
            market_slug: row.market_slug,
            commentary: row.chill_analysis,
            odds: row.odds.clamp(0, 100) as u8,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl RecordStore for PgStore {
    async fn marker_exists(&self, event_id: &str) -> Result<bool> {
        let (exists,): (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM posted_events WHERE event_id = $1)")
                .bind(event_id)
                .fetch_one(&self.pool)
                .await
                .context("Failed to check processed marker")?;
        Ok(exists)
    }

    async fn insert_marker(&self, marker: &ProcessedMarker) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO posted_events (event_id, title, created_at)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(&marker.event_id)
        .bind(&marker.title)
        .bind(marker.created_at)
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to insert processed marker for {}", marker.event_id))?;

        debug!(event_id = %marker.event_id, "processed marker written");
        Ok(())
    }

    async fn feed_entry_since(&self, market_id: &str, since: DateTime<Utc>) -> Result<bool> {
        let (exists,): (bool,) = sqlx::query_as(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM alpha_logs
                WHERE market_id = $1
                  AND created_at > $2
            )
            "#,
        )
        .bind(market_id)
        .bind(since)
        .fetch_one(&self.pool)
        .await
        .context("Failed to check recent feed entries")?;
        Ok(exists)
    }

    async fn insert_feed_entry(&self, entry: &FeedEntry) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO alpha_logs (
                market_id, market_title, market_slug, chill_analysis, odds, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(&entry.market_id)
        .bind(&entry.market_title)
        .bind(&entry.market_slug)
        .bind(&entry.commentary)
        .bind(i16::from(entry.odds))
        .bind(entry.created_at)
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to insert feed entry for {}", entry.market_id))?;

        debug!(market_id = %entry.market_id, odds = entry.odds, "feed entry written");
        Ok(())
    }

    async fn recent_feed_entries(&self, limit: usize) -> Result<Vec<FeedEntry>> {
        let rows = sqlx::query_as::<_, FeedEntryRow>(
            r#"
            SELECT market_id, market_title, market_slug, chill_analysis, odds, created_at
            FROM alpha_logs
            ORDER BY created_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch recent feed entries")?;

        Ok(rows.into_iter().map(FeedEntry::from).collect())
    }
}
