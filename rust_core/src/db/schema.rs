//! Table definitions for the two append-only collections.

use anyhow::{Context, Result};
use sqlx::PgPool;
use tracing::info;

/// Statements run in order by [`ensure_schema`]. Each is idempotent.
pub const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS posted_events (
        event_id   TEXT PRIMARY KEY,
        title      TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS alpha_logs (
        id             BIGSERIAL PRIMARY KEY,
        market_id      TEXT NOT NULL,
        market_title   TEXT NOT NULL,
        market_slug    TEXT NOT NULL DEFAULT '',
        chill_analysis TEXT NOT NULL DEFAULT '',
        odds           SMALLINT NOT NULL CHECK (odds BETWEEN 0 AND 100),
        created_at     TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS alpha_logs_market_recent
        ON alpha_logs (market_id, created_at DESC)
    "#,
];

pub async fn ensure_schema(pool: &PgPool) -> Result<()> {
    for statement in SCHEMA {
        sqlx::query(statement)
            .execute(pool)
            .await
            .context("Failed to apply schema statement")?;
    }
    info!("Schema ready ({} statements)", SCHEMA.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_table_has_unique_event_id() {
        assert!(SCHEMA[0].contains("event_id   TEXT PRIMARY KEY"));
    }

    #[test]
    fn test_feed_table_allows_repeat_markets() {
        assert!(!SCHEMA[1].contains("UNIQUE"));
        assert!(SCHEMA[1].contains("CHECK (odds BETWEEN 0 AND 100)"));
    }
}
