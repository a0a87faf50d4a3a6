use anyhow::{anyhow, Context, Result};
use std::env;
use std::str::FromStr;
use std::time::Duration;

use polypulse_core::clients::openrouter::{OpenRouterConfig, DEFAULT_MODEL, OPENROUTER_API};
use polypulse_core::clients::polymarket::GAMMA_API;
use polypulse_core::clients::x::X_API;
use polypulse_core::db::DbPoolConfig;
use polypulse_core::PipelineConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceMode {
    /// Post the first eligible candidate as a poll.
    Publish,
    /// Log a batch of candidates to the dashboard feed.
    Log,
    /// Print the newest feed entries and exit.
    Feed,
}

impl FromStr for ServiceMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "publish" | "post" => Ok(ServiceMode::Publish),
            "log" | "batch" => Ok(ServiceMode::Log),
            "feed" => Ok(ServiceMode::Feed),
            other => Err(anyhow!("Invalid PIPELINE_MODE: {other} (expected publish|log|feed)")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub mode: ServiceMode,

    pub gamma_api_url: String,
    pub pipeline: PipelineConfig,

    /// `None` runs without enrichment
    pub openrouter: Option<OpenRouterConfig>,

    pub x_api_base_url: String,
    pub x_access_token: Option<String>,
    pub paper_posting: bool,

    pub database_url: String,
    pub db_pool: DbPoolConfig,

    /// `None` runs once and exits
    pub run_interval: Option<Duration>,
    pub feed_display_limit: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let mode = env::var("PIPELINE_MODE")
            .unwrap_or_else(|_| "publish".to_string())
            .parse::<ServiceMode>()?;

        let gamma_api_url = env::var("GAMMA_API_URL").unwrap_or_else(|_| GAMMA_API.to_string());

        let pipeline = PipelineConfig {
            fetch_limit: parse_usize_env("FEED_LIMIT", 10).context("FEED_LIMIT")?,
            batch_size: parse_usize_env("BATCH_SIZE", 5).context("BATCH_SIZE")?,
            dedup_window: dedup_window(
                parse_i64_env("DEDUP_WINDOW_HOURS", 12).context("DEDUP_WINDOW_HOURS")?,
            )?,
            pace_delay: Duration::from_millis(
                parse_u64_env("PACE_DELAY_MS", 2000).context("PACE_DELAY_MS")?,
            ),
        };
        if pipeline.fetch_limit == 0 {
            return Err(anyhow!("FEED_LIMIT must be at least 1"));
        }

        let openrouter = match non_empty_env("OPENROUTER_API_KEY") {
            Some(api_key) => Some(OpenRouterConfig {
                api_key,
                model: env::var("OPENROUTER_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
                base_url: env::var("OPENROUTER_BASE_URL")
                    .unwrap_or_else(|_| OPENROUTER_API.to_string()),
                referer: non_empty_env("OPENROUTER_REFERER"),
                timeout: Duration::from_secs(
                    parse_u64_env("OPENROUTER_TIMEOUT_SECS", 20)
                        .context("OPENROUTER_TIMEOUT_SECS")?,
                ),
            }),
            None => None,
        };

        let x_api_base_url = env::var("X_API_BASE_URL").unwrap_or_else(|_| X_API.to_string());
        let x_access_token = non_empty_env("X_USER_ACCESS_TOKEN");
        let paper_posting = parse_bool_env("PAPER_POSTING", x_access_token.is_none());
        if mode == ServiceMode::Publish && !paper_posting && x_access_token.is_none() {
            return Err(anyhow!(
                "X_USER_ACCESS_TOKEN must be set when PAPER_POSTING is disabled"
            ));
        }

        let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let db_pool = DbPoolConfig::from_env_with_defaults(DbPoolConfig::default());

        let run_interval = match parse_u64_env("RUN_INTERVAL_SECS", 0).context("RUN_INTERVAL_SECS")? {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };
        let feed_display_limit =
            parse_usize_env("FEED_DISPLAY_LIMIT", 100).context("FEED_DISPLAY_LIMIT")?;

        Ok(Self {
            mode,
            gamma_api_url,
            pipeline,
            openrouter,
            x_api_base_url,
            x_access_token,
            paper_posting,
            database_url,
            db_pool,
            run_interval,
            feed_display_limit,
        })
    }
}

fn dedup_window(hours: i64) -> Result<chrono::Duration> {
    if hours <= 0 {
        return Err(anyhow!("Invalid DEDUP_WINDOW_HOURS: {hours} (expected a positive number of hours)"));
    }
    chrono::Duration::try_hours(hours)
        .ok_or_else(|| anyhow!("Invalid DEDUP_WINDOW_HOURS: {hours} (out of range)"))
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_bool(raw: &str) -> bool {
    matches!(raw.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "y" | "on")
}

fn parse_bool_env(key: &str, default: bool) -> bool {
    env::var(key).ok().map(|v| parse_bool(&v)).unwrap_or(default)
}

fn parse_usize_env(key: &str, default: usize) -> Result<usize> {
    let raw = env::var(key).unwrap_or_else(|_| default.to_string());
    raw.trim()
        .parse::<usize>()
        .with_context(|| format!("Invalid {key}: {raw} (expected integer)"))
}

fn parse_i64_env(key: &str, default: i64) -> Result<i64> {
    let raw = env::var(key).unwrap_or_else(|_| default.to_string());
    raw.trim()
        .parse::<i64>()
        .with_context(|| format!("Invalid {key}: {raw} (expected integer)"))
}

fn parse_u64_env(key: &str, default: u64) -> Result<u64> {
    let raw = env::var(key).unwrap_or_else(|_| default.to_string());
    raw.trim()
        .parse::<u64>()
        .with_context(|| format!("Invalid {key}: {raw} (expected integer)"))
}
