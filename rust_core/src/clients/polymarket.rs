use crate::models::Candidate;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, info, warn};

pub const GAMMA_API: &str = "https://gamma-api.polymarket.com";

/// Source of trending candidates, most-trending first.
#[async_trait]
pub trait MarketFeed: Send + Sync {
    async fn fetch_trending(&self, limit: usize) -> Result<Vec<Candidate>>;
}

#[derive(Debug, Clone)]
pub struct GammaClient {
    client: Client,
    base_url: String,
}

impl GammaClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut client_builder = Client::builder().timeout(Duration::from_secs(10));

        // Check for proxy in environment
        if let Ok(proxy_url) = std::env::var("POLYMARKET_PROXY_URL") {
            if !proxy_url.is_empty() {
                if let Ok(proxy) = reqwest::Proxy::all(&proxy_url) {
                    client_builder = client_builder.proxy(proxy);
                    info!("Gamma client using proxy: {}", proxy_url);
                }
            }
        }

        Self {
            client: client_builder.build().unwrap_or_else(|_| Client::new()),
            base_url: base_url.into(),
        }
    }

    fn events_url(&self) -> String {
        format!("{}/events", self.base_url.trim_end_matches('/'))
    }
}

impl Default for GammaClient {
    fn default() -> Self {
        Self::new(GAMMA_API)
    }
}

/// Query for active, open events ordered by volume, highest first.
pub fn trending_params(limit: usize) -> [(&'static str, String); 5] {
    [
        ("limit", limit.to_string()),
        ("active", "true".to_string()),
        ("closed", "false".to_string()),
        ("order", "volume".to_string()),
        ("ascending", "false".to_string()),
    ]
}

/// Decode events one at a time. Items that do not fit [`Candidate`] are
/// dropped so one malformed event cannot sink the rest of the page.
pub fn decode_events(raw: Vec<Value>) -> Vec<Candidate> {
    let total = raw.len();
    let events: Vec<Candidate> = raw
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<Candidate>(item) {
            Ok(event) => Some(event),
            Err(e) => {
                debug!("Skipping malformed Gamma event: {}", e);
                None
            }
        })
        .collect();

    if events.len() < total {
        warn!(
            "Dropped {} of {} Gamma events with an unexpected shape",
            total - events.len(),
            total
        );
    }
    events
}

#[async_trait]
impl MarketFeed for GammaClient {
    async fn fetch_trending(&self, limit: usize) -> Result<Vec<Candidate>> {
        let url = self.events_url();
        let resp = self
            .client
            .get(&url)
            .query(&trending_params(limit))
            .send()
            .await
            .with_context(|| format!("Gamma request failed: {url}"))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            error!("Gamma API Error: {} - {}", status, text);
            bail!("Gamma API non-2xx: {status}");
        }

        let raw: Option<Vec<Value>> = resp
            .json()
            .await
            .context("Gamma returned an unreadable events payload")?;

        let raw = match raw {
            Some(raw) if !raw.is_empty() => raw,
            _ => bail!("Gamma returned no events"),
        };

        let events = decode_events(raw);
        if events.is_empty() {
            bail!("Gamma returned no decodable events");
        }

        info!("Gamma fetched {} trending events (limit={})", events.len(), limit);
        Ok(events)
    }
}
