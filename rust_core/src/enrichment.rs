//! Best-effort commentary generation.
//!
//! The enricher never fails: a missing backend or any call error yields the
//! profile's fallback text. [`EnrichmentStatus`] keeps "disabled by
//! configuration" apart from "failed at runtime" so operators can tell them
//! apart in logs and run reports.

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::clients::openrouter::ChatCompletion;

const FACT_MAX_CHARS: usize = 100;
const TAKE_MAX_WORDS: usize = 15;

/// Generic line used when a cynical take cannot be generated.
pub const CYNICAL_FALLBACK: &str = "nobody knows anything, bet accordingly";

/// Content profile for generated commentary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Profile {
    /// One short neutral trivia statement about the topic.
    NeutralFact,
    /// Lowercase slang commentary on the market and its odds.
    CynicalTake,
}

impl Profile {
    pub fn system_prompt(&self) -> &'static str {
        match self {
            Profile::NeutralFact => {
                "You are a trivia bot. Given a market event title, provide ONE short, \
                 interesting, and neutral fun fact or context related to the topic. \
                 Max 100 characters. No hashtags. No intro."
            }
            Profile::CynicalTake => {
                "You are a jaded prediction market degen. Given a market title and its odds, \
                 reply with ONE cynical take in lowercase internet slang. Max 15 words. \
                 No emoji. No hashtags. No quotes. No intro."
            }
        }
    }

    pub fn user_message(&self, topic: &str, odds: u8) -> String {
        match self {
            Profile::NeutralFact => format!("Topic: {}", topic),
            Profile::CynicalTake => format!("Market: {}\nOdds: {}% yes", topic, odds),
        }
    }

    pub fn fallback(&self) -> &'static str {
        match self {
            Profile::NeutralFact => "",
            Profile::CynicalTake => CYNICAL_FALLBACK,
        }
    }

    /// Normalize raw model output. Returns an empty string when nothing usable remains.
    pub fn clean(&self, raw: &str) -> String {
        let unquoted: String = raw
            .chars()
            .filter(|c| !matches!(c, '"' | '\u{201C}' | '\u{201D}' | '`'))
            .collect();
        let trimmed = unquoted.trim();

        match self {
            Profile::NeutralFact => truncate_chars(trimmed, FACT_MAX_CHARS),
            Profile::CynicalTake => {
                let lowered = trimmed.to_lowercase();
                let kept: String = lowered
                    .chars()
                    .filter(|c| c.is_alphanumeric() || c.is_whitespace() || "'%$?!,-".contains(*c))
                    .collect();
                let words: Vec<&str> = kept.split_whitespace().take(TAKE_MAX_WORDS).collect();
                words
                    .join(" ")
                    .trim_end_matches(|c: char| matches!(c, ',' | '-'))
                    .to_string()
            }
        }
    }
}

/// Cut to at most `max` characters, backing off to the last word boundary.
fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let cut: String = s.chars().take(max).collect();
    match cut.rfind(' ') {
        Some(idx) if idx > 0 => cut[..idx].trim_end().to_string(),
        _ => cut,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrichmentStatus {
    Generated,
    /// No backend configured (e.g. missing API key).
    Disabled,
    /// Backend configured but the call failed or returned nothing usable.
    Degraded,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Enrichment {
    pub text: String,
    pub status: EnrichmentStatus,
}

pub struct Enricher {
    backend: Option<Arc<dyn ChatCompletion>>,
    profile: Profile,
}

impl Enricher {
    pub fn new(backend: Option<Arc<dyn ChatCompletion>>, profile: Profile) -> Self {
        if backend.is_none() {
            info!(profile = ?profile, "enrichment disabled: no completion backend configured");
        }
        Self { backend, profile }
    }

    pub fn is_enabled(&self) -> bool {
        self.backend.is_some()
    }

    /// Produce commentary for a topic. Always returns; failures degrade to the fallback.
    pub async fn enrich(&self, topic: &str, odds: u8) -> Enrichment {
        let Some(backend) = &self.backend else {
            return self.fallback(EnrichmentStatus::Disabled);
        };

        let user = self.profile.user_message(topic, odds);
        match backend.complete(self.profile.system_prompt(), &user).await {
            Ok(raw) => {
                let text = self.profile.clean(&raw);
                if text.is_empty() {
                    warn!(topic, "enrichment degraded: completion was empty after cleanup");
                    return self.fallback(EnrichmentStatus::Degraded);
                }
                debug!(topic, text = %text, "enrichment generated");
                Enrichment {
                    text,
                    status: EnrichmentStatus::Generated,
                }
            }
            Err(e) => {
                warn!(topic, "enrichment degraded: {:#}", e);
                self.fallback(EnrichmentStatus::Degraded)
            }
        }
    }

    fn fallback(&self, status: EnrichmentStatus) -> Enrichment {
        Enrichment {
            text: self.profile.fallback().to_string(),
            status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{anyhow, Result};
    use async_trait::async_trait;

    struct Scripted(Result<String, String>);

    #[async_trait]
    impl ChatCompletion for Scripted {
        async fn complete(&self, _system: &str, _user: &str) -> Result<String> {
            self.0.clone().map_err(|e| anyhow!(e))
        }
    }

    fn enricher(reply: Result<&str, &str>, profile: Profile) -> Enricher {
        let backend: Arc<dyn ChatCompletion> = Arc::new(Scripted(
            reply.map(str::to_string).map_err(str::to_string),
        ));
        Enricher::new(Some(backend), profile)
    }

    #[test]
    fn test_fact_cleanup_strips_quotes_and_trims() {
        let cleaned = Profile::NeutralFact.clean("  \"The Fed was founded in 1913.\"  \n");
        assert_eq!(cleaned, "The Fed was founded in 1913.");
    }

    #[test]
    fn test_fact_is_capped_at_word_boundary() {
        let long = "word ".repeat(40);
        let cleaned = Profile::NeutralFact.clean(&long);
        assert!(cleaned.chars().count() <= 100);
        assert!(cleaned.ends_with("word"));
    }

    #[test]
    fn test_cynical_cleanup() {
        let cleaned = Profile::CynicalTake.clean("\"LOL the Fed Is Cooked 💀🔥 ngmi\"");
        assert_eq!(cleaned, "lol the fed is cooked ngmi");
    }

    #[test]
    fn test_cynical_word_cap() {
        let raw = (1..=30).map(|i| format!("w{}", i)).collect::<Vec<_>>().join(" ");
        let cleaned = Profile::CynicalTake.clean(&raw);
        assert_eq!(cleaned.split_whitespace().count(), 15);
    }

    #[test]
    fn test_user_messages() {
        assert_eq!(Profile::NeutralFact.user_message("Rain?", 40), "Topic: Rain?");
        assert!(Profile::CynicalTake.user_message("Rain?", 40).contains("40% yes"));
    }

    #[tokio::test]
    async fn test_disabled_returns_fallback() {
        let fact = Enricher::new(None, Profile::NeutralFact).enrich("x", 50).await;
        assert_eq!(fact.text, "");
        assert_eq!(fact.status, EnrichmentStatus::Disabled);

        let take = Enricher::new(None, Profile::CynicalTake).enrich("x", 50).await;
        assert_eq!(take.text, CYNICAL_FALLBACK);
        assert_eq!(take.status, EnrichmentStatus::Disabled);
    }

    #[tokio::test]
    async fn test_backend_error_degrades() {
        let e = enricher(Err("OpenRouter non-2xx: 503"), Profile::CynicalTake);
        let out = e.enrich("x", 10).await;
        assert_eq!(out.text, CYNICAL_FALLBACK);
        assert_eq!(out.status, EnrichmentStatus::Degraded);
    }

    #[tokio::test]
    async fn test_empty_completion_degrades() {
        let e = enricher(Ok("  \"\" "), Profile::NeutralFact);
        let out = e.enrich("x", 10).await;
        assert_eq!(out.text, "");
        assert_eq!(out.status, EnrichmentStatus::Degraded);
    }

    #[tokio::test]
    async fn test_generated() {
        let e = enricher(Ok("Octopuses have three hearts."), Profile::NeutralFact);
        let out = e.enrich("Ocean markets", 55).await;
        assert_eq!(out.text, "Octopuses have three hearts.");
        assert_eq!(out.status, EnrichmentStatus::Generated);
        assert!(e.is_enabled());
    }
}
