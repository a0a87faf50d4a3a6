use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

pub const X_API: &str = "https://api.twitter.com";

/// Poll voting window, in minutes (24 hours).
pub const POLL_DURATION_MINUTES: u32 = 1440;
/// Platform limit on a single poll option label.
pub const POLL_OPTION_MAX_CHARS: usize = 25;
/// Platform limit on post text, in weighted characters.
pub const POST_MAX_CHARS: usize = 280;

/// Weight of one character in the platform's length count. Latin, general
/// punctuation and a few symbol ranges count 1; everything else (CJK, emoji)
/// counts 2.
pub fn char_weight(c: char) -> usize {
    match c as u32 {
        0x0000..=0x10FF | 0x2000..=0x200D | 0x2010..=0x201F | 0x2032..=0x2037 => 1,
        _ => 2,
    }
}

/// Post length as the platform counts it.
pub fn weighted_len(text: &str) -> usize {
    text.chars().map(char_weight).sum()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PollSpec {
    pub options: Vec<String>,
    pub duration_minutes: u32,
}

impl PollSpec {
    pub fn binary(first: &str, second: &str) -> Self {
        Self {
            options: vec![poll_label(first, "Yes"), poll_label(second, "No")],
            duration_minutes: POLL_DURATION_MINUTES,
        }
    }
}

fn poll_label(label: &str, fallback: &str) -> String {
    let trimmed = match label.trim() {
        "" => fallback,
        t => t,
    };
    trimmed.chars().take(POLL_OPTION_MAX_CHARS).collect()
}

/// Publishes a text post carrying a poll and returns the post id.
#[async_trait]
pub trait PollPublisher: Send + Sync {
    async fn publish(&self, text: &str, poll: &PollSpec) -> Result<String>;
}

#[derive(Debug, Serialize)]
struct CreatePostRequest<'a> {
    text: &'a str,
    poll: &'a PollSpec,
}

#[derive(Debug, Deserialize)]
struct CreatePostResponse {
    data: Option<CreatedPost>,
}

#[derive(Debug, Deserialize)]
struct CreatedPost {
    id: String,
}

/// X API v2 client authenticated with an OAuth 2.0 user-context access token.
#[derive(Debug, Clone)]
pub struct XClient {
    http: Client,
    base_url: String,
    access_token: String,
}

impl XClient {
    pub fn new(base_url: String, access_token: String) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            http,
            base_url,
            access_token,
        }
    }
}

#[async_trait]
impl PollPublisher for XClient {
    async fn publish(&self, text: &str, poll: &PollSpec) -> Result<String> {
        let url = format!("{}/2/tweets", self.base_url.trim_end_matches('/'));
        let body = CreatePostRequest { text, poll };

        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("X API request failed: {url}"))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            bail!("X API non-2xx: {status} body={text}");
        }

        let created: CreatePostResponse = resp
            .json()
            .await
            .context("X API returned an unreadable create-post payload")?;
        let id = created
            .data
            .map(|d| d.id)
            .context("X API response missing post id")?;

        info!(post_id = %id, "post published");
        Ok(id)
    }
}

/// Logs the post instead of sending it. Used when no access token is configured.
#[derive(Debug, Clone, Default)]
pub struct PaperPublisher;

#[async_trait]
impl PollPublisher for PaperPublisher {
    async fn publish(&self, text: &str, poll: &PollSpec) -> Result<String> {
        let id = format!("paper-post-{}", uuid::Uuid::new_v4());
        warn!(
            post_id = %id,
            options = ?poll.options,
            duration_minutes = poll.duration_minutes,
            "[PAPER] post not sent:\n{}",
            text
        );
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binary_poll() {
        let poll = PollSpec::binary("Yes", "No");
        assert_eq!(poll.options, vec!["Yes", "No"]);
        assert_eq!(poll.duration_minutes, 1440);
    }

    #[test]
    fn test_poll_labels_truncated() {
        let poll = PollSpec::binary("  Kansas City Chiefs win by 10+  ", "No");
        assert_eq!(poll.options[0].chars().count(), POLL_OPTION_MAX_CHARS);
        assert_eq!(poll.options[0], "Kansas City Chiefs win by");
    }

    #[test]
    fn test_blank_poll_labels_fall_back() {
        let poll = PollSpec::binary("   ", "");
        assert_eq!(poll.options, vec!["Yes", "No"]);
    }

    #[test]
    fn test_weighted_len_counts_emoji_double() {
        assert_eq!(weighted_len("abc"), 3);
        assert_eq!(weighted_len("🔥"), 2);
        assert_eq!(weighted_len("é…"), 2);
        assert_eq!(weighted_len("選挙"), 4);
    }

    #[test]
    fn test_create_post_body() {
        let poll = PollSpec::binary("Yes", "No");
        let body = CreatePostRequest {
            text: "hello",
            poll: &poll,
        };
        let v = serde_json::to_value(&body).unwrap();
        assert_eq!(v["text"], "hello");
        assert_eq!(v["poll"]["options"][1], "No");
        assert_eq!(v["poll"]["duration_minutes"], 1440);
    }

    #[test]
    fn test_create_post_response() {
        let resp: CreatePostResponse =
            serde_json::from_str(r#"{"data":{"id":"1790","text":"hello"}}"#).unwrap();
        assert_eq!(resp.data.unwrap().id, "1790");
    }

    #[tokio::test]
    async fn test_paper_publisher_returns_paper_id() {
        let id = PaperPublisher
            .publish("hello", &PollSpec::binary("Yes", "No"))
            .await
            .unwrap();
        assert!(id.starts_with("paper-post-"));
    }
}
