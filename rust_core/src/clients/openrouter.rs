//! OpenRouter chat-completions client.
//!
//! One request per call, no retries. Callers that need a best-effort result
//! wrap this in [`crate::enrichment::Enricher`].

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

pub const OPENROUTER_API: &str = "https://openrouter.ai/api/v1";
/// Sent as `X-Title` for OpenRouter app attribution.
pub const APP_TITLE: &str = "polypulse";
pub const DEFAULT_MODEL: &str = "google/gemini-2.0-flash-lite-preview-02-05:free";

/// A text-generation backend taking a system instruction and a user message.
#[async_trait]
pub trait ChatCompletion: Send + Sync {
    async fn complete(&self, system: &str, user: &str) -> Result<String>;
}

#[derive(Debug, Clone)]
pub struct OpenRouterConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    /// Sent as `HTTP-Referer` for OpenRouter app attribution
    pub referer: Option<String>,
    pub timeout: Duration,
}

impl OpenRouterConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: OPENROUTER_API.to_string(),
            referer: None,
            timeout: Duration::from_secs(20),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ChatCompletionRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
pub struct ChatChoice {
    pub message: Option<ChatChoiceMessage>,
}

#[derive(Debug, Deserialize)]
pub struct ChatChoiceMessage {
    pub content: Option<String>,
}

impl ChatCompletionResponse {
    /// Text of the first choice, if the model returned any.
    pub fn first_content(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.message.as_ref())
            .and_then(|m| m.content.as_deref())
    }
}

#[derive(Debug, Clone)]
pub struct OpenRouterClient {
    http: Client,
    config: OpenRouterConfig,
}

impl OpenRouterClient {
    pub fn new(config: OpenRouterConfig) -> Self {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { http, config }
    }

    fn completions_url(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }

    fn build_request(&self, system: &str, user: &str) -> RequestBuilder {
        let body = ChatCompletionRequest {
            model: &self.config.model,
            messages: vec![ChatMessage::system(system), ChatMessage::user(user)],
            max_tokens: Some(120),
        };

        let mut req = self
            .http
            .post(self.completions_url())
            .bearer_auth(&self.config.api_key)
            .header("X-Title", APP_TITLE)
            .json(&body);
        if let Some(referer) = &self.config.referer {
            req = req.header("HTTP-Referer", referer);
        }
        req
    }
}

#[async_trait]
impl ChatCompletion for OpenRouterClient {
    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        let url = self.completions_url();
        let req = self.build_request(system, user);

        let resp = req
            .send()
            .await
            .with_context(|| format!("OpenRouter request failed: {url}"))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            bail!("OpenRouter non-2xx: {status} body={text}");
        }

        let parsed: ChatCompletionResponse = resp
            .json()
            .await
            .context("OpenRouter returned an unreadable completion payload")?;

        let content = parsed
            .first_content()
            .context("OpenRouter completion had no content")?
            .to_string();
        debug!(model = %self.config.model, chars = content.len(), "completion received");
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shape() {
        let req = ChatCompletionRequest {
            model: DEFAULT_MODEL,
            messages: vec![ChatMessage::system("be brief"), ChatMessage::user("Topic: x")],
            max_tokens: None,
        };
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v["model"], DEFAULT_MODEL);
        assert_eq!(v["messages"][0]["role"], "system");
        assert_eq!(v["messages"][1]["content"], "Topic: x");
        assert!(v.get("max_tokens").is_none());
    }

    #[test]
    fn test_first_content() {
        let resp: ChatCompletionResponse = serde_json::from_str(
            r#"{"id":"gen-1","choices":[{"index":0,"message":{"role":"assistant","content":"hello"}}]}"#,
        )
        .unwrap();
        assert_eq!(resp.first_content(), Some("hello"));

        let empty: ChatCompletionResponse = serde_json::from_str(r#"{"error":{"code":429}}"#).unwrap();
        assert_eq!(empty.first_content(), None);
    }

    #[test]
    fn test_config_defaults() {
        let cfg = OpenRouterConfig::new("sk-test");
        assert_eq!(cfg.model, DEFAULT_MODEL);
        assert_eq!(cfg.base_url, OPENROUTER_API);
        assert!(cfg.referer.is_none());
    }

    #[test]
    fn test_attribution_headers() {
        let client = OpenRouterClient::new(OpenRouterConfig::new("sk-test"));
        let req = client.build_request("sys", "user").build().unwrap();
        assert_eq!(req.headers()["X-Title"], APP_TITLE);
        assert_eq!(req.headers()["Authorization"], "Bearer sk-test");
        assert!(req.headers().get("HTTP-Referer").is_none());
        assert!(req.url().as_str().ends_with("/chat/completions"));

        let mut cfg = OpenRouterConfig::new("sk-test");
        cfg.referer = Some("https://polypulse.example".to_string());
        let req = OpenRouterClient::new(cfg).build_request("sys", "user").build().unwrap();
        assert_eq!(req.headers()["X-Title"], APP_TITLE);
        assert_eq!(req.headers()["HTTP-Referer"], "https://polypulse.example");
    }
}
