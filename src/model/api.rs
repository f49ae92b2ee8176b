//! Inference server client.
//!
//! The gym talks to an SGLang-compatible server through its native
//! `/generate` endpoint: the conversation is rendered to a single prompt
//! string and the server returns the generated continuation.

use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// Author of a conversation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
    #[serde(other)]
    Other,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Tool => "tool",
            Self::Other => "other",
        }
    }
}

/// A single message in an agent conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    #[serde(default)]
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn tool(content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: content.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Backend trait
// ---------------------------------------------------------------------------

/// Anything that can turn a rendered prompt into a completion.
///
/// The agent controller only depends on this trait, so tests can drive it
/// with scripted responses instead of a live inference server.
#[allow(async_fn_in_trait)]
pub trait ModelBackend: Send + Sync {
    async fn generate(&self, prompt: &str, sampling_params: &serde_json::Value)
        -> Result<String>;
}

// ---------------------------------------------------------------------------
// SGLang client
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    text: &'a str,
    sampling_params: &'a serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    text: String,
}

/// HTTP client for the SGLang `/generate` endpoint.
#[derive(Debug, Clone)]
pub struct SglangClient {
    base_url: String,
    http: reqwest::Client,
}

impl SglangClient {
    /// Create a client for `base_url` (e.g. `"http://10.0.0.1:30000"`).
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build inference http client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl ModelBackend for SglangClient {
    async fn generate(
        &self,
        prompt: &str,
        sampling_params: &serde_json::Value,
    ) -> Result<String> {
        let url = format!("{}/generate", self.base_url);
        debug!(%url, prompt_chars = prompt.len(), "querying inference server");

        let resp = self
            .http
            .post(&url)
            .json(&GenerateRequest {
                text: prompt,
                sampling_params,
            })
            .send()
            .await
            .context("failed to send generate request")?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            anyhow::bail!("inference server returned {status}: {text}");
        }

        let body: GenerateResponse = resp
            .json()
            .await
            .context("failed to parse generate response")?;

        Ok(body.text)
    }
}
