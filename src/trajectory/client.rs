//! HTTP client for a running gym server.

use std::future::Future;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::env::Task;
use crate::trajectory::types::TaskResult;

/// Environment variable overriding the gym location.
pub const GYM_URL_ENV: &str = "CLAUDE_CODE_GYM_URL";
pub const DEFAULT_GYM_URL: &str = "http://localhost:12000";

/// Body of `POST /run`.
#[derive(Debug, Clone, Serialize)]
pub struct GymRequest {
    pub task: Task,
    pub sampling_params: Value,
    /// Inference server base URL; the gym appends `/generate`.
    pub sglang_url: String,
    pub max_turns: usize,
    pub max_tool_calls: usize,
}

/// Something that can run a task to completion and return the trajectory.
///
/// [`GymClient`] talks to a real server; tests substitute scripted backends.
pub trait GymBackend: Send + Sync + 'static {
    fn run(&self, request: &GymRequest) -> impl Future<Output = Result<TaskResult>> + Send;
}

#[derive(Debug, Clone)]
pub struct GymClient {
    base_url: String,
    http: reqwest::Client,
}

impl GymClient {
    /// Create a client for `base_url`; `timeout` bounds a whole task run.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build gym http client")?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `GET /health`, returning the body on a 2xx response.
    pub async fn health(&self) -> Result<Value> {
        let url = format!("{}/health", self.base_url);
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .with_context(|| format!("gym unreachable at {url}"))?;
        let status = resp.status();
        if !status.is_success() {
            anyhow::bail!("gym health check returned {status}");
        }
        resp.json().await.context("failed to parse gym health response")
    }
}

impl GymBackend for GymClient {
    async fn run(&self, request: &GymRequest) -> Result<TaskResult> {
        let url = format!("{}/run", self.base_url);
        debug!(%url, task_type = %request.task.task_type, "sending task to gym");

        let resp = self
            .http
            .post(&url)
            .json(request)
            .send()
            .await
            .context("failed to send run request to gym")?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            anyhow::bail!("gym returned {status}: {text}");
        }

        resp.json().await.context("failed to parse gym run response")
    }
}
