//! The gym HTTP server.
//!
//! | Method | Path      | Body / Response                                   |
//! |--------|-----------|---------------------------------------------------|
//! | GET    | `/health` | `{"status": "healthy", "service": "claude-code-gym"}` |
//! | POST   | `/run`    | run request -> [`TaskResult`]                     |
//!
//! Every `/run` gets its own [`Workspace`], removed once the response is built.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::Semaphore;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::agent::AgentController;
use crate::config::GymConfig;
use crate::env::{Task, Workspace};
use crate::error::GymError;
use crate::model::SglangClient;
use crate::trajectory::types::TaskResult;

pub const SERVICE_NAME: &str = "claude-code-gym";

const MISSING_FIELDS: &str = "Missing required fields: task, sglang_url";

/// Body of `POST /run`. Required fields are optional here so that a missing
/// one produces our own 400 instead of a deserialisation rejection.
#[derive(Debug, Deserialize)]
pub struct RunRequest {
    #[serde(default)]
    pub task: Option<Value>,
    #[serde(default)]
    pub sampling_params: Value,
    #[serde(default)]
    pub sglang_url: Option<String>,
    #[serde(default)]
    pub max_turns: Option<usize>,
    #[serde(default)]
    pub max_tool_calls: Option<usize>,
}

impl RunRequest {
    /// Validate required fields and decode the task.
    fn into_parts(self) -> Result<(Task, String), GymError> {
        let task = match self.task {
            None | Some(Value::Null) => None,
            Some(Value::Object(map)) if map.is_empty() => None,
            Some(v) => Some(v),
        };
        let sglang_url = self.sglang_url.filter(|u| !u.is_empty());
        let (Some(task), Some(sglang_url)) = (task, sglang_url) else {
            return Err(GymError::InvalidRequest(MISSING_FIELDS.into()));
        };
        let task: Task = serde_json::from_value(task)
            .map_err(|e| GymError::InvalidRequest(format!("Invalid task: {e}")))?;
        Ok((task, sglang_url))
    }
}

#[derive(Clone)]
pub struct AppState {
    config: Arc<GymConfig>,
    permits: Arc<Semaphore>,
}

impl AppState {
    pub fn new(config: GymConfig) -> Self {
        let permits = Arc::new(Semaphore::new(config.server.max_concurrent_tasks.max(1)));
        Self {
            config: Arc::new(config),
            permits,
        }
    }
}

/// Build the gym router.
pub fn router(config: GymConfig) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/run", post(run))
        .layer(TraceLayer::new_for_http())
        .with_state(AppState::new(config))
}

/// Bind `host:port` from the config and serve until the process exits.
pub async fn serve(config: GymConfig) -> Result<()> {
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(
        %addr,
        max_concurrent_tasks = config.server.max_concurrent_tasks,
        "gym server listening"
    );
    axum::serve(listener, router(config))
        .await
        .context("gym server terminated")
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy", "service": SERVICE_NAME }))
}

async fn run(
    State(state): State<AppState>,
    Json(request): Json<RunRequest>,
) -> Result<Json<TaskResult>, GymError> {
    let max_turns = request.max_turns.unwrap_or(state.config.agent.max_turns);
    let max_tool_calls = request
        .max_tool_calls
        .unwrap_or(state.config.agent.max_tool_calls);
    let sampling_params = match &request.sampling_params {
        Value::Null => json!({}),
        other => other.clone(),
    };
    let (task, sglang_url) = request.into_parts()?;

    let _permit = state
        .permits
        .clone()
        .acquire_owned()
        .await
        .context("task semaphore closed")?;

    info!(
        task_type = %task.task_type,
        %sglang_url,
        max_turns,
        max_tool_calls,
        "starting task"
    );

    let workspace = Workspace::create()?;
    let model = SglangClient::new(
        &sglang_url,
        Duration::from_secs(state.config.agent.model_timeout_secs),
    )?;
    let controller = AgentController::new(model, &state.config.agent, &state.config.tools)
        .with_limits(max_turns, max_tool_calls);

    let result = controller
        .run_task(&task, &sampling_params, &workspace)
        .await?;
    Ok(Json(result))
}
