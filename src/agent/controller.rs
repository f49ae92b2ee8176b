//! The agent controller: drives the model/tool interaction loop for one task.
//!
//! Each turn:
//!   1. render the conversation and query the model,
//!   2. parse `<tool_call>` blocks from the response,
//!   3. execute them in the workspace (bounded by the tool call budget),
//!   4. feed the results back as a `tool` message.
//!
//! A response without tool calls that reads as a final answer ends the run.

use std::time::{Duration, Instant};

use anyhow::Result;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::agent::parse::{format_tool_results, is_final_answer, parse_tool_calls, ToolOutcome};
use crate::config::{AgentConfig, ToolConfig};
use crate::env::{evaluate, Task, Workspace};
use crate::model::api::{ChatMessage, ModelBackend};
use crate::model::prompt::{messages_to_prompt, system_prompt};
use crate::tools::ToolExecutor;
use crate::trajectory::types::{AgentMetrics, TaskResult, TaskStatus};

/// Mutable state of one run. Kept outside the loop future so it survives a
/// timeout.
struct RunState {
    messages: Vec<ChatMessage>,
    metrics: AgentMetrics,
    status: TaskStatus,
    final_answer: Option<String>,
}

/// Runs a task with a model backend and the tool executor.
pub struct AgentController<M> {
    model: M,
    max_turns: usize,
    max_tool_calls: usize,
    timeout: Duration,
    tool_config: ToolConfig,
}

impl<M: ModelBackend> AgentController<M> {
    pub fn new(model: M, agent: &AgentConfig, tools: &ToolConfig) -> Self {
        Self {
            model,
            max_turns: agent.max_turns,
            max_tool_calls: agent.max_tool_calls,
            timeout: Duration::from_secs(agent.timeout_secs),
            tool_config: tools.clone(),
        }
    }

    /// Override the turn and tool call budgets for a single request.
    pub fn with_limits(mut self, max_turns: usize, max_tool_calls: usize) -> Self {
        self.max_turns = max_turns;
        self.max_tool_calls = max_tool_calls;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run `task` inside `workspace` and return the trajectory with its
    /// evaluation.
    ///
    /// Only workspace setup failures are returned as `Err`; model and tool
    /// failures end up in `task_status` and the transcript.
    pub async fn run_task(
        &self,
        task: &Task,
        sampling_params: &Value,
        workspace: &Workspace,
    ) -> Result<TaskResult> {
        let started = Instant::now();
        let executor = ToolExecutor::new(workspace.path(), &self.tool_config)?;
        let command_timeout = Duration::from_secs(self.tool_config.command_timeout_secs);
        workspace.apply(&task.workspace_setup, command_timeout).await?;

        let mut state = RunState {
            messages: vec![
                ChatMessage::system(system_prompt(&executor.tool_specs())),
                ChatMessage::user(task.prompt.clone()),
            ],
            metrics: AgentMetrics::default(),
            status: TaskStatus::Running,
            final_answer: None,
        };

        let outcome =
            tokio::time::timeout(self.timeout, self.drive(&mut state, &executor, sampling_params))
                .await;
        if outcome.is_err() {
            warn!(timeout_secs = self.timeout.as_secs(), "task timed out");
            state.status = TaskStatus::Timeout;
        }
        state.metrics.total_time = started.elapsed().as_secs_f64();

        let (success, evaluation_details) = evaluate(
            task,
            workspace.path(),
            state.final_answer.as_deref(),
            command_timeout,
        )
        .await;

        info!(
            status = ?state.status,
            success,
            turns = state.metrics.turns,
            tool_calls = state.metrics.tool_calls,
            total_time = state.metrics.total_time,
            "task finished"
        );

        Ok(TaskResult {
            messages: state.messages,
            success,
            task_status: state.status,
            agent_metrics: state.metrics,
            evaluation_details,
        })
    }

    async fn drive(&self, state: &mut RunState, executor: &ToolExecutor, sampling_params: &Value) {
        for turn in 0..self.max_turns {
            state.metrics.turns = turn + 1;

            let prompt = messages_to_prompt(&state.messages);
            let query_started = Instant::now();
            let response = self.model.generate(&prompt, sampling_params).await;
            state.metrics.model_query_time_sum += query_started.elapsed().as_secs_f64();

            let response = match response {
                Ok(text) => text,
                Err(e) => {
                    error!(turn, error = %e, "model query failed");
                    state.status = TaskStatus::Error;
                    return;
                }
            };

            state.messages.push(ChatMessage::assistant(response.clone()));

            let tool_calls = parse_tool_calls(&response);
            if tool_calls.is_empty() {
                if is_final_answer(&response) {
                    state.final_answer = Some(response);
                    state.status = TaskStatus::Completed;
                    return;
                }
                continue;
            }

            let mut results = Vec::with_capacity(tool_calls.len());
            for call in tool_calls {
                if state.metrics.tool_calls >= self.max_tool_calls {
                    state.status = TaskStatus::Truncated;
                    return;
                }
                let exec_started = Instant::now();
                let result = executor.execute(&call.name, &call.arguments).await;
                state.metrics.env_execution_time_sum += exec_started.elapsed().as_secs_f64();
                state.metrics.tool_calls += 1;
                results.push(ToolOutcome {
                    tool: call.name,
                    result,
                });
            }

            state
                .messages
                .push(ChatMessage::tool(format_tool_results(&results)));
        }

        state.status = TaskStatus::Truncated;
    }
}
