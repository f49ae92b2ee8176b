//! Wire types for agent trajectories returned by the gym.
//!
//! The server produces these; the rollout client parses them leniently
//! (every field has a default) since the gym may be a different build.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::api::ChatMessage;

/// How an agent run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Running,
    Completed,
    Truncated,
    Error,
    Timeout,
    Failed,
    #[default]
    #[serde(other)]
    Unknown,
}

/// Per-run counters and timings (seconds).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentMetrics {
    pub turns: usize,
    pub tool_calls: usize,
    pub model_query_time_sum: f64,
    pub env_execution_time_sum: f64,
    pub total_time: f64,
}

/// Result of checking the success criteria.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationDetails {
    /// Criterion name -> whether it was met.
    pub criteria_met: BTreeMap<String, bool>,
    /// Fraction of the task considered done, in [0, 1].
    pub progress: f64,
}

/// Everything the gym returns for one task run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskResult {
    pub messages: Vec<ChatMessage>,
    pub success: bool,
    pub task_status: TaskStatus,
    pub agent_metrics: AgentMetrics,
    pub evaluation_details: EvaluationDetails,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_wire_names() {
        assert_eq!(serde_json::to_value(TaskStatus::Timeout).unwrap(), "timeout");
        let status: TaskStatus = serde_json::from_str(r#""cancelled""#).unwrap();
        assert_eq!(status, TaskStatus::Unknown);
    }

    #[test]
    fn test_partial_result_parses_with_defaults() {
        let result: TaskResult =
            serde_json::from_str(r#"{"task_status": "completed", "success": true}"#).unwrap();
        assert_eq!(result.task_status, TaskStatus::Completed);
        assert!(result.messages.is_empty());
        assert_eq!(result.agent_metrics.tool_calls, 0);
        assert_eq!(result.evaluation_details.progress, 0.0);
    }

    #[test]
    fn test_missing_status_is_unknown() {
        let result: TaskResult = serde_json::from_str("{}").unwrap();
        assert_eq!(result.task_status, TaskStatus::Unknown);
    }
}
