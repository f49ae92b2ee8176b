//! Rollout samples: the unit the trainer consumes.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::env::{SuccessCriteria, Task, WorkspaceSetup};
use crate::model::api::ChatMessage;
use crate::trajectory::types::{AgentMetrics, EvaluationDetails, TaskStatus};

/// One line of a task dataset (JSONL).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskRecord {
    pub prompt: String,
    /// Carries `task_type`, `workspace_setup` and `success_criteria`.
    #[serde(default)]
    pub metadata: Map<String, Value>,
    #[serde(default)]
    pub label: Option<Value>,
}

/// Prompt of a sample: the raw task text before the rollout, the opening
/// system + user messages after it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SamplePrompt {
    Text(String),
    Messages(Vec<ChatMessage>),
}

impl SamplePrompt {
    /// The task text: the raw text, or the last message's content.
    pub fn text(&self) -> &str {
        match self {
            SamplePrompt::Text(t) => t,
            SamplePrompt::Messages(msgs) => msgs.last().map(|m| m.content.as_str()).unwrap_or(""),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleStatus {
    #[default]
    Pending,
    Completed,
    Truncated,
    Aborted,
}

impl SampleStatus {
    /// Map a gym outcome onto a sample status.
    pub fn from_outcome(task_status: TaskStatus, success: bool) -> Self {
        match task_status {
            TaskStatus::Completed if success => SampleStatus::Completed,
            TaskStatus::Truncated | TaskStatus::Timeout => SampleStatus::Truncated,
            TaskStatus::Error | TaskStatus::Failed => SampleStatus::Aborted,
            _ if success => SampleStatus::Completed,
            _ => SampleStatus::Truncated,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sample {
    pub id: uuid::Uuid,
    /// Index of the task record this sample was drawn for.
    pub group_index: usize,
    pub prompt: SamplePrompt,
    pub label: Option<Value>,
    pub metadata: Map<String, Value>,
    pub tokens: Vec<u32>,
    pub loss_mask: Vec<u8>,
    pub response: String,
    pub response_length: usize,
    pub reward: Option<f64>,
    pub status: SampleStatus,
}

impl Sample {
    pub fn from_record(record: &TaskRecord, group_index: usize) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            group_index,
            prompt: SamplePrompt::Text(record.prompt.clone()),
            label: record.label.clone(),
            metadata: record.metadata.clone(),
            tokens: Vec::new(),
            loss_mask: Vec::new(),
            response: String::new(),
            response_length: 0,
            reward: None,
            status: SampleStatus::Pending,
        }
    }

    /// Build the gym task from the prompt and metadata. Malformed metadata
    /// fields fall back to their defaults.
    pub fn task(&self) -> Task {
        Task {
            prompt: self.prompt.text().to_string(),
            task_type: self
                .metadata
                .get("task_type")
                .and_then(Value::as_str)
                .unwrap_or("general")
                .to_string(),
            workspace_setup: self.metadata_field::<WorkspaceSetup>("workspace_setup"),
            success_criteria: self.metadata_field::<SuccessCriteria>("success_criteria"),
        }
    }

    pub fn success(&self) -> bool {
        self.metadata
            .get("success")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    pub fn task_status(&self) -> TaskStatus {
        self.metadata_field("task_status")
    }

    /// Agent metrics recorded by the rollout; `None` when absent or empty.
    pub fn agent_metrics(&self) -> Option<AgentMetrics> {
        match self.metadata.get("agent_metrics") {
            Some(Value::Object(map)) if !map.is_empty() => {
                serde_json::from_value(Value::Object(map.clone())).ok()
            }
            _ => None,
        }
    }

    pub fn evaluation_details(&self) -> EvaluationDetails {
        self.metadata_field("evaluation_details")
    }

    fn metadata_field<T: serde::de::DeserializeOwned + Default>(&self, key: &str) -> T {
        self.metadata
            .get(key)
            .cloned()
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default()
    }
}
