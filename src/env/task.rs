//! Task specification shared by the gym server and the rollout client.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

fn default_task_type() -> String {
    "general".into()
}

/// One coding task the agent must solve.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// The instruction given to the agent as its first user message.
    pub prompt: String,
    /// Free-form task label (e.g. "bug_fix", "feature", "exploration").
    #[serde(default = "default_task_type")]
    pub task_type: String,
    #[serde(default)]
    pub workspace_setup: WorkspaceSetup,
    #[serde(default)]
    pub success_criteria: SuccessCriteria,
}

/// Initial workspace contents.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkspaceSetup {
    /// Relative path -> file contents, written before the agent starts.
    #[serde(default)]
    pub files: BTreeMap<String, String>,
    /// Optional git repository cloned into the empty workspace first.
    #[serde(default)]
    pub repo: Option<String>,
}

/// Checks run against the workspace once the agent stops.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SuccessCriteria {
    /// Require `test_command` to exit 0.
    #[serde(default)]
    pub tests_pass: bool,
    /// Shell command run in the workspace when `tests_pass` is set.
    #[serde(default)]
    pub test_command: Option<String>,
    /// Paths that must exist and differ from their initial contents.
    #[serde(default)]
    pub files_modified: Vec<String>,
}

impl SuccessCriteria {
    /// Whether any criterion can actually be checked against the workspace.
    pub fn is_checkable(&self) -> bool {
        !self.files_modified.is_empty() || (self.tests_pass && self.test_command.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_task_defaults() {
        let task: Task = serde_json::from_str(r#"{"prompt": "fix it"}"#).unwrap();
        assert_eq!(task.task_type, "general");
        assert!(task.workspace_setup.files.is_empty());
        assert!(task.workspace_setup.repo.is_none());
        assert!(!task.success_criteria.is_checkable());
    }

    #[test]
    fn test_tests_pass_without_command_is_not_checkable() {
        let criteria = SuccessCriteria {
            tests_pass: true,
            ..SuccessCriteria::default()
        };
        assert!(!criteria.is_checkable());
    }
}
