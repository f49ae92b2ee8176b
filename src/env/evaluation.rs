//! Post-run task evaluation.
//!
//! Without checkable criteria the outcome falls back to a heuristic: a final
//! answer counts as success (progress 1.0), anything else earns partial
//! credit for attempting (progress 0.3).
//!
//! With criteria, each one is checked against the workspace and recorded in
//! `criteria_met`; success requires all of them and progress is the fraction
//! met.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, warn};

use crate::env::task::Task;
use crate::tools::resolve_within;
use crate::tools::shell::{run_shell, ShellResult};
use crate::trajectory::types::EvaluationDetails;

const ATTEMPT_CREDIT: f64 = 0.3;

/// Evaluate `task` against the final state of `workspace`.
pub async fn evaluate(
    task: &Task,
    workspace: &Path,
    final_answer: Option<&str>,
    command_timeout: Duration,
) -> (bool, EvaluationDetails) {
    let criteria = &task.success_criteria;
    let mut details = EvaluationDetails::default();

    if !criteria.is_checkable() {
        let success = final_answer.is_some();
        details.progress = if success { 1.0 } else { ATTEMPT_CREDIT };
        return (success, details);
    }

    if !criteria.files_modified.is_empty() {
        let modified = files_modified(task, workspace).await;
        details.criteria_met.insert("files_modified".into(), modified);
    }

    if criteria.tests_pass {
        if let Some(command) = criteria.test_command.as_deref() {
            let passed = tests_pass(command, workspace, command_timeout).await;
            details.criteria_met.insert("tests_pass".into(), passed);
        }
    }

    let total = details.criteria_met.len();
    let met = details.criteria_met.values().filter(|m| **m).count();
    details.progress = met as f64 / total as f64;
    let success = met == total;

    debug!(met, total, success, "evaluated success criteria");
    (success, details)
}

/// Every listed path exists and no longer matches its setup contents.
///
/// Setup files and criteria entries are compared by resolved path, so
/// `a.py` and `./a.py` name the same file.
async fn files_modified(task: &Task, workspace: &Path) -> bool {
    let original: HashMap<PathBuf, &str> = task
        .workspace_setup
        .files
        .iter()
        .filter_map(|(rel, content)| {
            resolve_within(workspace, rel).map(|full| (full, content.as_str()))
        })
        .collect();

    for rel in &task.success_criteria.files_modified {
        let Some(full) = resolve_within(workspace, rel) else {
            return false;
        };
        let Ok(current) = tokio::fs::read_to_string(&full).await else {
            debug!(file = %rel, "expected modified file is missing");
            return false;
        };
        if original.get(&full) == Some(&current.as_str()) {
            debug!(file = %rel, "file unchanged from setup");
            return false;
        }
    }
    true
}

async fn tests_pass(command: &str, workspace: &Path, timeout: Duration) -> bool {
    match run_shell(command, workspace, timeout).await {
        Ok(ShellResult::Finished(output)) => output.success(),
        Ok(ShellResult::TimedOut) => {
            warn!(command, "test command timed out");
            false
        }
        Err(e) => {
            warn!(command, error = %e, "failed to run test command");
            false
        }
    }
}
