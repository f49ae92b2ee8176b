//! Tool execution for the coding agent.
//!
//! The [`ToolExecutor`] runs the tools advertised by [`tool_specs`] inside a
//! single workspace directory:
//! - **shell** ([`shell`]) -- `bash`.
//! - **files** ([`files`]) -- `read`, `write`, `edit`.
//! - **search** ([`search`]) -- `grep`, `glob`.
//! - **web** ([`web`]) -- `web_search`, `web_fetch`.
//!
//! Tool failures are never surfaced as `Err`: the model sees an `Error: ...`
//! string and can react to it on its next turn.

pub mod files;
pub mod search;
pub mod shell;
pub mod specs;
pub mod web;

use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::debug;

use crate::config::ToolConfig;

pub use specs::{tool_specs, FunctionSpec, ToolSpec};

/// Executes tool calls against a workspace directory.
#[derive(Debug, Clone)]
pub struct ToolExecutor {
    workspace: PathBuf,
    command_timeout: Duration,
    web_timeout: Duration,
    max_output_length: usize,
    search_endpoint: String,
    search_api_key: String,
    http: reqwest::Client,
}

impl ToolExecutor {
    /// Create an executor rooted at `workspace`, creating the directory if needed.
    pub fn new(workspace: &Path, config: &ToolConfig) -> Result<Self> {
        std::fs::create_dir_all(workspace)
            .with_context(|| format!("failed to create workspace {}", workspace.display()))?;

        let web_timeout = Duration::from_secs(config.web_timeout_secs);
        let http = reqwest::Client::builder()
            .timeout(web_timeout)
            .build()
            .context("failed to build tool http client")?;

        Ok(Self {
            workspace: workspace.to_path_buf(),
            command_timeout: Duration::from_secs(config.command_timeout_secs),
            web_timeout,
            max_output_length: config.max_output_length,
            search_endpoint: config.search_endpoint.clone(),
            search_api_key: config.search_api_key.clone(),
            http,
        })
    }

    pub fn workspace(&self) -> &Path {
        &self.workspace
    }

    /// The tool catalogue this executor understands.
    pub fn tool_specs(&self) -> Vec<ToolSpec> {
        tool_specs()
    }

    /// Execute `tool_name` with `arguments` and return the textual result.
    pub async fn execute(&self, tool_name: &str, arguments: &Value) -> String {
        debug!(tool = tool_name, "executing tool");
        match tool_name {
            "bash" => self.bash(arguments).await,
            "read" => self.read(arguments).await,
            "write" => self.write(arguments).await,
            "edit" => self.edit(arguments).await,
            "grep" => self.grep(arguments).await,
            "glob" => self.glob(arguments).await,
            "web_search" => self.web_search(arguments).await,
            "web_fetch" => self.web_fetch(arguments).await,
            other => format!("Error: Unknown tool '{other}'"),
        }
    }

    /// Resolve a model-supplied relative path inside the workspace.
    pub(crate) fn resolve(&self, relative: &str) -> Result<PathBuf, String> {
        resolve_within(&self.workspace, relative)
            .ok_or_else(|| format!("Error: Path escapes workspace: {relative}"))
    }

    /// Render `path` relative to the workspace root.
    pub(crate) fn display_relative(&self, path: &Path) -> String {
        path.strip_prefix(&self.workspace)
            .unwrap_or(path)
            .to_string_lossy()
            .into_owned()
    }

    pub(crate) fn truncate(&self, text: String) -> String {
        truncate_output(text, self.max_output_length, "\n... (output truncated)")
    }
}

/// Join `relative` onto `root`, refusing absolute paths and `..` components
/// that climb above `root`.
pub fn resolve_within(root: &Path, relative: &str) -> Option<PathBuf> {
    let mut normalized = PathBuf::new();
    for component in Path::new(relative).components() {
        match component {
            Component::Normal(part) => normalized.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    return None;
                }
            }
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(root.join(normalized))
}

/// Read a string argument, treating missing or non-string values as empty.
pub(crate) fn str_arg<'a>(arguments: &'a Value, key: &str) -> &'a str {
    arguments.get(key).and_then(Value::as_str).unwrap_or("")
}

/// Cut `text` to `limit` characters and append `marker` when it was longer.
pub fn truncate_output(text: String, limit: usize, marker: &str) -> String {
    match text.char_indices().nth(limit) {
        Some((byte_idx, _)) => {
            let mut cut = text[..byte_idx].to_string();
            cut.push_str(marker);
            cut
        }
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn executor(dir: &Path) -> ToolExecutor {
        ToolExecutor::new(dir, &ToolConfig::default()).unwrap()
    }

    #[test]
    fn test_truncate_output_short_text_untouched() {
        assert_eq!(truncate_output("abc".into(), 3, "!"), "abc");
    }

    #[test]
    fn test_truncate_output_counts_characters() {
        let out = truncate_output("héllo wörld".into(), 5, "\n... (output truncated)");
        assert_eq!(out, "héllo\n... (output truncated)");
    }

    #[test]
    fn test_resolve_rejects_escapes() {
        let dir = tempfile::tempdir().unwrap();
        let exec = executor(dir.path());
        assert!(exec.resolve("../etc/passwd").is_err());
        assert!(exec.resolve("/etc/passwd").is_err());
        assert_eq!(
            exec.resolve("src/../lib.rs").unwrap(),
            dir.path().join("lib.rs")
        );
        assert_eq!(exec.resolve(".").unwrap(), dir.path().to_path_buf());
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let dir = tempfile::tempdir().unwrap();
        let exec = executor(dir.path());
        let out = exec.execute("teleport", &json!({})).await;
        assert_eq!(out, "Error: Unknown tool 'teleport'");
    }

    #[tokio::test]
    async fn test_write_then_read_through_dispatch() {
        let dir = tempfile::tempdir().unwrap();
        let exec = executor(dir.path());
        let out = exec
            .execute("write", &json!({"file_path": "a/b.txt", "content": "one\ntwo"}))
            .await;
        assert_eq!(out, "Successfully wrote 7 characters to a/b.txt");

        let out = exec.execute("read", &json!({"file_path": "a/b.txt"})).await;
        assert_eq!(out, "     1\tone\n     2\ttwo");
    }
}
