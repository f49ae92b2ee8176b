//! Throwaway task workspaces.

use std::io;
use std::path::Path;
use std::process::Output;
use std::time::Duration;

use anyhow::{Context, Result};
use tempfile::TempDir;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::env::task::WorkspaceSetup;
use crate::tools::resolve_within;

const WORKSPACE_PREFIX: &str = "claude_code_workspace_";

/// A temporary directory the agent works in. Removed when dropped.
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    /// Create a fresh, empty workspace under the system temp directory.
    pub fn create() -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(WORKSPACE_PREFIX)
            .tempdir()
            .context("failed to create workspace directory")?;
        debug!(path = %dir.path().display(), "created workspace");
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Populate the workspace from the task's setup block.
    ///
    /// The repository (if any) is cloned first so that setup files can
    /// overlay it. A clone that fails or outlives `clone_timeout` is logged
    /// and the task continues.
    pub async fn apply(&self, setup: &WorkspaceSetup, clone_timeout: Duration) -> Result<()> {
        if let Some(repo) = setup.repo.as_deref().filter(|r| !r.is_empty()) {
            self.clone_repo(repo, clone_timeout).await;
        }

        for (rel, content) in &setup.files {
            let full = resolve_within(self.path(), rel)
                .with_context(|| format!("setup file path escapes workspace: {rel}"))?;
            if let Some(parent) = full.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .with_context(|| format!("failed to create directory for {rel}"))?;
            }
            tokio::fs::write(&full, content)
                .await
                .with_context(|| format!("failed to write setup file {rel}"))?;
        }

        debug!(files = setup.files.len(), "workspace setup complete");
        Ok(())
    }

    async fn clone_repo(&self, repo: &str, timeout: Duration) {
        let mut command = Command::new("git");
        command
            .args(["clone", "--depth", "1", repo, "."])
            .current_dir(self.path());

        match output_within(command, timeout).await {
            Some(Ok(out)) if out.status.success() => debug!(repo, "cloned repository"),
            Some(Ok(out)) => warn!(
                repo,
                status = ?out.status.code(),
                stderr = %String::from_utf8_lossy(&out.stderr).trim(),
                "git clone failed; continuing with an empty workspace"
            ),
            Some(Err(e)) => warn!(repo, error = %e, "could not run git; continuing"),
            None => warn!(
                repo,
                timeout_secs = timeout.as_secs(),
                "git clone timed out; continuing with an empty workspace"
            ),
        }
    }
}

/// Run `command` to completion, or kill it and return `None` after `timeout`.
async fn output_within(mut command: Command, timeout: Duration) -> Option<io::Result<Output>> {
    command.kill_on_drop(true);
    tokio::time::timeout(timeout, command.output()).await.ok()
}
