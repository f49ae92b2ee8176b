//! The `bash` tool.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use serde_json::Value;
use tokio::process::Command;
use tracing::warn;

use super::{str_arg, ToolExecutor};

/// Captured result of a shell command.
#[derive(Debug, Clone)]
pub struct ShellOutput {
    pub stdout: String,
    pub stderr: String,
    /// Exit code, `None` when the process was killed by a signal.
    pub code: Option<i32>,
}

impl ShellOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Outcome of [`run_shell`].
#[derive(Debug)]
pub enum ShellResult {
    Finished(ShellOutput),
    TimedOut,
}

/// Run `command` with `bash -c` in `cwd`, killing it after `timeout`.
pub async fn run_shell(command: &str, cwd: &Path, timeout: Duration) -> std::io::Result<ShellResult> {
    let child = Command::new("bash")
        .arg("-c")
        .arg(command)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()?;

    // Dropping the wait future on timeout drops the child, which kills it.
    match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(output) => {
            let output = output?;
            Ok(ShellResult::Finished(ShellOutput {
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                code: output.status.code(),
            }))
        }
        Err(_) => Ok(ShellResult::TimedOut),
    }
}

impl ToolExecutor {
    pub(super) async fn bash(&self, arguments: &Value) -> String {
        let command = str_arg(arguments, "command");
        if command.is_empty() {
            return "Error: No command provided".into();
        }

        match run_shell(command, &self.workspace, self.command_timeout).await {
            Ok(ShellResult::Finished(output)) => {
                let mut result = output.stdout;
                if !output.stderr.is_empty() {
                    result.push_str("\nSTDERR:\n");
                    result.push_str(&output.stderr);
                }
                if result.is_empty() {
                    return "(command completed with no output)".into();
                }
                self.truncate(result)
            }
            Ok(ShellResult::TimedOut) => {
                warn!(command, "bash tool timed out");
                format!(
                    "Error: Command timed out after {} seconds",
                    self.command_timeout.as_secs()
                )
            }
            Err(e) => format!("Error: {e}"),
        }
    }
}
