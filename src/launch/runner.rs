//! Running external commands.

use std::io;
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, info};

/// One command line to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    /// Stream output to our stdout/stderr instead of capturing it.
    pub inherit_output: bool,
}

impl CommandSpec {
    pub fn new<I, S>(program: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.to_string(),
            args: args.into_iter().map(Into::into).collect(),
            inherit_output: false,
        }
    }

    pub fn inherit_output(mut self) -> Self {
        self.inherit_output = true;
        self
    }

    /// The command as a copy-pasteable shell line.
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .map(shell_quote)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code; `None` when killed by a signal.
    pub status: Option<i32>,
    /// Captured stdout (empty when output was inherited).
    pub stdout: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }
}

/// Executes commands. `Err` means the program could not be started.
#[allow(async_fn_in_trait)]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, spec: &CommandSpec) -> io::Result<CommandOutput>;
}

/// Runs commands on this machine.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    async fn run(&self, spec: &CommandSpec) -> io::Result<CommandOutput> {
        debug!(command = %spec.display(), "running");
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args).stdin(Stdio::null());

        if spec.inherit_output {
            let status = cmd.status().await?;
            return Ok(CommandOutput {
                status: status.code(),
                stdout: String::new(),
            });
        }

        let output = cmd.output().await?;
        Ok(CommandOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        })
    }
}

/// Logs each command instead of running it; everything "succeeds".
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunRunner;

impl CommandRunner for DryRunRunner {
    async fn run(&self, spec: &CommandSpec) -> io::Result<CommandOutput> {
        info!(command = %spec.display(), "dry run");
        Ok(CommandOutput {
            status: Some(0),
            stdout: String::new(),
        })
    }
}

/// Quote `s` for a POSIX shell when it contains anything beyond a safe set.
pub fn shell_quote(s: &str) -> String {
    if s.is_empty() {
        "''".to_string()
    } else if s
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || "-_./:=,@%+".contains(c))
    {
        s.to_string()
    } else {
        format!("'{}'", s.replace('\'', r"'\''"))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Records every command; answers from a per-program script.
    ///
    /// Programs without a script exit 0. `missing` programs fail to spawn.
    #[derive(Default)]
    pub(crate) struct RecordingRunner {
        pub(crate) calls: Mutex<Vec<CommandSpec>>,
        pub(crate) scripted: HashMap<String, CommandOutput>,
        pub(crate) missing: Vec<String>,
    }

    impl RecordingRunner {
        pub(crate) fn script(mut self, program: &str, status: i32, stdout: &str) -> Self {
            self.scripted.insert(
                program.to_string(),
                CommandOutput {
                    status: Some(status),
                    stdout: stdout.to_string(),
                },
            );
            self
        }

        pub(crate) fn missing(mut self, program: &str) -> Self {
            self.missing.push(program.to_string());
            self
        }

        pub(crate) fn lines(&self) -> Vec<String> {
            self.calls.lock().unwrap().iter().map(CommandSpec::display).collect()
        }
    }

    impl CommandRunner for RecordingRunner {
        async fn run(&self, spec: &CommandSpec) -> io::Result<CommandOutput> {
            self.calls.lock().unwrap().push(spec.clone());
            if self.missing.contains(&spec.program) {
                return Err(io::Error::new(io::ErrorKind::NotFound, "not found"));
            }
            Ok(self
                .scripted
                .get(&spec.program)
                .cloned()
                .unwrap_or(CommandOutput {
                    status: Some(0),
                    stdout: String::new(),
                }))
        }
    }

    #[test]
    fn test_shell_quote() {
        assert_eq!(shell_quote("--num-gpus"), "--num-gpus");
        assert_eq!(shell_quote(""), "''");
        assert_eq!(shell_quote(r#"{"a": 1}"#), r#"'{"a": 1}'"#);
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
    }

    #[test]
    fn test_display() {
        let spec = CommandSpec::new("ray", ["stop", "--force"]);
        assert_eq!(spec.display(), "ray stop --force");
        assert!(!spec.inherit_output);
        assert!(spec.inherit_output().inherit_output);
    }

    #[tokio::test]
    async fn test_system_runner_captures_stdout() {
        let out = SystemRunner
            .run(&CommandSpec::new("sh", ["-c", "echo hi; exit 3"]))
            .await
            .unwrap();
        assert_eq!(out.stdout, "hi\n");
        assert_eq!(out.status, Some(3));
        assert!(!out.success());
    }

    #[tokio::test]
    async fn test_system_runner_missing_program() {
        let err = SystemRunner
            .run(&CommandSpec::new("definitely-not-a-real-binary-xyz", Vec::<String>::new()))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
