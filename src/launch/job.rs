//! Bringing up the cluster head and submitting the training job.

use std::time::Duration;

use anyhow::Result;
use tracing::{info, warn};

use crate::error::LaunchError;
use crate::launch::config::LaunchConfig;
use crate::launch::flags::FlagGroups;
use crate::launch::runner::{CommandOutput, CommandRunner, CommandSpec};
use crate::launch::runtime_env::RuntimeEnv;
use crate::launch::topology::{NvlinkProbe, Topology};
use crate::trajectory::client::GymClient;

const GYM_HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

/// The two fail-fast commands of a launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchPlan {
    pub head: CommandSpec,
    pub submit: CommandSpec,
}

pub struct JobLauncher<R> {
    config: LaunchConfig,
    runner: R,
}

impl<R: CommandRunner> JobLauncher<R> {
    pub fn new(config: LaunchConfig, runner: R) -> Self {
        Self { config, runner }
    }

    pub fn config(&self) -> &LaunchConfig {
        &self.config
    }

    /// Cleanup, probe, start the head, submit.
    pub async fn run(&self) -> Result<()> {
        info!(run_id = %self.config.run_id, master_addr = %self.config.master_addr, "launching");

        self.cleanup().await;
        let topology = NvlinkProbe::detect(&self.runner).await;
        self.check_gym().await;

        let plan = self.plan(&topology)?;
        self.run_checked(&plan.head).await?;
        info!(num_gpus = self.config.num_gpus, "cluster head started");
        self.run_checked(&plan.submit).await?;
        info!(run_id = %self.config.run_id, "job submitted");
        Ok(())
    }

    /// Commands for the head start and the job submission.
    pub fn plan(&self, topology: &Topology) -> Result<LaunchPlan> {
        let c = &self.config;
        let head = CommandSpec::new(
            "ray",
            [
                "start".to_string(),
                "--head".to_string(),
                "--node-ip-address".to_string(),
                c.master_addr.clone(),
                "--num-gpus".to_string(),
                c.num_gpus.to_string(),
                "--disable-usage-stats".to_string(),
            ],
        );

        let runtime_env = RuntimeEnv::for_launch(c, topology).to_json()?;
        let mut args = vec![
            "job".to_string(),
            "submit".to_string(),
            format!("--address={}", c.dashboard_address),
            format!("--runtime-env-json={runtime_env}"),
            "--".to_string(),
            c.python.clone(),
            c.entry_point.clone(),
        ];
        args.extend(FlagGroups::standard(c).flatten());
        let submit = CommandSpec::new("ray", args).inherit_output();

        Ok(LaunchPlan { head, submit })
    }

    /// Kill leftovers from earlier runs. Nothing to kill is fine.
    async fn cleanup(&self) {
        let mut commands: Vec<CommandSpec> = self
            .config
            .cleanup_patterns
            .iter()
            .map(|p| CommandSpec::new("pkill", ["-9", p.as_str()]))
            .collect();
        commands.push(CommandSpec::new("ray", ["stop", "--force"]));

        for cmd in &commands {
            match self.runner.run(cmd).await {
                Ok(out) if !out.success() => {
                    info!(command = %cmd.display(), status = ?out.status, "cleanup step had nothing to do")
                }
                Ok(_) => {}
                Err(e) => warn!(command = %cmd.display(), error = %e, "cleanup step failed"),
            }
        }

        if self.config.cleanup_grace_secs > 0 {
            tokio::time::sleep(Duration::from_secs(self.config.cleanup_grace_secs)).await;
        }
    }

    /// Warn when the gym is configured but not answering.
    async fn check_gym(&self) {
        let Some(url) = &self.config.gym_url else {
            return;
        };
        let client = match GymClient::new(url, GYM_HEALTH_TIMEOUT) {
            Ok(client) => client,
            Err(e) => {
                warn!(%url, error = %e, "cannot build gym client");
                return;
            }
        };
        match client.health().await {
            Ok(body) => info!(%url, ?body, "gym is healthy"),
            Err(e) => warn!(%url, error = %e, "gym health check failed, continuing"),
        }
    }

    async fn run_checked(&self, spec: &CommandSpec) -> Result<CommandOutput, LaunchError> {
        let command = spec.display();
        let out = self
            .runner
            .run(spec)
            .await
            .map_err(|source| LaunchError::Spawn {
                command: command.clone(),
                source,
            })?;
        if !out.success() {
            let status = out
                .status
                .map(|c| c.to_string())
                .unwrap_or_else(|| "signal".to_string());
            return Err(LaunchError::CommandFailed { command, status });
        }
        Ok(out)
    }
}
