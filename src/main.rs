//! codegym: a coding-agent gym and its training launcher.
//!
//! Subcommands:
//!
//! - `serve`    -- Run the gym HTTP server
//! - `rollout`  -- Run a JSONL task file through a gym and write scored samples
//! - `launch`   -- Clean up, start the cluster head and submit the training job
//! - `health`   -- Check that a gym server is up

use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use tracing_subscriber::EnvFilter;

use codegym::config::GymConfig;
use codegym::launch::{DryRunRunner, JobLauncher, LaunchConfig, SystemRunner, Topology};
use codegym::trajectory::{GymClient, HfTokenizer, RolloutCollector, TaskRecord};

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

/// codegym: a coding-agent gym and its training launcher
#[derive(Parser)]
#[command(name = "codegym", version, about)]
struct Cli {
    /// JSON configuration file: `GymConfig` for serve/rollout/health,
    /// `LaunchConfig` for launch. Defaults are used when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the gym HTTP server.
    Serve {
        #[arg(long)]
        host: Option<String>,

        #[arg(long)]
        port: Option<u16>,

        /// Upper bound on concurrently running tasks.
        #[arg(long)]
        max_concurrent_tasks: Option<usize>,
    },

    /// Run every task record through the gym and write scored samples.
    Rollout {
        /// JSONL of task records (`prompt`, `metadata`, `label`).
        #[arg(long)]
        input: PathBuf,

        /// Where to write kept samples (JSONL).
        #[arg(long, default_value = "data/samples.jsonl")]
        output: PathBuf,

        /// HuggingFace `tokenizer.json` for the policy model.
        #[arg(long)]
        tokenizer: PathBuf,

        #[arg(long, env = "CLAUDE_CODE_GYM_URL")]
        gym_url: Option<String>,

        /// Inference server base URL passed to the gym.
        #[arg(long)]
        sglang_url: Option<String>,

        #[arg(long)]
        n_samples_per_prompt: Option<usize>,
    },

    /// Clean up, probe the topology, start the cluster head, submit the job.
    Launch {
        /// Log the commands instead of running them.
        #[arg(long)]
        dry_run: bool,
    },

    /// Check that a gym server answers `/health`.
    Health {
        #[arg(long, env = "CLAUDE_CODE_GYM_URL")]
        gym_url: Option<String>,
    },
}

// ---------------------------------------------------------------------------
// Entrypoint
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise tracing (reads RUST_LOG env var, defaults to info).
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            host,
            port,
            max_concurrent_tasks,
        } => {
            let mut config = gym_config(cli.config.as_deref())?;
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(n) = max_concurrent_tasks {
                config.server.max_concurrent_tasks = n;
            }
            codegym::server::serve(config).await
        }
        Commands::Rollout {
            input,
            output,
            tokenizer,
            gym_url,
            sglang_url,
            n_samples_per_prompt,
        } => {
            let mut config = gym_config(cli.config.as_deref())?;
            if let Some(url) = gym_url {
                config.rollout.gym_url = url;
            }
            if let Some(url) = sglang_url {
                config.rollout.sglang_url = url;
            }
            if let Some(n) = n_samples_per_prompt {
                config.rollout.n_samples_per_prompt = n;
            }
            cmd_rollout(&config, &input, &output, &tokenizer).await
        }
        Commands::Launch { dry_run } => {
            let config: LaunchConfig = load_config(cli.config.as_deref())?;
            cmd_launch(config.from_env_overrides(), dry_run).await
        }
        Commands::Health { gym_url } => {
            let config = gym_config(cli.config.as_deref())?;
            let url = gym_url.unwrap_or(config.rollout.gym_url);
            cmd_health(&url).await
        }
    }
}

/// Load the gym config and fill secrets and endpoints from the environment.
fn gym_config(path: Option<&Path>) -> Result<GymConfig> {
    let mut config: GymConfig = load_config(path)?;
    config.apply_env();
    Ok(config)
}

fn load_config<T: DeserializeOwned + Default>(path: Option<&Path>) -> Result<T> {
    match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("Failed to parse config from {}", path.display()))
        }
        None => Ok(T::default()),
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_rollout(
    config: &GymConfig,
    input: &Path,
    output: &Path,
    tokenizer_path: &Path,
) -> Result<()> {
    let records = read_records(input)?;
    tracing::info!(
        records = records.len(),
        samples_per_prompt = config.rollout.n_samples_per_prompt,
        gym_url = %config.rollout.gym_url,
        "Starting rollout"
    );

    let client = GymClient::new(
        &config.rollout.gym_url,
        Duration::from_secs(config.rollout.request_timeout_secs),
    )?;
    let tokenizer = Arc::new(HfTokenizer::from_file(tokenizer_path)?);
    let collector = RolloutCollector::new(client, tokenizer, config.rollout.clone());
    let rollout = collector.collect(&records).await?;

    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::File::create(output)
        .with_context(|| format!("Failed to create {}", output.display()))?;
    let mut writer = BufWriter::new(file);
    let mut written = 0;
    for sample in rollout.groups.iter().flatten() {
        serde_json::to_writer(&mut writer, sample)?;
        writer.write_all(b"\n")?;
        written += 1;
    }
    writer.flush()?;

    for (name, value) in &rollout.metrics {
        tracing::info!(metric = %name, value, "agent metric");
    }
    tracing::info!(
        path = %output.display(),
        samples = written,
        filtered_groups = rollout.filtered.len(),
        "Saved samples"
    );
    Ok(())
}

fn read_records(path: &Path) -> Result<Vec<TaskRecord>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let mut records = Vec::new();
    for (lineno, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(&line)
            .with_context(|| format!("{}:{}: invalid task record", path.display(), lineno + 1))?;
        records.push(record);
    }
    Ok(records)
}

async fn cmd_launch(mut config: LaunchConfig, dry_run: bool) -> Result<()> {
    if dry_run {
        config.cleanup_grace_secs = 0;
        let launcher = JobLauncher::new(config, DryRunRunner);
        let plan = launcher.plan(&Topology::default())?;
        println!("{}", plan.head.display());
        println!("{}", plan.submit.display());
        return launcher.run().await;
    }
    JobLauncher::new(config, SystemRunner).run().await
}

async fn cmd_health(url: &str) -> Result<()> {
    let client = GymClient::new(url, Duration::from_secs(5))?;
    let body = client.health().await?;
    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}
