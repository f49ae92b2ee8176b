//! Rollout collection: running task groups through the gym.
//!
//! For every [`TaskRecord`] the [`RolloutCollector`] draws
//! `n_samples_per_prompt` samples and, for each one:
//!   1. builds a [`GymRequest`] from the sample's prompt and metadata,
//!   2. runs it on the [`GymBackend`],
//!   3. records the outcome in the sample's metadata and tokenizes the
//!      conversation,
//!   4. scores it with the shaped reward.
//!
//! Samples run concurrently up to the configured limit. Finished groups pass
//! through [`dynamic_filter`] and the kept samples feed the agent metrics.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::{json, Value};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::config::RolloutConfig;
use crate::trajectory::client::{GymBackend, GymRequest};
use crate::trajectory::sample::{Sample, SamplePrompt, SampleStatus, TaskRecord};
use crate::trajectory::tokens::{build_tokens_and_mask, TextTokenizer};
use crate::trajectory::types::TaskResult;
use crate::training::{aggregate_agent_metrics, dynamic_filter, reward};

/// Result of one rollout over a batch of task records.
#[derive(Debug, Default)]
pub struct RolloutOutput {
    /// Groups that passed the filter, in task record order.
    pub groups: Vec<Vec<Sample>>,
    /// Groups dropped by the filter, with the reason.
    pub filtered: Vec<(Vec<Sample>, &'static str)>,
    /// `agent/...` metrics over the kept samples.
    pub metrics: BTreeMap<String, f64>,
}

pub struct RolloutCollector<B> {
    backend: Arc<B>,
    tokenizer: Arc<dyn TextTokenizer>,
    config: RolloutConfig,
}

impl<B: GymBackend> RolloutCollector<B> {
    pub fn new(backend: B, tokenizer: Arc<dyn TextTokenizer>, config: RolloutConfig) -> Self {
        Self {
            backend: Arc::new(backend),
            tokenizer,
            config,
        }
    }

    /// Run every record `n_samples_per_prompt` times and group the results.
    pub async fn collect(&self, records: &[TaskRecord]) -> Result<RolloutOutput> {
        let permits = Arc::new(Semaphore::new(self.config.concurrency.max(1)));
        let mut set = JoinSet::new();

        for (group_index, record) in records.iter().enumerate() {
            for _ in 0..self.config.n_samples_per_prompt {
                let sample = Sample::from_record(record, group_index);
                let backend = Arc::clone(&self.backend);
                let tokenizer = Arc::clone(&self.tokenizer);
                let permits = Arc::clone(&permits);
                let config = self.config.clone();
                set.spawn(async move {
                    let _permit = permits
                        .acquire_owned()
                        .await
                        .context("rollout semaphore closed")?;
                    generate(backend.as_ref(), tokenizer.as_ref(), &config, sample).await
                });
            }
        }

        let mut groups: Vec<Vec<Sample>> = vec![Vec::new(); records.len()];
        while let Some(joined) = set.join_next().await {
            let mut sample = joined.context("rollout task panicked")??;
            sample.reward = Some(reward(&sample));
            let index = sample.group_index;
            groups[index].push(sample);
        }

        let mut output = RolloutOutput::default();
        for group in groups {
            let verdict = dynamic_filter(&group);
            match (verdict.keep, verdict.reason) {
                (false, Some(reason)) => {
                    warn!(group_size = group.len(), reason, "dropping group");
                    output.filtered.push((group, reason));
                }
                _ => output.groups.push(group),
            }
        }

        let kept: Vec<Sample> = output.groups.iter().flatten().cloned().collect();
        output.metrics = aggregate_agent_metrics(&kept);
        info!(
            kept_groups = output.groups.len(),
            filtered_groups = output.filtered.len(),
            metrics = ?output.metrics,
            "rollout finished"
        );
        Ok(output)
    }
}

/// Run one sample through the gym and fill in its outcome.
///
/// A failed gym call marks the sample aborted with status `error` instead of
/// failing the whole rollout.
pub async fn generate<B: GymBackend>(
    backend: &B,
    tokenizer: &dyn TextTokenizer,
    config: &RolloutConfig,
    mut sample: Sample,
) -> Result<Sample> {
    let request = GymRequest {
        task: sample.task(),
        sampling_params: config.sampling_params(),
        sglang_url: config.sglang_url.clone(),
        max_turns: config.max_turns,
        max_tool_calls: config.max_tool_calls,
    };

    let result = match backend.run(&request).await {
        Ok(result) => result,
        Err(e) => {
            warn!(sample = %sample.id, error = %e, "gym run failed");
            sample.metadata.insert("success".into(), json!(false));
            sample.metadata.insert("task_status".into(), json!("error"));
            sample.status = SampleStatus::Aborted;
            return Ok(sample);
        }
    };

    apply_result(&mut sample, result, tokenizer)?;
    Ok(sample)
}

fn apply_result(
    sample: &mut Sample,
    result: TaskResult,
    tokenizer: &dyn TextTokenizer,
) -> Result<()> {
    if result.messages.len() >= 2 {
        sample.prompt = SamplePrompt::Messages(result.messages[..2].to_vec());
    }

    let tokenized = build_tokens_and_mask(&result.messages, tokenizer)?;
    sample.tokens = tokenized.tokens;
    sample.loss_mask = tokenized.loss_mask;
    sample.response = tokenized.response_text;
    sample.response_length = tokenized.response_length;

    sample.status = SampleStatus::from_outcome(result.task_status, result.success);

    let meta = &mut sample.metadata;
    meta.insert("success".into(), Value::Bool(result.success));
    meta.insert("task_status".into(), serde_json::to_value(result.task_status)?);
    meta.insert("agent_metrics".into(), serde_json::to_value(&result.agent_metrics)?);
    meta.insert("messages".into(), serde_json::to_value(&result.messages)?);
    meta.insert(
        "evaluation_details".into(),
        serde_json::to_value(&result.evaluation_details)?,
    );
    Ok(())
}
