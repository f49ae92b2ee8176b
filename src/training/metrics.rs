//! Aggregate agent metrics across a rollout for logging.

use std::collections::BTreeMap;

use crate::trajectory::sample::Sample;
use crate::trajectory::types::AgentMetrics;

type Field = (&'static str, fn(&AgentMetrics) -> f64);

const COUNTERS: [Field; 2] = [
    ("turns", |m| m.turns as f64),
    ("tool_calls", |m| m.tool_calls as f64),
];

const TIMINGS: [Field; 3] = [
    ("model_query_time_sum", |m| m.model_query_time_sum),
    ("env_execution_time_sum", |m| m.env_execution_time_sum),
    ("total_time", |m| m.total_time),
];

/// Means and sums of the per-sample agent metrics, keyed `agent/...`.
///
/// Counters and timings average over samples that carry metrics; the success
/// rate is over all samples. Empty when no sample carries metrics.
pub fn aggregate_agent_metrics(samples: &[Sample]) -> BTreeMap<String, f64> {
    let all: Vec<AgentMetrics> = samples.iter().filter_map(Sample::agent_metrics).collect();
    let mut out = BTreeMap::new();
    if all.is_empty() {
        return out;
    }
    let n = all.len() as f64;

    for (name, get) in COUNTERS {
        let sum: f64 = all.iter().map(get).sum();
        out.insert(format!("agent/{name}_mean"), sum / n);
        out.insert(format!("agent/{name}_sum"), sum);
    }
    for (name, get) in TIMINGS {
        let sum: f64 = all.iter().map(get).sum();
        out.insert(format!("agent/{name}_mean"), sum / n);
    }

    let successes = samples.iter().filter(|s| s.success()).count();
    out.insert(
        "agent/success_rate".into(),
        successes as f64 / samples.len() as f64,
    );
    out
}
