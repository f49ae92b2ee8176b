//! Reward shaping for gym trajectories.
//!
//!   r = (success ? 1.0 : 0.5 * progress)
//!     + max(-0.01 * tool_calls, -0.3)
//!     - (status in {error, failed} ? 0.5 : 0)
//!
//! clamped to [-0.5, 1.0].

use tracing::debug;

use crate::trajectory::sample::Sample;
use crate::trajectory::types::TaskStatus;

pub const SUCCESS_REWARD: f64 = 1.0;
pub const PROGRESS_WEIGHT: f64 = 0.5;
pub const TOOL_CALL_PENALTY: f64 = -0.01;
pub const MAX_TOOL_PENALTY: f64 = -0.3;
pub const ERROR_PENALTY: f64 = 0.5;
pub const MIN_REWARD: f64 = -0.5;
pub const MAX_REWARD: f64 = 1.0;

/// Score a finished sample from the outcome recorded in its metadata.
pub fn reward(sample: &Sample) -> f64 {
    let success = sample.success();
    let progress = sample.evaluation_details().progress;
    let tool_calls = sample.agent_metrics().map(|m| m.tool_calls).unwrap_or(0);
    let status = sample.task_status();

    let r = shaped_reward(success, progress, tool_calls, status);
    debug!(success, progress, tool_calls, ?status, reward = r, "computed reward");
    r
}

pub fn shaped_reward(success: bool, progress: f64, tool_calls: usize, status: TaskStatus) -> f64 {
    let mut r = if success {
        SUCCESS_REWARD
    } else {
        PROGRESS_WEIGHT * progress
    };
    r += (TOOL_CALL_PENALTY * tool_calls as f64).max(MAX_TOOL_PENALTY);
    if matches!(status, TaskStatus::Error | TaskStatus::Failed) {
        r -= ERROR_PENALTY;
    }
    r.clamp(MIN_REWARD, MAX_REWARD)
}
