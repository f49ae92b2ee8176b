//! Group filtering before training.

use crate::trajectory::sample::{Sample, SampleStatus};

/// Verdict for one group of samples drawn from the same task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterOutcome {
    pub keep: bool,
    pub reason: Option<&'static str>,
}

/// Drop groups containing an aborted sample (model or gym failures).
pub fn dynamic_filter(group: &[Sample]) -> FilterOutcome {
    if group.iter().any(|s| s.status == SampleStatus::Aborted) {
        return FilterOutcome {
            keep: false,
            reason: Some("group_has_aborted"),
        };
    }
    FilterOutcome {
        keep: true,
        reason: None,
    }
}
