//! GPU interconnect probe.

use std::sync::LazyLock;

use regex::Regex;
use tracing::{info, warn};

use crate::launch::runner::{CommandRunner, CommandSpec};

static NVLINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"NV\d+").unwrap_or_else(|e| panic!("invalid nvlink regex: {e}"))
});

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Topology {
    pub nvlink_count: usize,
}

impl Topology {
    pub fn has_nvlink(&self) -> bool {
        self.nvlink_count > 0
    }
}

/// Count `NV<n>` link entries in `nvidia-smi topo -m` output.
pub fn parse_nvlink_count(topology_text: &str) -> usize {
    NVLINK.find_iter(topology_text).count()
}

pub struct NvlinkProbe;

impl NvlinkProbe {
    pub fn command() -> CommandSpec {
        CommandSpec::new("nvidia-smi", ["topo", "-m"])
    }

    /// Run the probe. A missing tool or a failed run counts as no NVLink.
    pub async fn detect<R: CommandRunner>(runner: &R) -> Topology {
        let nvlink_count = match runner.run(&Self::command()).await {
            Ok(out) if out.success() => parse_nvlink_count(&out.stdout),
            Ok(out) => {
                warn!(status = ?out.status, "nvidia-smi topo failed, assuming no NVLink");
                0
            }
            Err(e) => {
                warn!(error = %e, "nvidia-smi unavailable, assuming no NVLink");
                0
            }
        };
        let topology = Topology { nvlink_count };
        info!(nvlink_count, has_nvlink = topology.has_nvlink(), "detected topology");
        topology
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::launch::runner::tests::RecordingRunner;

    const TOPO_NVLINK: &str = "\
\tGPU0\tGPU1\tGPU2\tCPU Affinity
GPU0\t X \tNV18\tNV18\t0-47
GPU1\tNV18\t X \tNV18\t0-47
GPU2\tNV18\tNV18\t X \t0-47
";

    const TOPO_PCIE: &str = "\
\tGPU0\tGPU1\tCPU Affinity
GPU0\t X \tPHB\t0-15
GPU1\tPHB\t X \t0-15
";

    #[test]
    fn test_parse_counts() {
        assert_eq!(parse_nvlink_count(TOPO_NVLINK), 6);
        assert_eq!(parse_nvlink_count(TOPO_PCIE), 0);
        assert_eq!(parse_nvlink_count(""), 0);
    }

    #[tokio::test]
    async fn test_detect_from_runner() {
        let runner = RecordingRunner::default().script("nvidia-smi", 0, TOPO_NVLINK);
        let topology = NvlinkProbe::detect(&runner).await;
        assert!(topology.has_nvlink());
        assert_eq!(runner.lines(), ["nvidia-smi topo -m"]);
    }

    #[tokio::test]
    async fn test_detect_failures_mean_no_nvlink() {
        let missing = RecordingRunner::default().missing("nvidia-smi");
        assert_eq!(NvlinkProbe::detect(&missing).await.nvlink_count, 0);

        let failing = RecordingRunner::default().script("nvidia-smi", 9, TOPO_NVLINK);
        assert!(!NvlinkProbe::detect(&failing).await.has_nvlink());
    }
}
