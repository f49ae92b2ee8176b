//! Cluster launch: cleanup, topology probe, head start and job submission.
//!
//! - [`config::LaunchConfig`] -- launch settings with environment overrides.
//! - [`topology`] -- NVLink detection from `nvidia-smi topo -m`.
//! - [`runtime_env::RuntimeEnv`] -- env vars handed to the job.
//! - [`flags::FlagGroups`] -- the training entry point's flags by concern.
//! - [`runner`] -- the [`runner::CommandRunner`] seam over process execution.
//! - [`job::JobLauncher`] -- the launch sequence.

pub mod config;
pub mod flags;
pub mod job;
pub mod runner;
pub mod runtime_env;
pub mod topology;

pub use config::LaunchConfig;
pub use flags::{FlagGroup, FlagGroups};
pub use job::{JobLauncher, LaunchPlan};
pub use runner::{CommandOutput, CommandRunner, CommandSpec, DryRunRunner, SystemRunner};
pub use runtime_env::RuntimeEnv;
pub use topology::{parse_nvlink_count, NvlinkProbe, Topology};
