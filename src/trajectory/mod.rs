//! Trajectories: what the gym returns and how the trainer consumes it.
//!
//! This module provides:
//! - [`types::TaskResult`] and friends -- the wire format of a finished run.
//! - [`client::GymClient`] -- the HTTP client for a gym server, behind the
//!   [`client::GymBackend`] trait.
//! - [`sample::Sample`] -- one rollout sample with tokens, mask and reward.
//! - [`tokens::build_tokens_and_mask`] -- conversation to training tokens.
//! - [`collector::RolloutCollector`] -- concurrent group rollouts.

pub mod client;
pub mod collector;
pub mod sample;
pub mod tokens;
pub mod types;

pub use client::{GymBackend, GymClient, GymRequest};
pub use collector::{generate, RolloutCollector, RolloutOutput};
pub use sample::{Sample, SamplePrompt, SampleStatus, TaskRecord};
pub use tokens::{build_tokens_and_mask, HfTokenizer, TextTokenizer, TokenizedConversation};
pub use types::{AgentMetrics, EvaluationDetails, TaskResult, TaskStatus};
