//! Training-side hooks for gym rollouts.
//!
//! The trainer itself is external; this module supplies what it calls back
//! into: reward shaping, group filtering and metric aggregation.

pub mod filter;
pub mod metrics;
pub mod reward;

pub use filter::{dynamic_filter, FilterOutcome};
pub use metrics::aggregate_agent_metrics;
pub use reward::{reward, shaped_reward};
