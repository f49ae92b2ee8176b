//! Model-facing pieces of the gym.
//!
//! - [`api::SglangClient`] -- client for the inference server's `/generate`
//!   endpoint, behind the [`api::ModelBackend`] trait.
//! - [`prompt`] -- the agent system prompt and the chat template.

pub mod api;
pub mod prompt;

pub use api::{ChatMessage, ModelBackend, Role, SglangClient};
