//! Agent module: the model/tool interaction loop.
//!
//! The [`AgentController`] renders the conversation as a ChatML prompt,
//! queries a [`ModelBackend`](crate::model::ModelBackend), parses
//! `<tool_call>` blocks and feeds tool results back until the model gives a
//! final answer or a budget runs out.

pub mod controller;
pub mod parse;

pub use controller::AgentController;
pub use parse::{format_tool_results, is_final_answer, parse_tool_calls, ToolCall, ToolOutcome};
