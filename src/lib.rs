//! codegym: an HTTP gym for tool-using coding agents, plus the glue that
//! trains against it.
//!
//! The gym side runs a model/tool loop against a task in a throwaway
//! workspace and returns the trajectory. The training side turns gym
//! trajectories into scored samples and launches the external trainer.

pub mod agent;
pub mod config;
pub mod env;
pub mod error;
pub mod launch;
pub mod model;
pub mod server;
pub mod tools;
pub mod trajectory;
pub mod training;
