//! The task environment the agent acts in.
//!
//! - [`task`] -- the task specification ([`Task`], [`WorkspaceSetup`],
//!   [`SuccessCriteria`]).
//! - [`workspace`] -- a throwaway directory populated from the setup block.
//! - [`evaluation`] -- checks the finished workspace against the criteria.

pub mod evaluation;
pub mod task;
pub mod workspace;

pub use evaluation::evaluate;
pub use task::{SuccessCriteria, Task, WorkspaceSetup};
pub use workspace::Workspace;
