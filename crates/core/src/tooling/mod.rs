//! External tool execution.
//!
//! Pipelines never spawn processes directly; they hand a [`ToolInvocation`]
//! to an injected [`ToolRunner`]. [`ProcessRunner`] is the real
//! implementation, tests substitute recording fakes.

pub mod process;
pub mod runner;

pub use process::ProcessRunner;
pub use runner::{ToolError, ToolInvocation, ToolOutput, ToolRunner, DEFAULT_MAX_OUTPUT_BYTES};
