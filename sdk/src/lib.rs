//! Lumen SDK
//!
//! Shared library providing the capability trait, tool types and error types.
//! This crate is used by the engine and by anything that registers
//! capabilities with it.

/// Capability trait and tool specification
pub mod capability;

/// Error types and handling
pub mod errors;

/// Tool input/output types
pub mod types;

// Re-export commonly used types
pub use capability::{Capability, ToolSpec};
pub use errors::{EngineError, LumenErrorExt};
pub use types::{parse_args, ToolError, ToolInvocation};
