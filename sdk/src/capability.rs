//! Capability trait and tool specification types
//!
//! A capability is a named operation an agent may request during a query.
//! The engine only needs this interface; how a capability behaves is up to
//! its implementation.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::ToolError;

/// Trait that all capabilities must implement
pub trait Capability: Send + Sync {
    /// Returns the name the model uses to call the capability
    fn name(&self) -> &str;

    /// Returns the description advertised to the model
    fn description(&self) -> &str;

    /// Returns the JSON schema of the argument object
    fn parameters(&self) -> Value;

    /// Whether a successful call asks the engine to attach the file at the
    /// `path` argument to the conversation
    fn is_artifact_request(&self) -> bool {
        false
    }

    /// Execute the capability with an already parsed argument object
    fn execute(&self, args: Value) -> Result<Value, ToolError>;

    /// Specification advertised to the completion backend
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters(),
        }
    }
}

/// Declared shape of a capability as sent to the completion backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}
