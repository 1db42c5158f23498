//! Error types and handling
//!
//! This module provides the error types used throughout the Lumen engine.
//! All errors implement the `LumenErrorExt` trait which provides user-friendly
//! hints and indicates whether errors are recoverable.
//!
//! Only a subset of these errors is fatal for a run. Capability failures and
//! unknown capabilities are reported back to the agent as tool results and
//! never surface here; see `ToolError` in [`crate::types`].

use thiserror::Error;

/// Trait for Lumen error extensions
///
/// This trait provides additional context for errors, including user-friendly
/// hints and recoverability information. All engine errors implement this trait.
pub trait LumenErrorExt {
    /// Returns a user-friendly hint for the error
    fn user_hint(&self) -> &str;

    /// Returns whether the error is recoverable
    ///
    /// Recoverable errors can be retried or worked around by the caller.
    /// Non-recoverable errors indicate a bug or a broken environment.
    fn is_recoverable(&self) -> bool;
}

/// Main engine error type
///
/// # Error Categories
///
/// - **Configuration**: Invalid or missing configuration
/// - **Backend**: The completion backend failed for an agent query
/// - **Protocol**: Tool-call bookkeeping went out of sync
/// - **Limits**: A configured round or iteration limit was hit
/// - **Artifacts**: A requested file could not be attached
///
/// # Examples
///
/// ```
/// use sdk::errors::{EngineError, LumenErrorExt};
///
/// let error = EngineError::LimitExceeded {
///     agent: "WorkerAgent1".to_string(),
///     limit: "max_tool_rounds".to_string(),
///     value: 50,
/// };
/// assert!(error.is_recoverable());
///
/// let fatal = EngineError::ProtocolViolation("tool result for unknown call".to_string());
/// assert!(!fatal.is_recoverable());
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Completion backend errors
    #[error("Backend error in {agent}: {message}")]
    Backend { agent: String, message: String },

    // Conversation bookkeeping errors
    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    // Safety valves
    #[error("Limit exceeded in {agent}: {limit} ({value})")]
    LimitExceeded {
        agent: String,
        limit: String,
        value: usize,
    },

    // Artifact attachment errors
    #[error("Artifact error: {0}")]
    Artifact(String),

    // External input errors
    #[error("Input error: {0}")]
    Input(String),

    // Keyring errors
    #[error("Keyring error: {0}")]
    KeyringError(String),

    // Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Build a backend error for the named agent
    pub fn backend(agent: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Backend {
            agent: agent.into(),
            message: message.into(),
        }
    }

    /// Build a limit error for the named agent
    pub fn limit(agent: impl Into<String>, limit: impl Into<String>, value: usize) -> Self {
        Self::LimitExceeded {
            agent: agent.into(),
            limit: limit.into(),
            value,
        }
    }
}

impl LumenErrorExt for EngineError {
    fn user_hint(&self) -> &str {
        match self {
            Self::Config(_) => "Check your config.toml file for errors",
            Self::Backend { .. } => "Model backend failed. Check your API key, model and network",
            Self::ProtocolViolation(_) => {
                "Conversation state went out of sync with the backend. This is a bug"
            }
            Self::LimitExceeded { .. } => {
                "An agent did not converge. Raise the limit in [limits] or refine the brief"
            }
            Self::Artifact(_) => "The requested file could not be attached",
            Self::Input(_) => "Could not read your answer from the terminal",
            Self::KeyringError(_) => "Failed to access secure storage. Check system keychain",
            Self::Io(_) => "File system operation failed",
        }
    }

    fn is_recoverable(&self) -> bool {
        !matches!(self, Self::ProtocolViolation(_) | Self::Config(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_error_names_agent() {
        let err = EngineError::backend("PlanningAgent", "429 Too Many Requests");
        let text = err.to_string();
        assert!(text.contains("PlanningAgent"));
        assert!(text.contains("429"));
    }

    #[test]
    fn test_limit_error_display() {
        let err = EngineError::limit("ReviewAgent3", "max_review_rounds", 10);
        assert_eq!(
            err.to_string(),
            "Limit exceeded in ReviewAgent3: max_review_rounds (10)"
        );
    }

    #[test]
    fn test_recoverability() {
        assert!(!EngineError::ProtocolViolation("x".into()).is_recoverable());
        assert!(!EngineError::Config("x".into()).is_recoverable());
        assert!(EngineError::backend("a", "b").is_recoverable());
        assert!(EngineError::Artifact("x".into()).is_recoverable());
    }

    #[test]
    fn test_every_variant_has_hint() {
        let errors = vec![
            EngineError::Config("x".into()),
            EngineError::backend("a", "b"),
            EngineError::ProtocolViolation("x".into()),
            EngineError::limit("a", "b", 1),
            EngineError::Artifact("x".into()),
            EngineError::Input("x".into()),
            EngineError::KeyringError("x".into()),
            EngineError::Io(std::io::Error::other("x")),
        ];
        for err in errors {
            assert!(!err.user_hint().is_empty());
        }
    }
}
