//! Tool input/output types

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Result of dispatching one tool call
///
/// `requested_artifact` is set when the capability asks the orchestration
/// layer to attach a binary file (image or PDF) to the conversation. The
/// capability itself never encodes the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    /// Structured result handed back to the model
    pub result: Value,

    /// Path of a file the model asked to see, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requested_artifact: Option<String>,
}

impl ToolInvocation {
    /// A plain result with no artifact request
    pub fn result(result: Value) -> Self {
        Self {
            result,
            requested_artifact: None,
        }
    }

    /// A successful result that also asks for `path` to be attached
    pub fn artifact(result: Value, path: impl Into<String>) -> Self {
        Self {
            result,
            requested_artifact: Some(path.into()),
        }
    }

    /// A structured `{"error": ...}` result
    pub fn error(message: impl Into<String>) -> Self {
        Self::result(serde_json::json!({ "error": message.into() }))
    }

    /// Returns true if the result carries an `error` key
    pub fn is_error(&self) -> bool {
        self.result.get("error").is_some()
    }
}

/// Tool-level errors
///
/// These never abort an agent query; the registry turns them into
/// `{"error": ...}` tool results so the model can self-correct.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ToolError {
    #[error("Missing parameter: {0}")]
    MissingParameter(String),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Path outside workspace: {0}")]
    PathOutsideWorkspace(String),

    #[error("Tool {0} not found")]
    NotFound(String),
}

/// Deserialize a tool argument payload into the handler's declared shape
pub fn parse_args<T: DeserializeOwned>(args: Value) -> Result<T, ToolError> {
    serde_json::from_value(args).map_err(|e| ToolError::InvalidArguments(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct PathArgs {
        path: String,
    }

    #[test]
    fn test_parse_args_ok() {
        let args: PathArgs = parse_args(json!({"path": "data.csv"})).unwrap();
        assert_eq!(args.path, "data.csv");
    }

    #[test]
    fn test_parse_args_missing_field() {
        let err = parse_args::<PathArgs>(json!({"file": "data.csv"})).unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(msg) if msg.contains("path")));
    }

    #[test]
    fn test_artifact_invocation() {
        let inv = ToolInvocation::artifact(json!({"success": true}), "chart.png");
        assert_eq!(inv.result, json!({"success": true}));
        assert_eq!(inv.requested_artifact.as_deref(), Some("chart.png"));
        assert!(!inv.is_error());
    }

    #[test]
    fn test_error_invocation() {
        let inv = ToolInvocation::error("Tool Foo not found");
        assert!(inv.is_error());
        assert!(inv.requested_artifact.is_none());
    }

    #[test]
    fn test_invocation_serialization_skips_empty_artifact() {
        let json = serde_json::to_string(&ToolInvocation::result(json!({"ok": 1}))).unwrap();
        assert!(!json.contains("requested_artifact"));
    }
}
