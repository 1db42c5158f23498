pub mod filesystem;
pub mod notebook;
pub mod process;
pub mod view;

pub use filesystem::{CatTool, DeleteFileTool, GetFileInfoTool, LsTool, WriteFileTool};
pub use notebook::{
    AddJupyterNotebookCellsTool, CreateJupyterNotebookTool, ExecuteJupyterNotebookTool,
    GetJupyterNotebookCellsTool, RemoveLastJupyterNotebookCellTool,
};
pub use process::{HtmlToPdfTool, PipInstallTool, RunPythonTool};
pub use view::{ViewImageTool, ViewPdfTool};

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use sdk::errors::EngineError;
use sdk::{Capability, ToolError, ToolInvocation, ToolSpec};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::ToolsConfig;
use crate::fs_guard::FileSystemGuard;
use crate::llm::ToolCall;

/// Capabilities given to planner, worker and reviewer agents
pub const WORK_TOOLS: &[&str] = &[
    "LsTool",
    "GetFileInfoTool",
    "CatTool",
    "WriteFileTool",
    "DeleteFileTool",
    "HtmlToPdfTool",
    "RunPythonTool",
    "PipInstallTool",
    "ViewImageTool",
    "ViewPDFTool",
];

/// Capabilities given to the notebook assembler
pub const NOTEBOOK_TOOLS: &[&str] = &[
    "LsTool",
    "GetFileInfoTool",
    "CatTool",
    "WriteFileTool",
    "DeleteFileTool",
    "CreateJupyterNotebookTool",
    "GetJupyterNotebookCellsTool",
    "AddJupyterNotebookCellsTool",
    "RemoveLastJupyterNotebookCellTool",
    "ExecuteJupyterNotebookTool",
];

/// Maximum characters of an argument value shown in tool logs
const LOG_ARG_CHARS: usize = 30;

/// Registry of capabilities that agents can call by name.
///
/// Dispatch never fails: unknown names, malformed arguments and handler
/// errors all come back as `{"error": ...}` results so the model can see
/// the problem and self-correct.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Capability>>,
    order: Vec<String>,
}

impl ToolRegistry {
    /// Create an empty registry with no tools enabled.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry with every built-in capability, rooted at `workspace`.
    ///
    /// Notebook capabilities are only registered when `config.notebook` is set.
    pub fn with_defaults(workspace: &Path, config: &ToolsConfig) -> Result<Self, EngineError> {
        let guard = FileSystemGuard::new(workspace)?;
        let timeout = Duration::from_secs(config.command_timeout_secs);
        let mut registry = Self::empty();

        registry.register(LsTool::new(guard.clone()));
        registry.register(GetFileInfoTool::new(guard.clone()));
        registry.register(CatTool::new(guard.clone(), config.max_read_bytes));
        registry.register(WriteFileTool::new(guard.clone()));
        registry.register(DeleteFileTool::new(guard.clone()));
        registry.register(HtmlToPdfTool::new(guard.clone(), timeout));
        registry.register(RunPythonTool::new(guard.clone(), &config.python, timeout));
        registry.register(PipInstallTool::new(
            guard.workspace(),
            &config.python,
            timeout,
        ));
        registry.register(ViewImageTool::new(guard.clone()));
        registry.register(ViewPdfTool::new(guard.clone()));

        if config.notebook {
            registry.register(CreateJupyterNotebookTool::new(guard.clone()));
            registry.register(GetJupyterNotebookCellsTool::new(guard.clone()));
            registry.register(AddJupyterNotebookCellsTool::new(guard.clone()));
            registry.register(RemoveLastJupyterNotebookCellTool::new(guard.clone()));
            registry.register(ExecuteJupyterNotebookTool::new(guard, timeout));
        }

        info!("Registered {} tools", registry.len());
        Ok(registry)
    }

    /// Register a capability, replacing any existing one with the same name.
    pub fn register(&mut self, tool: impl Capability + 'static) {
        let name = tool.name().to_string();
        if self.tools.insert(name.clone(), Arc::new(tool)).is_some() {
            warn!("Tool '{}' registered twice, keeping the latest", name);
        } else {
            self.order.push(name);
        }
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Capability>> {
        self.tools.get(name)
    }

    /// Names of all registered tools, in registration order.
    pub fn names(&self) -> &[String] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Specs of the registered tools among `allowed`, in registration order.
    pub fn specs(&self, allowed: &[String]) -> Vec<ToolSpec> {
        self.order
            .iter()
            .filter(|name| allowed.contains(*name))
            .filter_map(|name| self.tools.get(name))
            .map(|tool| tool.spec())
            .collect()
    }

    /// Dispatch one tool call on behalf of an agent allowed to use `allowed`.
    ///
    /// A tool that is registered but not in `allowed` is reported exactly
    /// like an unknown tool.
    pub async fn invoke(&self, call: &ToolCall, allowed: &[String]) -> ToolInvocation {
        info!(
            tool = %call.name,
            "Executing tool: {}({})",
            call.name,
            shorten_arguments(&call.arguments)
        );

        let tool = match self.tools.get(&call.name) {
            Some(tool) if allowed.contains(&call.name) => Arc::clone(tool),
            _ => {
                warn!("Unknown tool requested: {}", call.name);
                return ToolInvocation::error(ToolError::NotFound(call.name.clone()).to_string());
            }
        };

        let args: Value = match serde_json::from_str(&call.arguments) {
            Ok(args) => args,
            Err(e) => {
                return ToolInvocation::error(format!(
                    "Failed to parse arguments JSON for {}: {}",
                    call.name, e
                ));
            }
        };
        let requested = if tool.is_artifact_request() {
            args.get("path").and_then(Value::as_str).map(str::to_string)
        } else {
            None
        };

        // Handlers are synchronous and may block on subprocesses
        let outcome = tokio::task::spawn_blocking(move || tool.execute(args)).await;

        match outcome {
            Ok(Ok(result)) => {
                debug!("Tool {} succeeded", call.name);
                match requested {
                    Some(path) => ToolInvocation::artifact(result, path),
                    None => ToolInvocation::result(result),
                }
            }
            Ok(Err(e)) => {
                warn!("Tool {} failed: {}", call.name, e);
                ToolInvocation::error(e.to_string())
            }
            Err(e) => {
                warn!("Tool {} panicked: {}", call.name, e);
                ToolInvocation::error(format!("Tool {} crashed: {}", call.name, e))
            }
        }
    }
}

/// Render tool arguments for logs with long values cut short
pub fn shorten_arguments(arguments: &str) -> String {
    let Ok(Value::Object(map)) = serde_json::from_str::<Value>(arguments) else {
        return crate::audit::truncate_chars(arguments, LOG_ARG_CHARS);
    };
    map.iter()
        .map(|(key, value)| {
            let text = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            format!("{}: {}", key, crate::audit::truncate_chars(&text, LOG_ARG_CHARS))
        })
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    struct Echo;

    impl Capability for Echo {
        fn name(&self) -> &str {
            "EchoTool"
        }
        fn description(&self) -> &str {
            "Echo"
        }
        fn parameters(&self) -> Value {
            json!({"type": "object"})
        }
        fn execute(&self, args: Value) -> Result<Value, ToolError> {
            if args.get("fail").is_some() {
                return Err(ToolError::ExecutionFailed("asked to fail".to_string()));
            }
            Ok(args)
        }
    }

    fn allowed(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_invoke_success() {
        let mut registry = ToolRegistry::empty();
        registry.register(Echo);
        let call = ToolCall::new("c1", "EchoTool", r#"{"x": 1}"#);

        let inv = registry.invoke(&call, &allowed(&["EchoTool"])).await;
        assert_eq!(inv.result, json!({"x": 1}));
        assert!(inv.requested_artifact.is_none());
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let registry = ToolRegistry::empty();
        let call = ToolCall::new("c1", "NopeTool", "{}");
        let inv = registry.invoke(&call, &allowed(&["NopeTool"])).await;
        assert_eq!(inv.result, json!({"error": "Tool NopeTool not found"}));
    }

    #[tokio::test]
    async fn test_tool_outside_allowed_set_is_unknown() {
        let mut registry = ToolRegistry::empty();
        registry.register(Echo);
        let call = ToolCall::new("c1", "EchoTool", "{}");
        let inv = registry.invoke(&call, &allowed(&["LsTool"])).await;
        assert_eq!(inv.result, json!({"error": "Tool EchoTool not found"}));
    }

    #[tokio::test]
    async fn test_malformed_arguments_and_handler_errors() {
        let mut registry = ToolRegistry::empty();
        registry.register(Echo);
        let names = allowed(&["EchoTool"]);

        let inv = registry
            .invoke(&ToolCall::new("c1", "EchoTool", "{not json"), &names)
            .await;
        assert!(inv.is_error());

        let inv = registry
            .invoke(&ToolCall::new("c2", "EchoTool", r#"{"fail": true}"#), &names)
            .await;
        assert_eq!(inv.result, json!({"error": "Execution failed: asked to fail"}));
    }

    #[tokio::test]
    async fn test_artifact_request() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("chart.png"), [137u8, 80, 78, 71]).unwrap();
        let registry = ToolRegistry::with_defaults(temp.path(), &ToolsConfig::default()).unwrap();

        let call = ToolCall::new("c1", "ViewImageTool", r#"{"path": "chart.png"}"#);
        let inv = registry.invoke(&call, &allowed(WORK_TOOLS)).await;
        assert_eq!(inv.result, json!({"success": true}));
        assert_eq!(inv.requested_artifact.as_deref(), Some("chart.png"));

        // A failed view request carries no artifact
        let call = ToolCall::new("c2", "ViewImageTool", r#"{"path": "missing.png"}"#);
        let inv = registry.invoke(&call, &allowed(WORK_TOOLS)).await;
        assert!(inv.is_error());
        assert!(inv.requested_artifact.is_none());
    }

    #[test]
    fn test_defaults_and_specs() {
        let temp = TempDir::new().unwrap();
        let config = ToolsConfig {
            notebook: false,
            ..ToolsConfig::default()
        };
        let registry = ToolRegistry::with_defaults(temp.path(), &config).unwrap();
        assert_eq!(registry.len(), WORK_TOOLS.len());

        let specs = registry.specs(&allowed(&["CatTool", "LsTool", "Missing"]));
        let names: Vec<&str> = specs.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["LsTool", "CatTool"]);

        let full = ToolRegistry::with_defaults(temp.path(), &ToolsConfig::default()).unwrap();
        for name in NOTEBOOK_TOOLS {
            assert!(full.get(name).is_some(), "{} missing", name);
        }
    }

    #[test]
    fn test_shorten_arguments() {
        let long = "x".repeat(100);
        let rendered = shorten_arguments(&json!({"content": long, "path": "a.txt"}).to_string());
        assert!(rendered.contains(&format!("content: {}...", "x".repeat(30))));
        assert!(rendered.contains("path: a.txt"));
        assert_eq!(shorten_arguments("not json"), "not json");
    }
}
