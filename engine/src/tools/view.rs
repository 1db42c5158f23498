use sdk::{parse_args, Capability, ToolError};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::fs_guard::FileSystemGuard;

/// Extensions attached as inline images
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp"];

#[derive(Debug, Deserialize)]
struct ViewArgs {
    path: String,
}

/// Asks the engine to show an image file to the model.
///
/// The capability only checks that the file is there; encoding and
/// attaching it is done by the agent runtime.
#[derive(Debug, Clone)]
pub struct ViewImageTool {
    guard: FileSystemGuard,
}

impl ViewImageTool {
    pub fn new(guard: FileSystemGuard) -> Self {
        Self { guard }
    }
}

impl Capability for ViewImageTool {
    fn name(&self) -> &str {
        "ViewImageTool"
    }

    fn description(&self) -> &str {
        "Request to see an image file (png, jpg, jpeg, gif, webp). If the call succeeds the \
         image is uploaded in the next message. This is useful but expensive, only use it when \
         you need to. Returns {success: bool}."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "description": "The path to the image file to view" }
            },
            "required": ["path"],
            "additionalProperties": false
        })
    }

    fn is_artifact_request(&self) -> bool {
        true
    }

    fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let args: ViewArgs = parse_args(args)?;
        check_viewable(&self.guard, &args.path, IMAGE_EXTENSIONS)?;
        info!("Image requested: {}", args.path);
        Ok(json!({ "success": true }))
    }
}

/// Asks the engine to upload a PDF file to the model
#[derive(Debug, Clone)]
pub struct ViewPdfTool {
    guard: FileSystemGuard,
}

impl ViewPdfTool {
    pub fn new(guard: FileSystemGuard) -> Self {
        Self { guard }
    }
}

impl Capability for ViewPdfTool {
    fn name(&self) -> &str {
        "ViewPDFTool"
    }

    fn description(&self) -> &str {
        "Request to see a PDF file. If the call succeeds the PDF is uploaded in the next \
         message. This is useful but expensive, only use it when you need to. \
         Returns {success: bool}."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "description": "The path to the PDF file to view" }
            },
            "required": ["path"],
            "additionalProperties": false
        })
    }

    fn is_artifact_request(&self) -> bool {
        true
    }

    fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let args: ViewArgs = parse_args(args)?;
        check_viewable(&self.guard, &args.path, &["pdf"])?;
        info!("PDF requested: {}", args.path);
        Ok(json!({ "success": true }))
    }
}

fn check_viewable(guard: &FileSystemGuard, path: &str, allowed: &[&str]) -> Result<(), ToolError> {
    let resolved = guard.resolve(path)?;
    let ext = resolved
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    if !allowed.contains(&ext.as_str()) {
        return Err(ToolError::InvalidArguments(format!(
            "Unsupported file type '{}', expected one of: {}",
            ext,
            allowed.join(", ")
        )));
    }
    if !resolved.is_file() {
        return Err(ToolError::ExecutionFailed(format!("File not found: {}", path)));
    }
    Ok(())
}
