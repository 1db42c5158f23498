//! Filesystem capabilities
//!
//! Listing, inspecting, reading, writing and deleting files inside the
//! workspace. Every path goes through `FileSystemGuard` before any I/O.

use sdk::{parse_args, Capability, ToolError};
use serde::Deserialize;
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use crate::fs_guard::FileSystemGuard;

/// Extensions `CatTool` refuses because they are binary images
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp"];

#[derive(Debug, Deserialize)]
struct PathArgs {
    path: String,
}

#[derive(Debug, Deserialize)]
struct WriteArgs {
    path: String,
    content: String,
}

fn path_parameters(description: &str) -> Value {
    json!({
        "type": "object",
        "properties": {
            "path": { "type": "string", "description": description }
        },
        "required": ["path"],
        "additionalProperties": false
    })
}

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default()
}

fn io_error(action: &str, path: &str, e: std::io::Error) -> ToolError {
    ToolError::ExecutionFailed(format!("Failed to {} {}: {}", action, path, e))
}

/// Lists files and directories at a path
#[derive(Debug, Clone)]
pub struct LsTool {
    guard: FileSystemGuard,
}

impl LsTool {
    pub fn new(guard: FileSystemGuard) -> Self {
        Self { guard }
    }
}

impl Capability for LsTool {
    fn name(&self) -> &str {
        "LsTool"
    }

    fn description(&self) -> &str {
        "List the contents of a directory. Returns {files: [..], directories: [..]}."
    }

    fn parameters(&self) -> Value {
        path_parameters("The path to list the contents of")
    }

    fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let args: PathArgs = parse_args(args)?;
        let dir = self.guard.resolve(&args.path)?;
        info!("Listing directory: {}", dir.display());

        let mut files = Vec::new();
        let mut directories = Vec::new();
        for entry in fs::read_dir(&dir).map_err(|e| io_error("list", &args.path, e))? {
            let entry = entry.map_err(|e| io_error("list", &args.path, e))?;
            let name = entry.file_name().to_string_lossy().to_string();
            let path = entry.path();
            if path.is_dir() {
                directories.push(name);
            } else if path.is_file() {
                files.push(name);
            }
        }
        files.sort();
        directories.sort();

        Ok(json!({ "files": files, "directories": directories }))
    }
}

/// Reports size and line count of a file
#[derive(Debug, Clone)]
pub struct GetFileInfoTool {
    guard: FileSystemGuard,
}

impl GetFileInfoTool {
    pub fn new(guard: FileSystemGuard) -> Self {
        Self { guard }
    }
}

impl Capability for GetFileInfoTool {
    fn name(&self) -> &str {
        "GetFileInfoTool"
    }

    fn description(&self) -> &str {
        "Get information about a file. Returns {size: bytes, num_lines: int}."
    }

    fn parameters(&self) -> Value {
        path_parameters("The path to the file to get information about")
    }

    fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let args: PathArgs = parse_args(args)?;
        let path = self.guard.resolve(&args.path)?;

        let bytes = fs::read(&path).map_err(|e| io_error("read", &args.path, e))?;
        let num_lines = bytes.iter().filter(|b| **b == b'\n').count()
            + usize::from(bytes.last().is_some_and(|b| *b != b'\n'));

        Ok(json!({ "size": bytes.len(), "num_lines": num_lines }))
    }
}

/// Reads a text file
#[derive(Debug, Clone)]
pub struct CatTool {
    guard: FileSystemGuard,
    max_read_bytes: usize,
}

impl CatTool {
    pub fn new(guard: FileSystemGuard, max_read_bytes: usize) -> Self {
        Self {
            guard,
            max_read_bytes,
        }
    }
}

impl Capability for CatTool {
    fn name(&self) -> &str {
        "CatTool"
    }

    fn description(&self) -> &str {
        "Read the contents of a text file. Images, PDFs and CSV files are not supported; \
         for large files prefer writing a Python script that extracts what you need. \
         Returns {content: str}."
    }

    fn parameters(&self) -> Value {
        path_parameters("The path to the file to read")
    }

    fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let args: PathArgs = parse_args(args)?;
        let path = self.guard.resolve(&args.path)?;

        let ext = extension(&path);
        if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            return Err(ToolError::ExecutionFailed(
                "File is an image, use ViewImageTool to look at it".to_string(),
            ));
        }
        if ext == "pdf" {
            return Err(ToolError::ExecutionFailed(
                "File is a PDF, use ViewPDFTool to look at it".to_string(),
            ));
        }
        if ext == "csv" {
            return Err(ToolError::ExecutionFailed(
                "File is a CSV, use scripts to get information from the file".to_string(),
            ));
        }

        let content = fs::read_to_string(&path).map_err(|e| io_error("read", &args.path, e))?;
        if content.len() > self.max_read_bytes {
            return Err(ToolError::ExecutionFailed(format!(
                "File is too large to read ({} bytes, limit {})",
                content.len(),
                self.max_read_bytes
            )));
        }

        debug!("Read {} bytes from {}", content.len(), path.display());
        Ok(json!({ "content": content }))
    }
}

/// Writes a file, creating parent directories as needed
#[derive(Debug, Clone)]
pub struct WriteFileTool {
    guard: FileSystemGuard,
}

impl WriteFileTool {
    pub fn new(guard: FileSystemGuard) -> Self {
        Self { guard }
    }
}

impl Capability for WriteFileTool {
    fn name(&self) -> &str {
        "WriteFileTool"
    }

    fn description(&self) -> &str {
        "Write to a file, creating it if it doesn't exist and overwriting it if it does. \
         Returns {success: bool}."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "description": "The path to the file to write to" },
                "content": { "type": "string", "description": "The content to write to the file" }
            },
            "required": ["path", "content"],
            "additionalProperties": false
        })
    }

    fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let args: WriteArgs = parse_args(args)?;
        let path = self.guard.resolve(&args.path)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| io_error("create", &args.path, e))?;
        }
        info!("Writing {} bytes to: {}", args.content.len(), path.display());
        fs::write(&path, &args.content).map_err(|e| io_error("write", &args.path, e))?;

        Ok(json!({ "success": true }))
    }
}

/// Deletes a single file inside the workspace
#[derive(Debug, Clone)]
pub struct DeleteFileTool {
    guard: FileSystemGuard,
}

impl DeleteFileTool {
    pub fn new(guard: FileSystemGuard) -> Self {
        Self { guard }
    }
}

impl Capability for DeleteFileTool {
    fn name(&self) -> &str {
        "DeleteFileTool"
    }

    fn description(&self) -> &str {
        "Delete a file. Only files inside the project directory can be deleted. \
         Returns {success: bool}."
    }

    fn parameters(&self) -> Value {
        path_parameters("The path to the file to delete")
    }

    fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let args: PathArgs = parse_args(args)?;
        let path = self.guard.resolve(&args.path)?;

        if !path.is_file() {
            return Err(ToolError::ExecutionFailed(format!(
                "File not found: {}",
                args.path
            )));
        }
        info!("Deleting file: {}", path.display());
        fs::remove_file(&path).map_err(|e| io_error("delete", &args.path, e))?;

        Ok(json!({ "success": true }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (TempDir, FileSystemGuard) {
        let temp = TempDir::new().unwrap();
        let guard = FileSystemGuard::new(temp.path()).unwrap();
        (temp, guard)
    }

    #[test]
    fn test_write_and_cat() {
        let (_temp, guard) = setup();
        let write = WriteFileTool::new(guard.clone());
        let cat = CatTool::new(guard, 20_000);

        let out = write
            .execute(json!({"path": "notes/a.txt", "content": "hello world"}))
            .unwrap();
        assert_eq!(out, json!({"success": true}));

        let out = cat.execute(json!({"path": "notes/a.txt"})).unwrap();
        assert_eq!(out["content"], "hello world");
    }

    #[test]
    fn test_ls_splits_files_and_directories() {
        let (temp, guard) = setup();
        fs::write(temp.path().join("b.txt"), "b").unwrap();
        fs::write(temp.path().join("a.txt"), "a").unwrap();
        fs::create_dir(temp.path().join("subdir")).unwrap();

        let out = LsTool::new(guard).execute(json!({"path": "."})).unwrap();
        assert_eq!(out["files"], json!(["a.txt", "b.txt"]));
        assert_eq!(out["directories"], json!(["subdir"]));
    }

    #[test]
    fn test_file_info() {
        let (temp, guard) = setup();
        fs::write(temp.path().join("lines.txt"), "one\ntwo\nthree").unwrap();

        let out = GetFileInfoTool::new(guard)
            .execute(json!({"path": "lines.txt"}))
            .unwrap();
        assert_eq!(out["size"], 13);
        assert_eq!(out["num_lines"], 3);
    }

    #[test]
    fn test_cat_refuses_binary_and_csv() {
        let (temp, guard) = setup();
        fs::write(temp.path().join("chart.png"), [0u8, 1, 2]).unwrap();
        fs::write(temp.path().join("data.csv"), "a,b\n1,2").unwrap();
        let cat = CatTool::new(guard, 20_000);

        assert!(cat.execute(json!({"path": "chart.png"})).is_err());
        let err = cat.execute(json!({"path": "data.csv"})).unwrap_err();
        assert!(err.to_string().contains("CSV"));
    }

    #[test]
    fn test_cat_refuses_large_files() {
        let (temp, guard) = setup();
        fs::write(temp.path().join("big.txt"), "x".repeat(101)).unwrap();
        let err = CatTool::new(guard, 100)
            .execute(json!({"path": "big.txt"}))
            .unwrap_err();
        assert!(err.to_string().contains("too large"));
    }

    #[test]
    fn test_delete_file() {
        let (temp, guard) = setup();
        let target = temp.path().join("old.txt");
        fs::write(&target, "x").unwrap();
        let delete = DeleteFileTool::new(guard);

        delete.execute(json!({"path": "old.txt"})).unwrap();
        assert!(!target.exists());

        // Second delete reports a missing file
        assert!(delete.execute(json!({"path": "old.txt"})).is_err());
    }

    #[test]
    fn test_delete_outside_workspace_blocked() {
        let temp = TempDir::new().unwrap();
        let workspace = temp.path().join("ws");
        fs::create_dir(&workspace).unwrap();
        let outside = temp.path().join("keep.txt");
        fs::write(&outside, "keep").unwrap();

        let delete = DeleteFileTool::new(FileSystemGuard::new(&workspace).unwrap());
        let err = delete.execute(json!({"path": "../keep.txt"})).unwrap_err();
        assert!(matches!(err, ToolError::PathOutsideWorkspace(_)));
        assert!(outside.exists());
    }

    #[test]
    fn test_missing_argument() {
        let (_temp, guard) = setup();
        let err = LsTool::new(guard).execute(json!({})).unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }
}
