//! Jupyter notebook capabilities
//!
//! Notebooks are read and written as nbformat 4 JSON. Cells are kept as raw
//! JSON values so fields this module does not know about survive a rewrite.
//! Execution shells out to `jupyter nbconvert`.

use sdk::{parse_args, Capability, ToolError};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use super::process::run_command;
use crate::fs_guard::FileSystemGuard;

const NBFORMAT: u32 = 4;
const NBFORMAT_MINOR: u32 = 5;

/// On-disk notebook document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notebook {
    #[serde(default)]
    pub cells: Vec<Value>,
    #[serde(default)]
    pub metadata: Value,
    pub nbformat: u32,
    pub nbformat_minor: u32,
}

impl Notebook {
    /// An empty notebook with a Python 3 kernel
    pub fn empty() -> Self {
        Self {
            cells: Vec::new(),
            metadata: json!({
                "kernelspec": {
                    "display_name": "Python 3",
                    "language": "python",
                    "name": "python3"
                },
                "language_info": { "name": "python" }
            }),
            nbformat: NBFORMAT,
            nbformat_minor: NBFORMAT_MINOR,
        }
    }

    pub fn load(path: &Path) -> Result<Self, ToolError> {
        if !path.is_file() {
            return Err(ToolError::ExecutionFailed(format!(
                "File not found: {}",
                path.display()
            )));
        }
        let text = fs::read_to_string(path)
            .map_err(|e| ToolError::ExecutionFailed(format!("Failed to read notebook: {}", e)))?;
        serde_json::from_str(&text)
            .map_err(|e| ToolError::ExecutionFailed(format!("Not a valid notebook: {}", e)))
    }

    pub fn save(&self, path: &Path) -> Result<(), ToolError> {
        let text = serde_json::to_string_pretty(self)
            .map_err(|e| ToolError::ExecutionFailed(e.to_string()))?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| ToolError::ExecutionFailed(format!("Failed to create dir: {}", e)))?;
        }
        fs::write(path, text + "\n")
            .map_err(|e| ToolError::ExecutionFailed(format!("Failed to write notebook: {}", e)))
    }

    /// Cells in the compact form shown to the model
    pub fn summarize_cells(&self) -> Vec<Value> {
        self.cells.iter().map(summarize_cell).collect()
    }
}

/// A cell as written by the model
#[derive(Debug, Clone, Deserialize)]
pub struct CellInput {
    pub cell_type: String,
    pub source: String,
    /// Accepted for symmetry with what `GetJupyterNotebookCellsTool` returns; ignored
    #[serde(default)]
    #[allow(dead_code)]
    pub output: Vec<String>,
}

impl CellInput {
    fn into_cell(self) -> Value {
        let id = uuid::Uuid::new_v4().simple().to_string()[..8].to_string();
        if self.cell_type == "code" {
            json!({
                "cell_type": "code",
                "execution_count": null,
                "id": id,
                "metadata": {},
                "outputs": [],
                "source": self.source,
            })
        } else {
            json!({
                "cell_type": "markdown",
                "id": id,
                "metadata": {},
                "source": self.source,
            })
        }
    }
}

/// nbformat allows multi-line strings to be stored as a list of lines
fn multiline(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(lines) => lines.iter().filter_map(Value::as_str).collect(),
        _ => String::new(),
    }
}

fn summarize_cell(cell: &Value) -> Value {
    let outputs: Vec<String> = cell
        .get("outputs")
        .and_then(Value::as_array)
        .map(|outputs| {
            outputs
                .iter()
                .map(|output| match output.get("output_type").and_then(Value::as_str) {
                    Some("execute_result") | Some("display_data") => output
                        .get("data")
                        .and_then(|d| d.get("text/plain"))
                        .map(multiline)
                        .unwrap_or_default(),
                    Some("stream") => output.get("text").map(multiline).unwrap_or_default(),
                    Some("error") => output
                        .get("traceback")
                        .map(|t| match t {
                            Value::Array(lines) => lines
                                .iter()
                                .filter_map(Value::as_str)
                                .collect::<Vec<_>>()
                                .join("\n"),
                            other => multiline(other),
                        })
                        .unwrap_or_default(),
                    _ => String::new(),
                })
                .collect()
        })
        .unwrap_or_default();

    json!({
        "cell_type": cell.get("cell_type").and_then(Value::as_str).unwrap_or("code"),
        "source": cell.get("source").map(multiline).unwrap_or_default(),
        "output": outputs,
    })
}

#[derive(Debug, Deserialize)]
struct NotebookPathArgs {
    path: String,
}

#[derive(Debug, Deserialize)]
struct AddCellsArgs {
    path: String,
    cells: Vec<CellInput>,
}

fn notebook_path_parameters(description: &str) -> Value {
    json!({
        "type": "object",
        "properties": {
            "path": { "type": "string", "description": description }
        },
        "required": ["path"],
        "additionalProperties": false
    })
}

fn resolve_notebook(guard: &FileSystemGuard, path: &str) -> Result<PathBuf, ToolError> {
    let resolved = guard.resolve(path)?;
    if resolved.extension().and_then(|e| e.to_str()) != Some("ipynb") {
        return Err(ToolError::InvalidArguments(format!(
            "{} is not an .ipynb file",
            path
        )));
    }
    Ok(resolved)
}

/// Creates an empty notebook
#[derive(Debug, Clone)]
pub struct CreateJupyterNotebookTool {
    guard: FileSystemGuard,
}

impl CreateJupyterNotebookTool {
    pub fn new(guard: FileSystemGuard) -> Self {
        Self { guard }
    }
}

impl Capability for CreateJupyterNotebookTool {
    fn name(&self) -> &str {
        "CreateJupyterNotebookTool"
    }

    fn description(&self) -> &str {
        "Create an empty jupyter notebook. Returns {success: bool}."
    }

    fn parameters(&self) -> Value {
        notebook_path_parameters("The path to the jupyter notebook to create")
    }

    fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let args: NotebookPathArgs = parse_args(args)?;
        let path = resolve_notebook(&self.guard, &args.path)?;
        info!("Creating notebook: {}", path.display());
        Notebook::empty().save(&path)?;
        Ok(json!({ "success": true }))
    }
}

/// Returns the cells of a notebook
#[derive(Debug, Clone)]
pub struct GetJupyterNotebookCellsTool {
    guard: FileSystemGuard,
}

impl GetJupyterNotebookCellsTool {
    pub fn new(guard: FileSystemGuard) -> Self {
        Self { guard }
    }
}

impl Capability for GetJupyterNotebookCellsTool {
    fn name(&self) -> &str {
        "GetJupyterNotebookCellsTool"
    }

    fn description(&self) -> &str {
        "Get the cells of a jupyter notebook. Returns {cells: [{cell_type, source, output}]}."
    }

    fn parameters(&self) -> Value {
        notebook_path_parameters("The path to the jupyter notebook to get the cells of")
    }

    fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let args: NotebookPathArgs = parse_args(args)?;
        let path = resolve_notebook(&self.guard, &args.path)?;
        let notebook = Notebook::load(&path)?;
        Ok(json!({ "cells": notebook.summarize_cells() }))
    }
}

/// Appends cells to a notebook
#[derive(Debug, Clone)]
pub struct AddJupyterNotebookCellsTool {
    guard: FileSystemGuard,
}

impl AddJupyterNotebookCellsTool {
    pub fn new(guard: FileSystemGuard) -> Self {
        Self { guard }
    }
}

impl Capability for AddJupyterNotebookCellsTool {
    fn name(&self) -> &str {
        "AddJupyterNotebookCellsTool"
    }

    fn description(&self) -> &str {
        "Add cells to the end of an existing jupyter notebook. New cells have no output. \
         Returns {success: bool}."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "description": "The path to the jupyter notebook to add the cells to" },
                "cells": {
                    "type": "array",
                    "description": "The cells to add to the jupyter notebook",
                    "items": {
                        "type": "object",
                        "properties": {
                            "cell_type": { "type": "string", "enum": ["code", "markdown"] },
                            "source": { "type": "string" },
                            "output": { "type": "array", "items": { "type": "string" } }
                        },
                        "required": ["cell_type", "source"]
                    }
                }
            },
            "required": ["path", "cells"],
            "additionalProperties": false
        })
    }

    fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let args: AddCellsArgs = parse_args(args)?;
        let path = resolve_notebook(&self.guard, &args.path)?;
        let mut notebook = Notebook::load(&path)?;
        let added = args.cells.len();
        notebook
            .cells
            .extend(args.cells.into_iter().map(CellInput::into_cell));
        notebook.save(&path)?;
        info!("Added {} cells to {}", added, path.display());
        Ok(json!({ "success": true }))
    }
}

/// Removes the last cell of a notebook
#[derive(Debug, Clone)]
pub struct RemoveLastJupyterNotebookCellTool {
    guard: FileSystemGuard,
}

impl RemoveLastJupyterNotebookCellTool {
    pub fn new(guard: FileSystemGuard) -> Self {
        Self { guard }
    }
}

impl Capability for RemoveLastJupyterNotebookCellTool {
    fn name(&self) -> &str {
        "RemoveLastJupyterNotebookCellTool"
    }

    fn description(&self) -> &str {
        "Remove the last cell from a jupyter notebook. Returns {success: bool}."
    }

    fn parameters(&self) -> Value {
        notebook_path_parameters("The path to the jupyter notebook to remove the last cell of")
    }

    fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let args: NotebookPathArgs = parse_args(args)?;
        let path = resolve_notebook(&self.guard, &args.path)?;
        let mut notebook = Notebook::load(&path)?;
        if notebook.cells.pop().is_none() {
            return Err(ToolError::ExecutionFailed("No cells to remove".to_string()));
        }
        notebook.save(&path)?;
        Ok(json!({ "success": true }))
    }
}

/// Executes every cell of a notebook in place
#[derive(Debug, Clone)]
pub struct ExecuteJupyterNotebookTool {
    guard: FileSystemGuard,
    timeout: Duration,
}

impl ExecuteJupyterNotebookTool {
    pub fn new(guard: FileSystemGuard, timeout: Duration) -> Self {
        Self { guard, timeout }
    }
}

impl Capability for ExecuteJupyterNotebookTool {
    fn name(&self) -> &str {
        "ExecuteJupyterNotebookTool"
    }

    fn description(&self) -> &str {
        "Execute all the cells in a jupyter notebook and get back the executed cells. \
         Returns {success: bool, cells: [{cell_type, source, output}]}."
    }

    fn parameters(&self) -> Value {
        notebook_path_parameters("The path to the jupyter notebook to execute")
    }

    fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let args: NotebookPathArgs = parse_args(args)?;
        let path = resolve_notebook(&self.guard, &args.path)?;
        if !path.is_file() {
            return Err(ToolError::ExecutionFailed(format!(
                "File not found: {}",
                args.path
            )));
        }

        let work_dir = path.parent().unwrap_or_else(|| self.guard.workspace());
        let path_arg = path.to_string_lossy();
        let timeout_arg = format!("--ExecutePreprocessor.timeout={}", self.timeout.as_secs());
        let output = run_command(
            "jupyter",
            &[
                "nbconvert",
                "--to",
                "notebook",
                "--execute",
                "--inplace",
                timeout_arg.as_str(),
                path_arg.as_ref(),
            ],
            work_dir,
            self.timeout,
        )?;
        if !output.success() {
            return Err(ToolError::ExecutionFailed(output.stderr));
        }

        let notebook = Notebook::load(&path)?;
        Ok(json!({ "success": true, "cells": notebook.summarize_cells() }))
    }
}
