//! Subprocess capabilities
//!
//! Running Python scripts, installing packages and converting HTML reports to
//! PDF. Commands are executed without a shell, with the workspace as working
//! directory and a wall-clock timeout.

use sdk::{parse_args, Capability, ToolError};
use serde::Deserialize;
use serde_json::{json, Value};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::fs_guard::FileSystemGuard;

/// Interval between exit checks while a child runs
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Captured result of a finished command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub returncode: i32,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.returncode == 0
    }
}

/// Run `program args..` in `work_dir`, killing it after `timeout`.
pub fn run_command(
    program: &str,
    args: &[&str],
    work_dir: &Path,
    timeout: Duration,
) -> Result<CommandOutput, ToolError> {
    info!("Executing command: {} {}", program, args.join(" "));

    let mut child = Command::new(program)
        .args(args)
        .current_dir(work_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| ToolError::ExecutionFailed(format!("Failed to start {}: {}", program, e)))?;

    // Drain pipes on their own threads so a chatty child cannot block
    let stdout = child.stdout.take().map(drain);
    let stderr = child.stderr.take().map(drain);

    let deadline = Instant::now() + timeout;
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) if Instant::now() >= deadline => {
                let _ = child.kill();
                let _ = child.wait();
                warn!("{} timed out after {}s", program, timeout.as_secs());
                return Err(ToolError::ExecutionFailed(format!(
                    "{} timed out after {} seconds",
                    program,
                    timeout.as_secs()
                )));
            }
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(e) => {
                return Err(ToolError::ExecutionFailed(format!(
                    "Failed to wait for {}: {}",
                    program, e
                )))
            }
        }
    };

    let output = CommandOutput {
        stdout: stdout.map(join_output).unwrap_or_default(),
        stderr: stderr.map(join_output).unwrap_or_default(),
        returncode: status.code().unwrap_or(-1),
    };
    debug!("{} exited with {}", program, output.returncode);
    Ok(output)
}

fn drain<R: Read + Send + 'static>(mut reader: R) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = reader.read_to_end(&mut buf);
        String::from_utf8_lossy(&buf).to_string()
    })
}

fn join_output(handle: thread::JoinHandle<String>) -> String {
    handle.join().unwrap_or_default()
}

/// Runs an existing Python script
#[derive(Debug, Clone)]
pub struct RunPythonTool {
    guard: FileSystemGuard,
    python: String,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct ScriptArgs {
    script: String,
}

impl RunPythonTool {
    pub fn new(guard: FileSystemGuard, python: impl Into<String>, timeout: Duration) -> Self {
        Self {
            guard,
            python: python.into(),
            timeout,
        }
    }
}

impl Capability for RunPythonTool {
    fn name(&self) -> &str {
        "RunPythonTool"
    }

    fn description(&self) -> &str {
        "Run an existing Python script. Do not use it to print out the contents of a large file. \
         Returns {stdout: str, stderr: str, returncode: int}."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "script": { "type": "string", "description": "Path to the Python script to run" }
            },
            "required": ["script"],
            "additionalProperties": false
        })
    }

    fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let args: ScriptArgs = parse_args(args)?;
        let script = self.guard.resolve(&args.script)?;
        let script_arg = script.to_string_lossy();

        let output = run_command(
            &self.python,
            &[script_arg.as_ref()],
            self.guard.workspace(),
            self.timeout,
        )?;

        Ok(json!({
            "stdout": output.stdout,
            "stderr": output.stderr,
            "returncode": output.returncode,
        }))
    }
}

/// Installs a Python package with pip
#[derive(Debug, Clone)]
pub struct PipInstallTool {
    work_dir: PathBuf,
    python: String,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct PackageArgs {
    package: String,
}

impl PipInstallTool {
    pub fn new(work_dir: impl Into<PathBuf>, python: impl Into<String>, timeout: Duration) -> Self {
        Self {
            work_dir: work_dir.into(),
            python: python.into(),
            timeout,
        }
    }
}

impl Capability for PipInstallTool {
    fn name(&self) -> &str {
        "PipInstallTool"
    }

    fn description(&self) -> &str {
        "Install a Python package. Returns {success: bool}."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "package": { "type": "string", "description": "The package to install" }
            },
            "required": ["package"],
            "additionalProperties": false
        })
    }

    fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let args: PackageArgs = parse_args(args)?;
        let package = args.package.trim();
        if package.is_empty() || package.starts_with('-') {
            return Err(ToolError::InvalidArguments(format!(
                "'{}' is not a package name",
                args.package
            )));
        }

        let output = run_command(
            &self.python,
            &["-m", "pip", "install", package],
            &self.work_dir,
            self.timeout,
        )?;
        if output.success() {
            Ok(json!({ "success": true }))
        } else {
            warn!("pip install {} failed", package);
            Err(ToolError::ExecutionFailed(output.stderr))
        }
    }
}

/// Converts an HTML file to PDF with wkhtmltopdf
#[derive(Debug, Clone)]
pub struct HtmlToPdfTool {
    guard: FileSystemGuard,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct HtmlToPdfArgs {
    html_file: String,
    pdf_file: String,
}

impl HtmlToPdfTool {
    pub fn new(guard: FileSystemGuard, timeout: Duration) -> Self {
        Self { guard, timeout }
    }
}

impl Capability for HtmlToPdfTool {
    fn name(&self) -> &str {
        "HtmlToPdfTool"
    }

    fn description(&self) -> &str {
        "Convert an HTML file to a PDF file. Returns {success: bool}."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "html_file": { "type": "string", "description": "The path to the HTML file to convert to PDF" },
                "pdf_file": { "type": "string", "description": "The path to the PDF file to save the result to" }
            },
            "required": ["html_file", "pdf_file"],
            "additionalProperties": false
        })
    }

    fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let args: HtmlToPdfArgs = parse_args(args)?;
        let html = self.guard.resolve(&args.html_file)?;
        let pdf = self.guard.resolve(&args.pdf_file)?;
        let html_arg = html.to_string_lossy();
        let pdf_arg = pdf.to_string_lossy();

        let output = run_command(
            "wkhtmltopdf",
            &["--allow", ".", html_arg.as_ref(), pdf_arg.as_ref()],
            self.guard.workspace(),
            self.timeout,
        )?;
        if output.success() {
            Ok(json!({ "success": true }))
        } else {
            Err(ToolError::ExecutionFailed(output.stderr))
        }
    }
}
