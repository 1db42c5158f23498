//! Command handlers for CLI operations
//!
//! This module implements the handlers for all CLI commands:
//! - run: Run the agents on a brief, then assemble the notebook
//! - config show / config path: Inspect configuration
//! - tools: List the built-in tools

use anyhow::{Context, Result};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::agent::{AgentRole, AgentRuntime};
use crate::audit::{AuditSink, FileAuditSink, NullAuditSink};
use crate::conductor::{
    assemble_notebook, ControllerSettings, PlanningController, RunOutcome, RunState,
};
use crate::config::Config;
use crate::input::StdinChannel;
use crate::llm::openai::OpenAIProvider;
use crate::llm::LLMProvider;
use crate::secrets::SecretManager;
use crate::tools::ToolRegistry;

/// Keychain service holding Lumen's secrets
pub const KEYCHAIN_SERVICE: &str = "lumen";

/// Keychain entry of the OpenAI API key
pub const OPENAI_KEY_NAME: &str = "openai_api_key";

/// Output format for command results
#[derive(Debug, Clone, Copy)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for machine consumption
    Json,
}

/// Read the brief, failing on a missing or blank file
pub fn read_brief(path: &Path) -> Result<String> {
    let brief = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read brief from {}", path.display()))?;
    if brief.trim().is_empty() {
        anyhow::bail!("Brief file {} is empty", path.display());
    }
    Ok(brief)
}

/// Audit sink selected by `[audit]`
pub fn audit_sink(config: &Config) -> Arc<dyn AuditSink> {
    if config.audit.enabled {
        Arc::new(FileAuditSink::new(
            &config.core.audit_dir,
            config.audit.truncate_chars,
        ))
    } else {
        Arc::new(NullAuditSink)
    }
}

/// Runtime wired to `provider` with the built-in tools and configured limits
pub fn build_runtime(config: &Config, provider: Arc<dyn LLMProvider>) -> Result<AgentRuntime> {
    let tools = ToolRegistry::with_defaults(&config.core.workspace, &config.tools)?;
    Ok(AgentRuntime::new(provider, Arc::new(tools))
        .with_max_tool_rounds(config.limits.max_tool_rounds)
        .with_workspace(&config.core.workspace))
}

/// Run the agents on a brief
///
/// Reads the brief, runs the planning loop with terminal input for the
/// planner's questions, and on completion runs the notebook assembler
/// unless `no_notebook` is set or notebook tools are disabled.
pub async fn handle_run(
    brief: Option<PathBuf>,
    no_notebook: bool,
    config: &Config,
    format: OutputFormat,
) -> Result<()> {
    let brief_path = brief.unwrap_or_else(|| config.core.brief_file.clone());
    let brief = read_brief(&brief_path)?;

    let api_key = SecretManager::new(KEYCHAIN_SERVICE)
        .resolve(&config.llm.openai.api_key_env, OPENAI_KEY_NAME)?;
    let provider: Arc<dyn LLMProvider> =
        Arc::new(OpenAIProvider::new(config.llm.openai.clone(), api_key));
    let runtime = Arc::new(build_runtime(config, provider)?);
    let audit = audit_sink(config);

    if let OutputFormat::Text = format {
        println!("Running brief from {}", brief_path.display());
        println!("Workspace: {}", config.core.workspace.display());
        println!();
    }

    let mut controller = PlanningController::new(
        Arc::clone(&runtime),
        Arc::clone(&audit),
        ControllerSettings::from_config(config),
        brief.clone(),
        StdinChannel::new(),
    )?;

    let outcome = match controller.run().await {
        Ok(outcome) => outcome,
        Err(e) => {
            match format {
                OutputFormat::Text => println!("✗ Run failed: {}", e),
                OutputFormat::Json => {
                    let output = json!({ "status": "failed", "error": e.to_string() });
                    println!("{}", serde_json::to_string_pretty(&output)?);
                }
            }
            return Err(e.into());
        }
    };

    let notebook = if outcome.is_done() && !no_notebook && config.tools.notebook {
        Some(
            assemble_notebook(
                &runtime,
                audit,
                config.model_for(AgentRole::NotebookAssembler),
                &brief,
                &controller.work_log(),
            )
            .await?,
        )
    } else {
        None
    };

    print_outcome(&outcome, notebook.as_deref(), format)
}

fn print_outcome(outcome: &RunOutcome, notebook: Option<&str>, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            match outcome.state {
                RunState::Done => {
                    println!("✓ Project complete");
                    println!();
                    println!("{}", outcome.final_summary.as_deref().unwrap_or_default());
                }
                _ => println!("Run aborted."),
            }
            println!();
            println!("  Run:   {}", outcome.run_id);
            println!("  Steps: {}", outcome.work_summaries.len());
            println!(
                "  Took:  {}s",
                (outcome.finished_at - outcome.started_at).num_seconds()
            );
            if let Some(notebook) = notebook {
                println!();
                println!("Notebook:");
                println!("{}", notebook);
            }
        }
        OutputFormat::Json => {
            let output = json!({
                "status": outcome.state.to_string(),
                "run_id": outcome.run_id,
                "final_summary": outcome.final_summary,
                "work_summaries": outcome.work_summaries,
                "started_at": outcome.started_at,
                "finished_at": outcome.finished_at,
                "notebook": notebook,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }
    Ok(())
}

/// Show the effective configuration
pub fn handle_config_show(config: &Config, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            let rendered =
                toml::to_string_pretty(config).context("Failed to serialize configuration")?;
            println!("{}", rendered);
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(config)?),
    }
    Ok(())
}

/// Print the configuration file path
pub fn handle_config_path(override_path: Option<&Path>, format: OutputFormat) -> Result<()> {
    let path = match override_path {
        Some(path) => path.to_path_buf(),
        None => Config::default_config_path()?,
    };
    match format {
        OutputFormat::Text => println!("{}", path.display()),
        OutputFormat::Json => println!("{}", json!({ "path": path })),
    }
    Ok(())
}

/// List the built-in tools
pub fn handle_tools(config: &Config, format: OutputFormat) -> Result<()> {
    let registry = ToolRegistry::with_defaults(&config.core.workspace, &config.tools)?;
    let specs = registry.specs(registry.names());

    match format {
        OutputFormat::Text => {
            println!("Built-in tools ({}):", specs.len());
            println!();
            for spec in &specs {
                println!("  {}", spec.name);
                println!("    {}", spec.description);
            }
        }
        OutputFormat::Json => {
            let tools: Vec<_> = specs
                .iter()
                .map(|s| json!({ "name": s.name, "description": s.description }))
                .collect();
            println!("{}", serde_json::to_string_pretty(&tools)?);
        }
    }
    Ok(())
}
