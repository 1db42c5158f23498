//! Configuration management
//!
//! This module handles loading, validation, and management of the Lumen configuration.
//! Configuration is stored in TOML format at ~/.lumen/config.toml unless a path
//! is given on the command line.
//!
//! # Configuration Sections
//!
//! - **core**: Workspace path, log level, audit directory, brief file
//! - **llm**: Completion backend settings
//! - **agents**: Per-role model overrides (optional)
//! - **limits**: Safety valves for the tool loop and the review loop
//! - **audit**: Conversation audit log settings
//! - **tools**: Built-in capability settings
//!
//! Every field has a default, so a partial file (or an empty one) is valid.
//!
//! # Path Expansion
//!
//! The configuration system automatically:
//! - Expands ~ to the user's home directory
//! - Canonicalizes the workspace, creating it if it doesn't exist
//! - Resolves relative audit and brief paths against the workspace
//!
//! # Examples
//!
//! ```no_run
//! use lumen_engine::config::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load_or_create()?;
//! println!("Workspace: {:?}", config.core.workspace);
//! println!("Model: {}", config.llm.openai.model);
//! # Ok(())
//! # }
//! ```

use sdk::errors::EngineError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::agent::AgentRole;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Core engine settings
    #[serde(default)]
    pub core: CoreConfig,

    /// Completion backend configuration
    #[serde(default)]
    pub llm: LLMConfig,

    /// Per-role model overrides
    #[serde(default)]
    pub agents: AgentsConfig,

    /// Round and iteration limits
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Audit log settings
    #[serde(default)]
    pub audit: AuditConfig,

    /// Built-in tool settings
    #[serde(default)]
    pub tools: ToolsConfig,
}

/// Core engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Project directory the agents work in (supports ~ expansion)
    #[serde(default = "default_workspace")]
    pub workspace: PathBuf,

    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Audit log directory, relative to the workspace unless absolute
    #[serde(default = "default_audit_dir")]
    pub audit_dir: PathBuf,

    /// File holding the project brief, relative to the workspace unless absolute
    #[serde(default = "default_brief_file")]
    pub brief_file: PathBuf,
}

/// Completion backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMConfig {
    /// Backend name (only `openai` is supported)
    #[serde(default = "default_provider")]
    pub provider: String,

    /// OpenAI-compatible backend settings
    #[serde(default)]
    pub openai: OpenAIConfig,
}

/// OpenAI provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIConfig {
    /// Base URL for the chat-completions API
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,

    /// Default model for every agent
    #[serde(default = "default_openai_model")]
    pub model: String,

    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    // Note: the API key itself never lives in this file
}

/// Per-role model overrides
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub planner_model: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker_model: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewer_model: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notebook_model: Option<String>,
}

/// Safety valves
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Maximum backend round-trips in one agent query
    #[serde(default = "default_max_tool_rounds")]
    pub max_tool_rounds: usize,

    /// Maximum reviewer verdicts for one plan step
    #[serde(default = "default_max_review_rounds")]
    pub max_review_rounds: usize,

    /// Truncate step summaries handed to the planner (unset keeps them whole)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_summary_chars: Option<usize>,
}

/// Audit log configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Write per-agent audit files
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Content characters kept per entry
    #[serde(default = "default_truncate_chars")]
    pub truncate_chars: usize,
}

/// Built-in tool configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Timeout for subprocess tools in seconds
    #[serde(default = "default_command_timeout")]
    pub command_timeout_secs: u64,

    /// Largest file `CatTool` will return
    #[serde(default = "default_max_read_bytes")]
    pub max_read_bytes: usize,

    /// Python interpreter used by the Python tools
    #[serde(default = "default_python")]
    pub python: String,

    /// Register the Jupyter notebook tools
    #[serde(default = "default_true")]
    pub notebook: bool,
}

// Default value functions
fn default_workspace() -> PathBuf {
    PathBuf::from(".")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_audit_dir() -> PathBuf {
    PathBuf::from("lumen_logs")
}

fn default_brief_file() -> PathBuf {
    PathBuf::from("prompt.txt")
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_openai_model() -> String {
    "gpt-4o".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_timeout_secs() -> u64 {
    300
}

fn default_max_tool_rounds() -> usize {
    50
}

fn default_max_review_rounds() -> usize {
    10
}

fn default_true() -> bool {
    true
}

fn default_truncate_chars() -> usize {
    crate::audit::DEFAULT_TRUNCATE_CHARS
}

fn default_command_timeout() -> u64 {
    600
}

fn default_max_read_bytes() -> usize {
    20_000
}

fn default_python() -> String {
    "python".to_string()
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            workspace: default_workspace(),
            log_level: default_log_level(),
            audit_dir: default_audit_dir(),
            brief_file: default_brief_file(),
        }
    }
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            openai: OpenAIConfig::default(),
        }
    }
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            base_url: default_openai_base_url(),
            model: default_openai_model(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_tool_rounds: default_max_tool_rounds(),
            max_review_rounds: default_max_review_rounds(),
            max_summary_chars: None,
        }
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            truncate_chars: default_truncate_chars(),
        }
    }
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            command_timeout_secs: default_command_timeout(),
            max_read_bytes: default_max_read_bytes(),
            python: default_python(),
            notebook: true,
        }
    }
}

impl Config {
    /// Load configuration from the default location (~/.lumen/config.toml)
    ///
    /// If the configuration file doesn't exist, creates a default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration file cannot be read or written
    /// - TOML parsing fails
    /// - Validation fails
    pub fn load_or_create() -> Result<Self, EngineError> {
        let config_path = Self::default_config_path()?;
        Self::load_or_create_at(&config_path)
    }

    /// Load configuration from `path`, writing defaults there first if missing
    pub fn load_or_create_at(path: &Path) -> Result<Self, EngineError> {
        if path.exists() {
            Self::load_from_path(path)
        } else {
            Self::create_default(path)
        }
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, EngineError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("Failed to read config file: {}", e)))?;
        Self::from_toml_str(&contents)
    }

    /// Parse and validate configuration text
    pub fn from_toml_str(contents: &str) -> Result<Self, EngineError> {
        let mut config: Config = toml::from_str(contents)
            .map_err(|e| EngineError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate_and_process()?;
        Ok(config)
    }

    /// Create default configuration and save to path
    fn create_default(path: &Path) -> Result<Self, EngineError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                EngineError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        // The file keeps the unprocessed defaults so `.` stays relative
        let defaults = Self::default();
        let toml_string = toml::to_string_pretty(&defaults)
            .map_err(|e| EngineError::Config(format!("Failed to serialize config: {}", e)))?;
        fs::write(path, toml_string)
            .map_err(|e| EngineError::Config(format!("Failed to write config file: {}", e)))?;

        let mut config = defaults;
        config.validate_and_process()?;
        Ok(config)
    }

    /// Get the default configuration file path (~/.lumen/config.toml)
    pub fn default_config_path() -> Result<PathBuf, EngineError> {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(".lumen").join("config.toml"))
    }

    /// Model identifier for an agent role, honoring overrides
    pub fn model_for(&self, role: AgentRole) -> &str {
        let override_model = match role {
            AgentRole::Planner => &self.agents.planner_model,
            AgentRole::Worker => &self.agents.worker_model,
            AgentRole::Reviewer => &self.agents.reviewer_model,
            AgentRole::NotebookAssembler => &self.agents.notebook_model,
        };
        override_model
            .as_deref()
            .unwrap_or(self.llm.openai.model.as_str())
    }

    /// Validate and process configuration
    ///
    /// This method:
    /// - Validates enumerated and numeric fields
    /// - Expands ~ in paths
    /// - Canonicalizes the workspace, creating it if needed
    /// - Resolves audit and brief paths against the workspace
    fn validate_and_process(&mut self) -> Result<(), EngineError> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.core.log_level.as_str()) {
            return Err(EngineError::Config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.core.log_level,
                valid_log_levels.join(", ")
            )));
        }

        if self.llm.provider != "openai" {
            return Err(EngineError::Config(format!(
                "Invalid provider '{}'. Must be one of: openai",
                self.llm.provider
            )));
        }

        if self.llm.openai.model.trim().is_empty() {
            return Err(EngineError::Config("llm.openai.model must not be empty".to_string()));
        }

        if self.llm.openai.timeout_secs == 0 {
            return Err(EngineError::Config(
                "llm.openai.timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.limits.max_tool_rounds == 0 {
            return Err(EngineError::Config(
                "limits.max_tool_rounds must be greater than 0".to_string(),
            ));
        }

        if self.limits.max_review_rounds == 0 {
            return Err(EngineError::Config(
                "limits.max_review_rounds must be greater than 0".to_string(),
            ));
        }

        if self.limits.max_summary_chars == Some(0) {
            return Err(EngineError::Config(
                "limits.max_summary_chars must be greater than 0 when set".to_string(),
            ));
        }

        if self.tools.command_timeout_secs == 0 {
            return Err(EngineError::Config(
                "tools.command_timeout_secs must be greater than 0".to_string(),
            ));
        }

        // Expand and validate workspace path
        self.core.workspace = expand_path(&self.core.workspace)?;
        self.core.workspace = canonicalize_or_create(&self.core.workspace)?;

        if !self.core.workspace.is_dir() {
            return Err(EngineError::Config(format!(
                "Workspace path is not a directory: {:?}",
                self.core.workspace
            )));
        }

        self.core.audit_dir = self.within_workspace(&self.core.audit_dir)?;
        self.core.brief_file = self.within_workspace(&self.core.brief_file)?;

        Ok(())
    }

    fn within_workspace(&self, path: &Path) -> Result<PathBuf, EngineError> {
        let expanded = expand_path(path)?;
        if expanded.is_absolute() {
            Ok(expanded)
        } else {
            Ok(self.core.workspace.join(expanded))
        }
    }
}

/// Expand ~ in path to user's home directory
fn expand_path(path: &Path) -> Result<PathBuf, EngineError> {
    let path_str = path
        .to_str()
        .ok_or_else(|| EngineError::Config("Invalid UTF-8 in path".to_string()))?;

    if let Some(rest) = path_str.strip_prefix("~/") {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(rest))
    } else if path_str == "~" {
        dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))
    } else {
        Ok(path.to_path_buf())
    }
}

/// Canonicalize path, creating it if it doesn't exist
fn canonicalize_or_create(path: &Path) -> Result<PathBuf, EngineError> {
    if !path.exists() {
        fs::create_dir_all(path).map_err(|e| {
            EngineError::Config(format!("Failed to create directory {:?}: {}", path, e))
        })?;
    }

    path.canonicalize().map_err(|e| {
        EngineError::Config(format!("Failed to resolve path {:?}: {}", path, e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_values() {
        let config = Config::default();

        assert_eq!(config.core.log_level, "info");
        assert_eq!(config.core.audit_dir, PathBuf::from("lumen_logs"));
        assert_eq!(config.llm.provider, "openai");
        assert_eq!(config.llm.openai.model, "gpt-4o");
        assert_eq!(config.limits.max_tool_rounds, 50);
        assert_eq!(config.limits.max_review_rounds, 10);
        assert_eq!(config.limits.max_summary_chars, None);
        assert_eq!(config.audit.truncate_chars, 1000);
        assert_eq!(config.tools.max_read_bytes, 20_000);
        assert!(config.tools.notebook);
    }

    #[test]
    fn test_expand_path_with_tilde() {
        let path = PathBuf::from("~/test");
        let expanded = expand_path(&path).unwrap();

        let home = dirs::home_dir().unwrap();
        assert_eq!(expanded, home.join("test"));
    }

    #[test]
    fn test_expand_path_without_tilde() {
        let path = PathBuf::from("/absolute/path");
        let expanded = expand_path(&path).unwrap();

        assert_eq!(expanded, path);
    }

    #[test]
    fn test_expand_path_tilde_only() {
        let expanded = expand_path(&PathBuf::from("~")).unwrap();
        assert_eq!(expanded, dirs::home_dir().unwrap());
    }

    #[test]
    fn test_partial_file_and_relative_paths() {
        let temp = TempDir::new().unwrap();
        let workspace = temp.path().join("project");
        let text = format!(
            "[core]\nworkspace = {:?}\n\n[limits]\nmax_review_rounds = 3\n",
            workspace.to_str().unwrap()
        );

        let config = Config::from_toml_str(&text).unwrap();
        let canonical = workspace.canonicalize().unwrap();
        assert_eq!(config.core.workspace, canonical);
        assert_eq!(config.core.audit_dir, canonical.join("lumen_logs"));
        assert_eq!(config.core.brief_file, canonical.join("prompt.txt"));
        assert_eq!(config.limits.max_review_rounds, 3);
        assert_eq!(config.limits.max_tool_rounds, 50);
    }

    #[test]
    fn test_invalid_values_rejected() {
        for text in [
            "[core]\nlog_level = \"loud\"\n",
            "[llm]\nprovider = \"carrier-pigeon\"\n",
            "[limits]\nmax_tool_rounds = 0\n",
            "[limits]\nmax_summary_chars = 0\n",
        ] {
            let err = Config::from_toml_str(text).unwrap_err();
            assert!(matches!(err, EngineError::Config(_)), "{}", text);
        }
    }

    #[test]
    fn test_model_overrides() {
        let mut config = Config::default();
        config.agents.reviewer_model = Some("gpt-4o-mini".to_string());

        assert_eq!(config.model_for(AgentRole::Planner), "gpt-4o");
        assert_eq!(config.model_for(AgentRole::Reviewer), "gpt-4o-mini");
    }

    #[test]
    fn test_create_default_writes_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("config.toml");

        let config = Config::load_or_create_at(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.llm.openai.model, "gpt-4o");

        // The written file loads back
        let reloaded = Config::load_from_path(&path).unwrap();
        assert_eq!(reloaded.limits.max_tool_rounds, config.limits.max_tool_rounds);
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_string = toml::to_string(&config).unwrap();

        let deserialized: Config = toml::from_str(&toml_string).unwrap();
        assert_eq!(config.core.log_level, deserialized.core.log_level);
        assert_eq!(config.llm.openai.base_url, deserialized.llm.openai.base_url);
    }
}
