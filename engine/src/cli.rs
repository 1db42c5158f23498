//! CLI interface for Lumen
//!
//! This module provides the command-line interface using clap's derive API.
//! It defines all commands and global flags.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Lumen multi-agent data analysis engine
///
/// Turns a natural-language brief into a data analysis project: a planner
/// splits the work into steps, workers do them, reviewers check them.
#[derive(Parser, Debug)]
#[command(name = "lumen")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log: Option<String>,

    /// Specify alternate configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the agents on a brief
    Run {
        /// File holding the brief (default: core.brief_file)
        #[arg(long, value_name = "FILE")]
        brief: Option<PathBuf>,

        /// Skip the notebook assembly after the project is done
        #[arg(long)]
        no_notebook: bool,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// List the built-in tools
    Tools,
}

/// Configuration actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show the effective configuration
    Show,

    /// Print the configuration file path
    Path,
}
