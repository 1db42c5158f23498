// Lumen multi-agent engine
// Main entry point for the lumen binary

use clap::Parser;
use lumen_engine::cli::{Cli, Command, ConfigAction};
use lumen_engine::config::Config;
use lumen_engine::handlers::{
    handle_config_path, handle_config_show, handle_run, handle_tools, OutputFormat,
};
use lumen_engine::telemetry::init_telemetry_with_level;
use sdk::errors::{EngineError, LumenErrorExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let result = run(cli).await;
    if let Err(e) = &result {
        if let Some(engine_error) = e.downcast_ref::<EngineError>() {
            eprintln!("Hint: {}", engine_error.user_hint());
        }
    }
    result
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    // Needs no valid configuration
    if let Command::Config {
        action: ConfigAction::Path,
    } = cli.command
    {
        return handle_config_path(cli.config.as_deref(), format);
    }

    let config = if let Some(config_path) = &cli.config {
        Config::load_from_path(config_path)?
    } else {
        Config::load_or_create()?
    };

    // RUST_LOG still wins over both
    let log_level = cli.log.as_deref().unwrap_or(&config.core.log_level);
    init_telemetry_with_level(log_level);
    tracing::debug!("Lumen v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::Run { brief, no_notebook } => {
            tracing::info!("Starting run in {}", config.core.workspace.display());
            handle_run(brief, no_notebook, &config, format).await
        }

        Command::Config { action } => match action {
            ConfigAction::Show => handle_config_show(&config, format),
            ConfigAction::Path => handle_config_path(cli.config.as_deref(), format),
        },

        Command::Tools => handle_tools(&config, format),
    }
}
