//! Telemetry and Observability
//!
//! Handles setting up `tracing-subscriber` for structured logging.
//! Supports config-driven log levels, environment variable overrides,
//! and format switching between pretty (debug) and JSON (release).
//!
//! Conversation audit files are written by [`crate::audit`] and never go
//! through this subscriber.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Output format of the subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    /// Pretty in debug builds, JSON in release builds
    pub fn for_build() -> Self {
        if cfg!(debug_assertions) {
            LogFormat::Pretty
        } else {
            LogFormat::Json
        }
    }
}

/// Filter directive for a level: the level everywhere plus our own crate
pub fn filter_directive(log_level: &str) -> String {
    format!("{},lumen_engine={}", log_level, log_level)
}

/// Initialize the tracing subscriber.
///
/// Priority: `RUST_LOG` env var > `log_level` parameter > default "info".
/// Only the first call installs a subscriber; later calls are no-ops.
pub fn init_telemetry_with(log_level: &str, format: LogFormat) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(log_level)));

    match format {
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().pretty().with_target(false))
                .try_init()
                .ok();
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_current_span(true))
                .try_init()
                .ok();
        }
    }
}

/// Initialize with the build's default format
pub fn init_telemetry_with_level(log_level: &str) {
    init_telemetry_with(log_level, LogFormat::for_build());
}
