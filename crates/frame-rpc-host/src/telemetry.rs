//! Tracing subscriber setup.
//!
//! Logs always go to stderr: stdout carries the wire protocol.

use crate::config::LoggingConfig;
use thiserror::Error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("Invalid log filter '{directive}': {error}")]
    Filter { directive: String, error: String },

    #[error("Failed to install subscriber: {0}")]
    Init(String),
}

/// Build the filter from the first source set: `level`, then `RUST_LOG`,
/// then `default`.
pub fn build_filter(level: Option<&str>, default: &str) -> Result<EnvFilter, TelemetryError> {
    if let Some(directive) = level {
        return parse_directive(directive);
    }
    EnvFilter::try_from_default_env()
        .or_else(|_| parse_directive(default))
}

fn parse_directive(directive: &str) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_new(directive).map_err(|e| TelemetryError::Filter {
        directive: directive.to_string(),
        error: e.to_string(),
    })
}

/// Install the global subscriber. Fails if one is already installed.
///
/// `level` comes from the command line and overrides both `RUST_LOG` and
/// `config.level`.
pub fn init_tracing(config: &LoggingConfig, level: Option<&str>) -> Result<(), TelemetryError> {
    let env_filter = build_filter(level, &config.level)?;
    let directive = env_filter.to_string();

    if config.json {
        let json_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_current_span(true)
            .with_writer(std::io::stderr);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(json_layer)
            .try_init()
            .map_err(|e| TelemetryError::Init(e.to_string()))?;
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_ansi(false)
            .with_writer(std::io::stderr);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
            .map_err(|e| TelemetryError::Init(e.to_string()))?;
    }

    tracing::debug!(filter = %directive, json = config.json, "Tracing initialized");
    Ok(())
}
