//! Logging setup using tracing.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::io;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable output for interactive use.
    Pretty,
    /// Structured JSON for log pipelines.
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Initialize the global tracing subscriber.
///
/// `RUST_LOG` overrides the configured default level. Fails if a
/// subscriber is already installed.
pub fn init(config: &LogConfig) -> Result<()> {
    let default_level = parse_log_level(&config.level)?;
    let env_filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy();

    match config.format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_writer(io::stdout)
            .with_target(true)
            .with_current_span(true)
            .try_init()
            .map_err(|e| anyhow::anyhow!("failed to install subscriber: {e}"))?,
        LogFormat::Pretty => tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(io::stdout)
            .with_target(true)
            .try_init()
            .map_err(|e| anyhow::anyhow!("failed to install subscriber: {e}"))?,
    }

    Ok(())
}

fn parse_log_level(level: &str) -> Result<Level> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" | "warning" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        other => Err(anyhow::anyhow!("invalid log level: {other}")),
    }
}
