//! Logging System
//!
//! Structured logging on `tracing`, configurable level, format, and
//! destination. Mutations log their write sequence at debug level;
//! tolerated anomalies (dangling references, cyclic children lists)
//! surface as warnings rather than failures.

use crate::error::NamespaceError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::fmt;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Whether logging is enabled (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Log level: trace, debug, info, warn, error, off
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format: json, text (default: text)
    #[serde(default = "default_format")]
    pub format: String,

    /// Output destination: stdout, stderr, file
    #[serde(default = "default_output")]
    pub output: String,

    /// Log file path when output is "file"
    #[serde(default)]
    pub file: Option<PathBuf>,

    /// Enable colored output (text format, terminal destinations only)
    #[serde(default = "default_true")]
    pub color: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_format() -> String {
    "text".to_string()
}

fn default_output() -> String {
    "stderr".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            level: default_log_level(),
            format: default_format(),
            output: default_output(),
            file: None,
            color: default_true(),
        }
    }
}

/// Build the env filter, letting `CANOPY_LOG` override the configured level.
fn build_env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_env("CANOPY_LOG").unwrap_or_else(|_| EnvFilter::new(&config.level))
}

fn open_log_file(config: &LoggingConfig) -> Result<std::fs::File, NamespaceError> {
    let path = config.file.clone().ok_or_else(|| {
        NamespaceError::Config("log output is 'file' but no file path set".to_string())
    })?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            NamespaceError::Config(format!("failed to create log directory: {}", e))
        })?;
    }
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|e| NamespaceError::Config(format!("failed to open log file {:?}: {}", path, e)))
}

/// Initialize the logging system.
///
/// Safe to call more than once; later calls are no-ops once a global
/// subscriber is installed, so tests can initialize independently.
pub fn init_logging(config: &LoggingConfig) -> Result<(), NamespaceError> {
    if !config.enabled {
        return Ok(());
    }

    let filter = build_env_filter(config);

    let layer: Box<dyn Layer<Registry> + Send + Sync> =
        match (config.format.as_str(), config.output.as_str()) {
            ("json", "file") => {
                let file = Arc::new(open_log_file(config)?);
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_writer(file)
                    .with_filter(filter)
                    .boxed()
            }
            ("json", "stdout") => fmt::layer()
                .json()
                .with_target(true)
                .with_timer(ChronoUtc::rfc_3339())
                .with_writer(std::io::stdout)
                .with_filter(filter)
                .boxed(),
            ("json", _) => fmt::layer()
                .json()
                .with_target(true)
                .with_timer(ChronoUtc::rfc_3339())
                .with_writer(std::io::stderr)
                .with_filter(filter)
                .boxed(),
            (_, "file") => {
                let file = Arc::new(open_log_file(config)?);
                fmt::layer()
                    .with_target(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(false)
                    .with_writer(file)
                    .with_filter(filter)
                    .boxed()
            }
            (_, "stdout") => fmt::layer()
                .with_target(true)
                .with_timer(ChronoUtc::rfc_3339())
                .with_ansi(config.color)
                .with_writer(std::io::stdout)
                .with_filter(filter)
                .boxed(),
            _ => fmt::layer()
                .with_target(true)
                .with_timer(ChronoUtc::rfc_3339())
                .with_ansi(config.color)
                .with_writer(std::io::stderr)
                .with_filter(filter)
                .boxed(),
        };

    let _ = Registry::default().with(layer).try_init();
    Ok(())
}
