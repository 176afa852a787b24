//! Configuration loading for the Canopy engine and CLI.
//!
//! Layered load: file (when present), then `CANOPY_`-prefixed
//! environment variables. Every field carries a serde default so a
//! missing file yields a fully usable configuration.

use crate::logging::LoggingConfig;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Traversal bounds applied to every recursive operation.
///
/// Guards recursive delete, descendant checks, and materialization
/// against unbounded work when the stored tree has been corrupted into
/// a cycle or a runaway chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Limits {
    /// Maximum tree depth any traversal will expand.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

fn default_max_depth() -> usize {
    1000
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
        }
    }
}

/// Store backend settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Database directory; None means use the platform data directory.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl StoreConfig {
    /// Resolve the database path, falling back to the platform default
    /// (`~/.local/share/canopy` on Linux).
    pub fn resolve_path(&self) -> Result<PathBuf, ConfigError> {
        if let Some(path) = &self.path {
            return Ok(path.clone());
        }
        let dirs = directories::ProjectDirs::from("", "canopy", "canopy").ok_or_else(|| {
            ConfigError::Message("could not determine platform data directory".to_string())
        })?;
        Ok(dirs.data_dir().join("nodes"))
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CanopyConfig {
    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub limits: Limits,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Configuration loader facade.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from an optional file and the environment.
    ///
    /// Environment variables use the `CANOPY_` prefix with `__` as the
    /// section separator, e.g. `CANOPY_LIMITS__MAX_DEPTH=500`.
    pub fn load(file: Option<&Path>) -> Result<CanopyConfig, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(File::from(path.to_path_buf()).required(true));
        }
        builder = builder.add_source(Environment::with_prefix("CANOPY").separator("__"));
        builder.build()?.try_deserialize()
    }

    /// Create default configuration.
    pub fn default() -> CanopyConfig {
        CanopyConfig::default()
    }
}
