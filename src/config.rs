//! Compiler configuration
//!
//! Loaded from a JSON file:
//!
//! ```json
//! { "schema_path": "./schema.json", "dialect": "postgres", "default_limit": 100, "max_limit": 1000 }
//! ```
//!
//! Only `schema_path` is required.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::dialect::Dialect;
use crate::observability::Severity;

/// Result type for configuration loading
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("Invalid config JSON: {0}")]
    Malformed(String),

    #[error("Invalid config value: {0}")]
    Invalid(String),
}

impl ConfigError {
    pub fn code(&self) -> &'static str {
        match self {
            ConfigError::Io { .. } => "CONFIG_IO",
            ConfigError::Malformed(_) => "CONFIG_MALFORMED",
            ConfigError::Invalid(_) => "CONFIG_INVALID",
        }
    }
}

/// Settings shared by the CLI and the request sanitizer
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CompilerConfig {
    /// Schema overview file; relative paths resolve against the config file
    pub schema_path: PathBuf,

    #[serde(default)]
    pub dialect: Dialect,

    /// Limit applied when a request gives none
    #[serde(default = "default_limit")]
    pub default_limit: i64,

    /// Largest accepted limit; `-1` disables the cap
    #[serde(default = "default_max_limit")]
    pub max_limit: i64,

    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_limit() -> i64 {
    100
}
fn default_max_limit() -> i64 {
    1000
}
fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            schema_path: PathBuf::from("./schema.json"),
            dialect: Dialect::default(),
            default_limit: default_limit(),
            max_limit: default_max_limit(),
            log_level: default_log_level(),
        }
    }
}

impl CompilerConfig {
    /// Load and validate configuration from file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        let mut config: CompilerConfig =
            serde_json::from_str(&content).map_err(|e| ConfigError::Malformed(e.to_string()))?;

        if config.schema_path.is_relative() {
            if let Some(dir) = path.parent() {
                config.schema_path = dir.join(&config.schema_path);
            }
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> ConfigResult<()> {
        if self.default_limit < -1 {
            return Err(ConfigError::Invalid(format!(
                "default_limit must be -1 or >= 0, got {}",
                self.default_limit
            )));
        }

        if self.max_limit < -1 {
            return Err(ConfigError::Invalid(format!(
                "max_limit must be -1 or >= 0, got {}",
                self.max_limit
            )));
        }

        if self.max_limit != -1 && (self.default_limit == -1 || self.default_limit > self.max_limit) {
            return Err(ConfigError::Invalid(format!(
                "default_limit {} exceeds max_limit {}",
                self.default_limit, self.max_limit
            )));
        }

        self.severity()?;
        Ok(())
    }

    /// Parsed `log_level`
    pub fn severity(&self) -> ConfigResult<Severity> {
        self.log_level.parse().map_err(ConfigError::Invalid)
    }
}
