//! Configuration: store paths, store client timeout, logging.
//!
//! Sources, later ones win:
//! 1. built-in defaults
//! 2. an optional TOML file
//! 3. `CADENCE__*` environment variables (`CADENCE__STORE__OPERATION_TIMEOUT_MS=2000`)

use std::path::Path;
use std::time::Duration;

use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Root paths of the persisted namespace. The defaults are the layout existing
/// deployments use and should only change together with a data migration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreLayout {
    /// Holds `active/`, `pending/` and `cleanup/`.
    pub requests_root: String,
    pub active_tasks_root: String,
    pub pending_tasks_root: String,
}

impl Default for StoreLayout {
    fn default() -> Self {
        Self {
            requests_root: "/requests".to_string(),
            active_tasks_root: "/tasks".to_string(),
            pending_tasks_root: "/pending".to_string(),
        }
    }
}

impl StoreLayout {
    pub fn active_requests_root(&self) -> String {
        format!("{}/active", self.requests_root)
    }

    pub fn pending_requests_root(&self) -> String {
        format!("{}/pending", self.requests_root)
    }

    pub fn cleanup_requests_root(&self) -> String {
        format!("{}/cleanup", self.requests_root)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let roots = [
            &self.requests_root,
            &self.active_tasks_root,
            &self.pending_tasks_root,
        ];
        for root in roots {
            if !root.starts_with('/') || root.len() < 2 || root.ends_with('/') {
                return Err(ConfigError::Invalid(format!(
                    "store root '{root}' must be an absolute path below '/'"
                )));
            }
        }
        for (i, a) in roots.iter().enumerate() {
            for b in roots.iter().skip(i + 1) {
                if a == b || a.starts_with(&format!("{b}/")) || b.starts_with(&format!("{a}/")) {
                    return Err(ConfigError::Invalid(format!(
                        "store roots '{a}' and '{b}' overlap"
                    )));
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Upper bound for a single store round trip.
    pub operation_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            operation_timeout_ms: 5_000,
        }
    }
}

impl StoreConfig {
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is not set.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CadenceConfig {
    pub store: StoreConfig,
    pub layout: StoreLayout,
    pub logging: LoggingConfig,
}

impl CadenceConfig {
    /// Load defaults, then `path` (if given and present), then the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(false));
        }
        builder = builder.add_source(
            Environment::with_prefix("CADENCE")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );
        Self::from_config(builder.build()?)
    }

    /// Parse a TOML document on top of the defaults (no environment).
    pub fn from_toml(source: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::from_str(source, FileFormat::Toml))
            .build()?;
        Self::from_config(config)
    }

    fn from_config(config: Config) -> Result<Self, ConfigError> {
        let loaded: CadenceConfig = config.try_deserialize()?;
        loaded.validate()?;
        Ok(loaded)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store.operation_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "store.operation_timeout_ms must be greater than 0".into(),
            ));
        }
        self.layout.validate()
    }
}
