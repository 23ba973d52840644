//! Configuration module for wslsync.
//!
//! Provides typed configuration structs that map to the YAML configuration
//! file, with loading, validation, defaults, and a builder for programmatic
//! use (the CLI layers its flag overrides through the builder).

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level configuration for wslsync.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub sync: SyncConfig,
    pub retry: RetryConfig,
    pub logging: LoggingConfig,
}

/// Synchronization driver settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Number of concurrent file-operation workers.
    pub workers: usize,
    /// Whether to delete destination entries that no longer exist in the source.
    pub delete_extraneous: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            delete_extraneous: false,
        }
    }
}

/// Retry and backoff settings consumed by the recovery engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum attempts for backoff-retried categories, including the first try.
    pub max_attempts: u32,
    /// Base backoff delay in milliseconds.
    pub base_delay_ms: u64,
    /// Backoff growth factor between successive retries.
    pub multiplier: f64,
    /// Upper bound on a single backoff delay, in milliseconds.
    pub max_delay_ms: u64,
    /// Additive jitter factor (0.0-1.0) applied to each delay.
    pub jitter: f64,
    /// Disables all retries (dry-run / CI mode): every failure is final.
    pub disabled: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_ms: 500,
            multiplier: 2.0,
            max_delay_ms: 30_000,
            jitter: 0.2,
            disabled: false,
        }
    }
}

impl RetryConfig {
    /// Base backoff delay as a [`Duration`].
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    /// Maximum backoff delay as a [`Duration`].
    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/wslsync/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("wslsync")
            .join("config.yaml")
    }
}

/// A single configuration validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field (e.g. `retry.multiplier`).
    pub field: String,
    /// Why the value was rejected.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl Config {
    /// Validate the configuration, returning every problem found.
    ///
    /// An empty vector means the configuration is usable.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.sync.workers == 0 {
            errors.push(ValidationError {
                field: "sync.workers".to_string(),
                message: "must be at least 1".to_string(),
            });
        }

        if self.retry.max_attempts == 0 {
            errors.push(ValidationError {
                field: "retry.max_attempts".to_string(),
                message: "must be at least 1".to_string(),
            });
        }

        if self.retry.multiplier < 1.0 {
            errors.push(ValidationError {
                field: "retry.multiplier".to_string(),
                message: "must be >= 1.0 so delays never shrink".to_string(),
            });
        }

        if !(0.0..=1.0).contains(&self.retry.jitter) {
            errors.push(ValidationError {
                field: "retry.jitter".to_string(),
                message: "must be between 0.0 and 1.0".to_string(),
            });
        }

        if self.retry.max_delay_ms < self.retry.base_delay_ms {
            errors.push(ValidationError {
                field: "retry.max_delay_ms".to_string(),
                message: "must not be smaller than retry.base_delay_ms".to_string(),
            });
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".to_string(),
                message: format!(
                    "'{}' is not one of: {}",
                    self.logging.level,
                    valid_levels.join(", ")
                ),
            });
        }

        errors
    }
}

/// Builder for [`Config`], used by the CLI to layer flag overrides on top
/// of the loaded file.
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a builder initialised with [`Config::default`] values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder seeded from an existing configuration.
    pub fn from_config(config: Config) -> Self {
        Self { config }
    }

    pub fn sync_workers(mut self, workers: usize) -> Self {
        self.config.sync.workers = workers;
        self
    }

    pub fn sync_delete_extraneous(mut self, delete: bool) -> Self {
        self.config.sync.delete_extraneous = delete;
        self
    }

    pub fn retry_max_attempts(mut self, attempts: u32) -> Self {
        self.config.retry.max_attempts = attempts;
        self
    }

    pub fn retry_base_delay_ms(mut self, ms: u64) -> Self {
        self.config.retry.base_delay_ms = ms;
        self
    }

    pub fn retry_multiplier(mut self, multiplier: f64) -> Self {
        self.config.retry.multiplier = multiplier;
        self
    }

    pub fn retry_max_delay_ms(mut self, ms: u64) -> Self {
        self.config.retry.max_delay_ms = ms;
        self
    }

    pub fn retry_disabled(mut self, disabled: bool) -> Self {
        self.config.retry.disabled = disabled;
        self
    }

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate in one step. Returns `Err` with the list of
    /// problems if validation fails.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}
