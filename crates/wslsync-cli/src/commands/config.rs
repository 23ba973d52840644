//! Config command - view and validate wslsync configuration
//!
//! Provides the `wslsync config` CLI command which:
//! 1. Shows the effective configuration (YAML or JSON)
//! 2. Validates the configuration file and reports every problem found

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Subcommand;
use tracing::info;

use wslsync_core::config::Config;

use crate::output::{get_formatter, OutputFormat};

/// Config subcommands
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display the effective configuration
    Show,
    /// Validate the configuration file
    Validate,
}

impl ConfigCommand {
    /// Execute the config command
    pub fn execute(&self, format: OutputFormat, config_path: Option<&str>) -> Result<ExitCode> {
        let path = config_path
            .map(PathBuf::from)
            .unwrap_or_else(Config::default_path);

        match self {
            ConfigCommand::Show => self.execute_show(format, &path),
            ConfigCommand::Validate => self.execute_validate(format, &path),
        }
    }

    fn execute_show(&self, format: OutputFormat, path: &Path) -> Result<ExitCode> {
        let formatter = get_formatter(matches!(format, OutputFormat::Json));
        let config = Config::load_or_default(path);

        info!(config_path = %path.display(), "Showing configuration");

        if matches!(format, OutputFormat::Json) {
            let json = serde_json::to_value(&config)
                .context("Failed to serialize configuration to JSON")?;
            formatter.print_json(&json);
        } else {
            formatter.success(&format!("Configuration ({})", path.display()));
            formatter.info("");

            let yaml = serde_yaml::to_string(&config)
                .context("Failed to serialize configuration to YAML")?;
            for line in yaml.lines() {
                formatter.info(line);
            }
        }

        Ok(ExitCode::SUCCESS)
    }

    fn execute_validate(&self, format: OutputFormat, path: &Path) -> Result<ExitCode> {
        let formatter = get_formatter(matches!(format, OutputFormat::Json));
        let config = match Config::load(path) {
            Ok(config) => config,
            Err(e) => {
                if matches!(format, OutputFormat::Json) {
                    formatter.print_json(&serde_json::json!({
                        "valid": false,
                        "path": path.display().to_string(),
                        "errors": [format!("{e:#}")],
                    }));
                } else {
                    formatter.error(&format!("Failed to load {}: {e:#}", path.display()));
                }
                return Ok(ExitCode::FAILURE);
            }
        };

        let errors = config.validate();

        if matches!(format, OutputFormat::Json) {
            let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            formatter.print_json(&serde_json::json!({
                "valid": errors.is_empty(),
                "path": path.display().to_string(),
                "errors": messages,
            }));
        } else if errors.is_empty() {
            formatter.success(&format!("{} is valid", path.display()));
        } else {
            formatter.error(&format!(
                "{} has {} problem(s):",
                path.display(),
                errors.len()
            ));
            for error in &errors {
                formatter.warn(&format!("  {error}"));
            }
        }

        if errors.is_empty() {
            Ok(ExitCode::SUCCESS)
        } else {
            Ok(ExitCode::FAILURE)
        }
    }
}
