//! Sync command - run a one-shot mirror pass
//!
//! Wires the full pipeline together: load and layer configuration, build
//! the recovery components, subscribe to the streaming error events for
//! live output, run the mirror engine, render the summary, and map the
//! run outcome to the process exit code. Ctrl-c cancels the run: in-flight
//! retries are abandoned and workers wind down without starting new work.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Args;
use tokio::sync::mpsc;
use tracing::info;

use wslsync_core::config::{Config, ConfigBuilder};
use wslsync_recovery::{
    ErrorCatalog, ErrorClassifier, ErrorEvent, RetryCoordinator, RunAggregator,
};
use wslsync_sync::MirrorEngine;

use crate::output::{exit_code_for, get_formatter, render_report, OutputFormat};

#[derive(Debug, Args)]
pub struct SyncCommand {
    /// Source directory to mirror from
    pub source: PathBuf,

    /// Destination directory to mirror into
    pub dest: PathBuf,

    /// Delete destination entries that no longer exist in the source
    #[arg(long)]
    pub delete: bool,

    /// Number of concurrent file-operation workers
    #[arg(long)]
    pub workers: Option<usize>,

    /// Maximum attempts for backoff-retried failures
    #[arg(long)]
    pub max_retries: Option<u32>,

    /// Disable all retries (dry-run / CI mode): every failure is final
    #[arg(long)]
    pub no_retry: bool,
}

impl SyncCommand {
    /// Execute the sync command and return the process exit code
    pub async fn execute(&self, format: OutputFormat, config_path: Option<&str>) -> Result<ExitCode> {
        let formatter = get_formatter(matches!(format, OutputFormat::Json));

        // Step 1: Load config and layer CLI overrides
        let config = load_config(config_path)?;
        let mut builder = ConfigBuilder::from_config(config).sync_delete_extraneous(self.delete);
        if let Some(workers) = self.workers {
            builder = builder.sync_workers(workers);
        }
        if let Some(max_retries) = self.max_retries {
            builder = builder.retry_max_attempts(max_retries);
        }
        if self.no_retry {
            builder = builder.retry_disabled(true);
        }
        let config = match builder.build_validated() {
            Ok(config) => config,
            Err(errors) => {
                for error in &errors {
                    formatter.error(&format!("Invalid configuration - {error}"));
                }
                bail!("configuration validation failed");
            }
        };

        // Step 2: Build the recovery components
        let catalog = Arc::new(ErrorCatalog::builtin());
        let classifier = Arc::new(ErrorClassifier::new(catalog));
        let coordinator = Arc::new(RetryCoordinator::new(config.retry.clone()));
        let (events_tx, events_rx) = mpsc::channel::<ErrorEvent>(256);
        let aggregator = Arc::new(RunAggregator::with_events(events_tx));

        // Step 3: Live per-error lines while the run progresses
        let live_format = format;
        let live = tokio::spawn(stream_events(events_rx, live_format));

        // Step 4: Ctrl-c cancels the run
        let engine = Arc::new(MirrorEngine::new(
            &config,
            classifier,
            coordinator,
            aggregator,
        ));
        let cancel_coordinator = Arc::clone(engine.coordinator());
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel_coordinator.cancel();
            }
        });

        info!(
            source = %self.source.display(),
            dest = %self.dest.display(),
            "Starting sync"
        );

        // Step 5: Run and report
        let report = engine
            .run(self.source.clone(), self.dest.clone())
            .await
            .context("Sync run failed")?;

        // The aggregator (and its event sender) is dropped with the engine
        // once run() returns, so the stream task finishes on its own.
        let _ = live.await;

        render_report(&report, format);
        Ok(exit_code_for(report.summary.outcome))
    }
}

/// Loads the configuration file, or defaults when none is given
fn load_config(config_path: Option<&str>) -> Result<Config> {
    match config_path {
        Some(path) => Config::load(Path::new(path))
            .with_context(|| format!("Failed to load config from {path}")),
        None => Ok(Config::load_or_default(&Config::default_path())),
    }
}

/// Prints one line per streamed error event
async fn stream_events(mut events_rx: mpsc::Receiver<ErrorEvent>, format: OutputFormat) {
    let formatter = get_formatter(matches!(format, OutputFormat::Json));
    while let Some(event) = events_rx.recv().await {
        match format {
            OutputFormat::Json => {
                formatter.print_json(&serde_json::json!({
                    "event": "error",
                    "code": event.code,
                    "category": event.category,
                    "severity": event.severity,
                    "path": event.path,
                    "action": event.action,
                    "message": event.message,
                }));
            }
            OutputFormat::Human => {
                formatter.warn(&format!(
                    "{} {} failed [{}/{}]: {}",
                    event.action, event.path, event.category, event.severity, event.message
                ));
            }
        }
    }
}
