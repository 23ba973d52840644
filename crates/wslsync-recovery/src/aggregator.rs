//! Run aggregator and reporter
//!
//! Collects the terminal errors of one sync run across all concurrent
//! workers, deduplicates them per operation, and produces the final
//! [`RunSummary`] the CLI renders. All mutable run state sits behind one
//! mutex; `finalize` runs under the same guard so the single-call invariant
//! holds under concurrency.
//!
//! Memory stays bounded on runs with many retried files: only the most
//! recent [`SyncError`] per distinct path+action is kept, and the per
//! category/severity counts are derived from that deduplicated list.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use wslsync_core::domain::{ErrorCategory, OpKey, Severity, SyncAction, SyncError};

use crate::retry::Decision;

/// Streaming per-error event for live progress display
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEvent {
    pub code: String,
    pub category: ErrorCategory,
    pub severity: Severity,
    pub path: String,
    pub action: SyncAction,
    pub message: String,
}

impl ErrorEvent {
    fn from_error(error: &SyncError) -> Self {
        Self {
            code: error.code().to_string(),
            category: error.category(),
            severity: error.severity(),
            path: error.context().path().display().to_string(),
            action: error.context().action(),
            message: error.message().to_string(),
        }
    }
}

/// Run-level outcome derived at finalize time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// Zero recorded errors
    Clean,
    /// Only warnings and non-fatal errors were recorded
    CompletedWithWarnings,
    /// A fatal error was recorded or the run was aborted
    Failed,
}

impl std::fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunOutcome::Clean => write!(f, "clean"),
            RunOutcome::CompletedWithWarnings => write!(f, "completed_with_warnings"),
            RunOutcome::Failed => write!(f, "failed"),
        }
    }
}

/// Aggregate result of one sync run, built exactly once by `finalize`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    /// Run-level outcome
    pub outcome: RunOutcome,
    /// Terminal errors per category (deduplicated per operation)
    pub category_counts: HashMap<ErrorCategory, u64>,
    /// Terminal errors per severity (deduplicated per operation)
    pub severity_counts: HashMap<Severity, u64>,
    /// Most recent error per distinct path+action, in first-failure order
    pub unresolved: Vec<SyncError>,
    /// Operations that succeeded after one or more retries
    pub recovered: u64,
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// When the run was finalized
    pub finished_at: DateTime<Utc>,
}

impl RunSummary {
    /// Returns true if any terminal error was recorded
    pub fn has_errors(&self) -> bool {
        !self.unresolved.is_empty()
    }

    /// Total number of distinct failed operations
    pub fn error_count(&self) -> usize {
        self.unresolved.len()
    }
}

/// Errors from misusing the reporter
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReportError {
    /// `finalize` was called more than once; a caller bug, not a sync
    /// condition
    #[error("run already finalized")]
    AlreadyFinalized,
}

#[derive(Debug)]
struct AggregatorInner {
    started_at: DateTime<Utc>,
    /// Most recent terminal error per key, insertion-ordered
    unresolved: Vec<(OpKey, SyncError)>,
    recovered: u64,
    abort_seen: bool,
    finalized: bool,
}

/// Shared run-level bookkeeping for one sync invocation
///
/// `record` is idempotent per operation: recording the same key again
/// replaces its stored error instead of double-counting it.
pub struct RunAggregator {
    inner: Mutex<AggregatorInner>,
    events_tx: Option<mpsc::Sender<ErrorEvent>>,
}

impl RunAggregator {
    /// Creates an aggregator without a streaming event channel
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Creates an aggregator that emits an [`ErrorEvent`] per recorded error
    ///
    /// Events are best effort: a full or closed channel never blocks or
    /// fails `record`.
    pub fn with_events(events_tx: mpsc::Sender<ErrorEvent>) -> Self {
        Self::build(Some(events_tx))
    }

    fn build(events_tx: Option<mpsc::Sender<ErrorEvent>>) -> Self {
        Self {
            inner: Mutex::new(AggregatorInner {
                started_at: Utc::now(),
                unresolved: Vec::new(),
                recovered: 0,
                abort_seen: false,
                finalized: false,
            }),
            events_tx,
        }
    }

    /// Records an operation that reached a terminal decision
    ///
    /// Called with `Skip` or `AbortRun`; `Retry` decisions are not
    /// terminal and are ignored with a warning.
    pub fn record(&self, error: &SyncError, decision: Decision) {
        if !decision.is_final() {
            warn!(key = %error.key(), "Ignoring record of a non-terminal decision");
            return;
        }

        let mut inner = self.inner.lock().expect("aggregator mutex poisoned");
        if inner.finalized {
            warn!(key = %error.key(), "Error recorded after finalize; dropping");
            return;
        }

        if decision == Decision::AbortRun {
            inner.abort_seen = true;
        }

        let key = error.key();
        match inner.unresolved.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = error.clone(),
            None => inner.unresolved.push((key, error.clone())),
        }
        debug!(
            key = %error.key(),
            category = %error.category(),
            severity = %error.severity(),
            "Recorded terminal error"
        );
        drop(inner);

        if let Some(tx) = &self.events_tx {
            // try_send keeps record non-blocking under a slow consumer
            let _ = tx.try_send(ErrorEvent::from_error(error));
        }
    }

    /// Marks the run as aborted without an associated error
    ///
    /// Used for external cancellation (ctrl-c): the run finalizes as
    /// [`RunOutcome::Failed`] even when no terminal error was recorded, so
    /// an interrupted run is never reported as a successful one.
    pub fn record_aborted(&self) {
        let mut inner = self.inner.lock().expect("aggregator mutex poisoned");
        if inner.finalized {
            return;
        }
        inner.abort_seen = true;
    }

    /// Records an operation that succeeded after earlier retries
    ///
    /// Clears any terminal error previously stored for the key.
    pub fn record_recovered(&self, key: &OpKey) {
        let mut inner = self.inner.lock().expect("aggregator mutex poisoned");
        if inner.finalized {
            return;
        }
        inner.recovered += 1;
        inner.unresolved.retain(|(k, _)| k != key);
    }

    /// Finalizes the run and returns the summary
    ///
    /// Callable exactly once; a second call returns
    /// [`ReportError::AlreadyFinalized`]. Must be invoked only after all
    /// workers have quiesced.
    pub fn finalize(&self) -> Result<RunSummary, ReportError> {
        let mut inner = self.inner.lock().expect("aggregator mutex poisoned");
        if inner.finalized {
            return Err(ReportError::AlreadyFinalized);
        }
        inner.finalized = true;

        let mut category_counts: HashMap<ErrorCategory, u64> = HashMap::new();
        let mut severity_counts: HashMap<Severity, u64> = HashMap::new();
        let mut any_fatal = false;

        for (_, error) in &inner.unresolved {
            *category_counts.entry(error.category()).or_default() += 1;
            *severity_counts.entry(error.severity()).or_default() += 1;
            any_fatal |= error.is_fatal();
        }

        let outcome = if inner.abort_seen || any_fatal {
            RunOutcome::Failed
        } else if inner.unresolved.is_empty() {
            RunOutcome::Clean
        } else {
            RunOutcome::CompletedWithWarnings
        };

        debug!(
            %outcome,
            errors = inner.unresolved.len(),
            recovered = inner.recovered,
            "Run finalized"
        );

        Ok(RunSummary {
            outcome,
            category_counts,
            severity_counts,
            unresolved: inner.unresolved.iter().map(|(_, e)| e.clone()).collect(),
            recovered: inner.recovered,
            started_at: inner.started_at,
            finished_at: Utc::now(),
        })
    }
}

impl Default for RunAggregator {
    fn default() -> Self {
        Self::new()
    }
}
