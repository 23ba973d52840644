//! Retry coordinator - per-operation retry policy and backoff
//!
//! Decides, for each classified error, whether the operation should be
//! retried after a delay, skipped and reported, or whether the whole run
//! must abort. Per-operation state lives in a concurrent arena keyed by
//! [`OpKey`]; entries are created on first failure and removed as soon as
//! the operation reaches a terminal outcome.
//!
//! Delays are *returned* to the caller, never slept here: workers schedule
//! them on their own async tasks so a backoff on one file does not stall
//! unrelated operations.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::{debug, info, warn};

use wslsync_core::config::RetryConfig;
use wslsync_core::domain::{ErrorCategory, OpKey, SyncError};

/// Outcome of evaluating a classified error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Re-attempt the operation after waiting this long
    Retry(Duration),
    /// Give up on this operation, report it, continue the run
    Skip,
    /// Stop the entire sync run
    AbortRun,
}

impl Decision {
    /// Returns true if the operation will not be attempted again
    pub fn is_final(&self) -> bool {
        !matches!(self, Decision::Retry(_))
    }
}

/// Per-operation retry bookkeeping
///
/// Owned exclusively by the coordinator; a single worker handles one
/// operation key at a time, so the entry itself needs no lock beyond the
/// arena's sharding.
#[derive(Debug, Clone)]
struct RetryState {
    /// Failed attempts evaluated so far for this key
    attempts: u32,
    /// Earliest time the next attempt may run
    next_eligible_at: DateTime<Utc>,
    /// Most recent delay granted for this key; the next delay is clamped
    /// to at least this value
    last_delay: Duration,
    /// Most recent classified error for this key
    last_error: SyncError,
}

/// Maximum total attempts for categories retried at most once
const SINGLE_RETRY_ATTEMPTS: u32 = 2;

/// Stateful retry policy shared across all workers of a run
pub struct RetryCoordinator {
    config: RetryConfig,
    states: DashMap<OpKey, RetryState>,
    cancelling: AtomicBool,
}

impl RetryCoordinator {
    /// Creates a coordinator with the given retry configuration
    pub fn new(config: RetryConfig) -> Self {
        Self {
            config,
            states: DashMap::new(),
            cancelling: AtomicBool::new(false),
        }
    }

    /// Marks the run as cancelling
    ///
    /// After this call every [`evaluate`](RetryCoordinator::evaluate)
    /// returns [`Decision::Skip`] regardless of category policy, letting
    /// in-flight work wind down without further retries.
    pub fn cancel(&self) {
        info!("Run cancellation requested; suppressing further retries");
        self.cancelling.store(true, Ordering::Release);
    }

    /// Returns whether the run is cancelling
    pub fn is_cancelling(&self) -> bool {
        self.cancelling.load(Ordering::Acquire)
    }

    /// Total attempts allowed for a category, including the first try
    ///
    /// Zero additional attempts means the first failure is final.
    fn attempt_cap(&self, category: ErrorCategory) -> u32 {
        match category {
            // Transient conditions: full exponential backoff
            ErrorCategory::Network | ErrorCategory::DiskSpace => self.config.max_attempts,
            // Transient lock or rename race: one more try, then final
            ErrorCategory::Permission | ErrorCategory::Path => SINGLE_RETRY_ATTEMPTS,
            // Require policy input external to this engine
            ErrorCategory::Conflict | ErrorCategory::Config | ErrorCategory::Validation => 1,
            // Final by default
            ErrorCategory::System | ErrorCategory::Unknown => 1,
        }
    }

    /// Evaluates a classified error and returns the decision for it
    ///
    /// Terminal guarantee: once the attempt cap for the operation's
    /// category is exhausted this never returns `Retry`, and the per-key
    /// state is removed so a later failure of the same path+action starts
    /// fresh.
    pub fn evaluate(&self, error: &SyncError) -> Decision {
        let key = error.key();

        if self.is_cancelling() {
            self.states.remove(&key);
            debug!(%key, "Run is cancelling; skipping without retry");
            return Decision::Skip;
        }

        if error.is_fatal() {
            self.states.remove(&key);
            warn!(%key, code = error.code(), "Fatal error; aborting run");
            return Decision::AbortRun;
        }

        if self.config.disabled || !error.retryable() {
            self.states.remove(&key);
            debug!(
                %key,
                code = error.code(),
                retries_disabled = self.config.disabled,
                "Final failure without retry"
            );
            return Decision::Skip;
        }

        let cap = self.attempt_cap(error.category());
        let mut entry = self
            .states
            .entry(key.clone())
            .or_insert_with(|| RetryState {
                attempts: 0,
                next_eligible_at: Utc::now(),
                last_delay: Duration::ZERO,
                last_error: error.clone(),
            });

        // The caller's attempt counter and our own can disagree when the
        // caller re-enters with pre-existing attempt numbers; trust the
        // larger of the two so the cap can never be overshot.
        let attempt = entry.attempts.max(error.context().attempt().saturating_sub(1)) + 1;

        if attempt >= cap {
            drop(entry);
            self.states.remove(&key);
            debug!(
                %key,
                code = error.code(),
                attempt,
                cap,
                "Attempt cap reached; skipping"
            );
            return Decision::Skip;
        }

        // Clamp to the previous delay: with a flat multiplier an
        // independent jitter draw could otherwise come out smaller.
        let delay = self.backoff_delay(attempt).max(entry.last_delay);
        entry.attempts = attempt;
        entry.next_eligible_at = Utc::now() + chrono::Duration::from_std(delay).unwrap_or_default();
        entry.last_delay = delay;
        entry.last_error = error.clone();

        debug!(
            %key,
            code = error.code(),
            attempt,
            cap,
            delay_ms = delay.as_millis() as u64,
            "Scheduling retry"
        );
        Decision::Retry(delay)
    }

    /// Backoff delay for the given failed-attempt number (1-based)
    ///
    /// Exponential growth with additive-only jitter: the jitter can only
    /// lengthen a delay, so concurrent failures against the same transient
    /// condition spread out instead of retrying in lockstep. Callers clamp
    /// the result against the key's previous delay so successive delays for
    /// one key never shrink, whatever the multiplier/jitter combination.
    fn backoff_delay(&self, attempt: u32) -> Duration {
        let attempt = attempt.max(1);
        let base_secs = self.config.base_delay().as_secs_f64();
        let max_secs = self.config.max_delay().as_secs_f64();

        let raw = base_secs * self.config.multiplier.powi(attempt as i32 - 1);

        let jittered = if self.config.jitter > 0.0 {
            raw * (1.0 + fastrand::f64() * self.config.jitter)
        } else {
            raw
        };

        Duration::from_secs_f64(jittered.min(max_secs))
    }

    /// Records that an operation succeeded after earlier failures
    ///
    /// Removes the per-key state; returns the last classified error if the
    /// key was being tracked.
    pub fn on_success(&self, key: &OpKey) -> Option<SyncError> {
        self.states.remove(key).map(|(_, state)| {
            debug!(%key, attempts = state.attempts, "Operation recovered after retries");
            state.last_error
        })
    }

    /// Number of operations currently holding retry state
    pub fn pending(&self) -> usize {
        self.states.len()
    }

    /// Earliest eligible time for a tracked operation, if any
    pub fn next_eligible_at(&self, key: &OpKey) -> Option<DateTime<Utc>> {
        self.states.get(key).map(|s| s.next_eligible_at)
    }
}
