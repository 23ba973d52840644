//! Mirror engine - one-shot source → destination sync
//!
//! Plans the work by walking the source tree, then executes it over a
//! bounded worker pool. Every failed operation goes through the recovery
//! pipeline: classify, evaluate, sleep out granted backoff on the worker's
//! own task, and record terminal failures. An `AbortRun` decision flips the
//! coordinator's cancel flag so in-flight workers wind down promptly.
//!
//! ```text
//! plan (walk) ──→ mkdir ops (ordered) ──→ copy ops (pooled) ──→ delete ops
//!                        │                      │                    │
//!                        └──── failures ──→ classify → evaluate → record
//! ```

use std::collections::HashSet;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use wslsync_core::config::Config;
use wslsync_core::domain::{OpContext, SyncAction};
use wslsync_recovery::{
    Decision, ErrorClassifier, RetryCoordinator, RunAggregator, RunSummary,
};

use crate::filesystem::{needs_copy, LocalFs};

/// Result of one engine run: operation counts plus the finalized summary
#[derive(Debug, Clone)]
pub struct RunReport {
    pub files_copied: u64,
    pub files_up_to_date: u64,
    pub dirs_created: u64,
    pub files_deleted: u64,
    pub duration_ms: u64,
    pub summary: RunSummary,
}

/// Outcome of one pooled task
enum TaskOutcome {
    Copied,
    UpToDate,
    Deleted,
    Failed,
}

/// Work discovered by the planning walk
#[derive(Debug, Default)]
struct Plan {
    /// Source directories, parents before children (relative paths)
    dirs: Vec<PathBuf>,
    /// Source files to consider copying (relative paths)
    files: Vec<PathBuf>,
    /// Destination entries with no source counterpart (relative paths)
    extraneous: Vec<PathBuf>,
}

/// One-shot mirror sync driver wired to the recovery engine
pub struct MirrorEngine {
    fs: LocalFs,
    classifier: Arc<ErrorClassifier>,
    coordinator: Arc<RetryCoordinator>,
    aggregator: Arc<RunAggregator>,
    workers: usize,
    delete_extraneous: bool,
}

impl MirrorEngine {
    /// Creates an engine over the given recovery components
    pub fn new(
        config: &Config,
        classifier: Arc<ErrorClassifier>,
        coordinator: Arc<RetryCoordinator>,
        aggregator: Arc<RunAggregator>,
    ) -> Self {
        Self {
            fs: LocalFs::new(),
            classifier,
            coordinator,
            aggregator,
            workers: config.sync.workers.max(1),
            delete_extraneous: config.sync.delete_extraneous,
        }
    }

    /// The retry coordinator, exposed so callers can wire external stop
    /// signals (ctrl-c) to [`RetryCoordinator::cancel`]
    pub fn coordinator(&self) -> &Arc<RetryCoordinator> {
        &self.coordinator
    }

    /// Runs one mirror pass from `source` into `dest`
    ///
    /// Returns a report even when individual operations failed; only a
    /// reporter misuse (finalize called twice) is an `Err`.
    pub async fn run(self: Arc<Self>, source: PathBuf, dest: PathBuf) -> Result<RunReport> {
        let started = Instant::now();
        info!(
            source = %source.display(),
            dest = %dest.display(),
            workers = self.workers,
            "Starting mirror run"
        );

        // The destination root may not exist yet; create it up front so
        // planning and the per-directory mkdirs start from a real tree.
        let fs = self.fs;
        let root = dest.clone();
        let _ = self
            .run_op(OpContext::new(dest.clone(), SyncAction::Mkdir), move || {
                let path = root.clone();
                async move { fs.make_dir_all(&path).await }
            })
            .await;

        let plan = self.plan(&source, &dest).await;
        debug!(
            dirs = plan.dirs.len(),
            files = plan.files.len(),
            extraneous = plan.extraneous.len(),
            "Plan built"
        );

        // Directories first, in parent-before-child order, off the pool:
        // copies depend on them existing.
        let mut dirs_created = 0u64;
        for rel in &plan.dirs {
            let target = dest.join(rel);
            let fs = self.fs;
            let path = target.clone();
            let created = self
                .run_op(OpContext::new(target, SyncAction::Mkdir), move || {
                    let path = path.clone();
                    async move { fs.make_dir(&path).await }
                })
                .await
                .is_some();
            if created {
                dirs_created += 1;
            }
        }

        // File copies over the bounded pool
        let semaphore = Arc::new(Semaphore::new(self.workers));
        let mut tasks = JoinSet::new();
        for rel in plan.files {
            let engine = Arc::clone(&self);
            let semaphore = Arc::clone(&semaphore);
            let src = source.join(&rel);
            let dst = dest.join(&rel);
            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await.expect("semaphore closed");
                engine.copy_one(src, dst).await
            });
        }

        let mut files_copied = 0u64;
        let mut files_up_to_date = 0u64;
        while let Some(joined) = tasks.join_next().await {
            match joined.context("copy worker panicked")? {
                TaskOutcome::Copied => files_copied += 1,
                TaskOutcome::UpToDate => files_up_to_date += 1,
                TaskOutcome::Deleted | TaskOutcome::Failed => {}
            }
        }

        // Deletions of extraneous destination entries, after copies so a
        // half-failed run never deletes more than it created.
        let mut files_deleted = 0u64;
        if self.delete_extraneous {
            let mut tasks = JoinSet::new();
            for rel in plan.extraneous {
                let engine = Arc::clone(&self);
                let semaphore = Arc::clone(&semaphore);
                let target = dest.join(&rel);
                tasks.spawn(async move {
                    let _permit = semaphore.acquire_owned().await.expect("semaphore closed");
                    engine.delete_one(target).await
                });
            }
            while let Some(joined) = tasks.join_next().await {
                if matches!(joined.context("delete worker panicked")?, TaskOutcome::Deleted) {
                    files_deleted += 1;
                }
            }
        }

        // A cancelled run must never report as a successful one, even when
        // it stopped before any operation could fail.
        if self.coordinator.is_cancelling() {
            self.aggregator.record_aborted();
        }

        let summary = self
            .aggregator
            .finalize()
            .context("Failed to finalize run summary")?;

        let duration_ms = started.elapsed().as_millis() as u64;
        info!(
            outcome = %summary.outcome,
            files_copied,
            dirs_created,
            files_deleted,
            errors = summary.error_count(),
            duration_ms,
            "Mirror run finished"
        );

        Ok(RunReport {
            files_copied,
            files_up_to_date,
            dirs_created,
            files_deleted,
            duration_ms,
            summary,
        })
    }

    /// Copies one file if the destination is missing or stale
    async fn copy_one(&self, src: PathBuf, dst: PathBuf) -> TaskOutcome {
        let fs = self.fs;

        let src_path = src.clone();
        let Some(src_meta) = self
            .run_op(OpContext::new(src.clone(), SyncAction::Stat), move || {
                let path = src_path.clone();
                async move { fs.stat(&path).await }
            })
            .await
        else {
            return TaskOutcome::Failed;
        };

        // A missing destination is the normal copy case, not a failure
        let dst_path = dst.clone();
        let Some(dst_meta) = self
            .run_op(OpContext::new(dst.clone(), SyncAction::Stat), move || {
                let path = dst_path.clone();
                async move {
                    match fs.stat(&path).await {
                        Ok(meta) => Ok(Some(meta)),
                        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
                        Err(e) => Err(e),
                    }
                }
            })
            .await
        else {
            return TaskOutcome::Failed;
        };

        if !needs_copy(&src_meta, dst_meta.as_ref()) {
            debug!(path = %dst.display(), "Destination up to date");
            return TaskOutcome::UpToDate;
        }

        let copied = self
            .run_op(OpContext::new(dst.clone(), SyncAction::Copy), move || {
                let src = src.clone();
                let dst = dst.clone();
                async move { fs.copy_file(&src, &dst).await.map(|_| ()) }
            })
            .await
            .is_some();

        if copied {
            TaskOutcome::Copied
        } else {
            TaskOutcome::Failed
        }
    }

    /// Deletes one extraneous destination entry
    async fn delete_one(&self, target: PathBuf) -> TaskOutcome {
        let fs = self.fs;
        let path = target.clone();
        let deleted = self
            .run_op(OpContext::new(target, SyncAction::Delete), move || {
                let path = path.clone();
                async move { fs.remove(&path).await }
            })
            .await
            .is_some();
        if deleted {
            TaskOutcome::Deleted
        } else {
            TaskOutcome::Failed
        }
    }

    /// Drives one operation to success or a terminal decision
    ///
    /// `Retry` delays are slept on this task only; other workers keep
    /// going. Returns `None` when the operation was given up on (or the
    /// run is cancelling).
    async fn run_op<F, Fut, T>(&self, mut ctx: OpContext, mut op: F) -> Option<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = io::Result<T>>,
    {
        loop {
            if self.coordinator.is_cancelling() {
                debug!(%ctx, "Run cancelling; not starting operation");
                return None;
            }

            match op().await {
                Ok(value) => {
                    if ctx.attempt() > 1 {
                        self.coordinator.on_success(&ctx.key());
                        self.aggregator.record_recovered(&ctx.key());
                        info!(%ctx, "Operation recovered after retry");
                    }
                    return Some(value);
                }
                Err(raw) => {
                    let error = self.classifier.classify(Some(&raw), &ctx);
                    match self.coordinator.evaluate(&error) {
                        Decision::Retry(delay) => {
                            debug!(
                                %ctx,
                                code = error.code(),
                                delay_ms = delay.as_millis() as u64,
                                "Retrying after backoff"
                            );
                            tokio::time::sleep(delay).await;
                            ctx = ctx.next_attempt();
                        }
                        decision => {
                            warn!(
                                %ctx,
                                code = error.code(),
                                category = %error.category(),
                                ?decision,
                                "Operation failed terminally"
                            );
                            self.aggregator.record(&error, decision);
                            if decision == Decision::AbortRun {
                                self.coordinator.cancel();
                            }
                            return None;
                        }
                    }
                }
            }
        }
    }

    /// Walks source (and destination, when deleting extraneous entries)
    /// and builds the work plan
    ///
    /// Walk failures are routed through the same recovery pipeline as
    /// execution failures, under the `stat` action.
    async fn plan(&self, source: &Path, dest: &Path) -> Plan {
        let mut plan = Plan::default();
        let mut seen: HashSet<PathBuf> = HashSet::new();

        let mut stack: Vec<PathBuf> = vec![PathBuf::new()];
        while let Some(rel) = stack.pop() {
            let abs = source.join(&rel);
            let Some(mut reader) = self.read_dir_op(abs.clone()).await else {
                continue;
            };
            loop {
                match reader.next_entry().await {
                    Ok(Some(entry)) => {
                        let child_rel = rel.join(entry.file_name());
                        match entry.file_type().await {
                            Ok(ft) if ft.is_dir() => {
                                seen.insert(child_rel.clone());
                                plan.dirs.push(child_rel.clone());
                                stack.push(child_rel);
                            }
                            Ok(ft) if ft.is_file() => {
                                seen.insert(child_rel.clone());
                                plan.files.push(child_rel);
                            }
                            Ok(_) => {
                                // Symlinks and special files are not mirrored
                                debug!(path = %entry.path().display(), "Skipping special file");
                            }
                            Err(raw) => self.record_walk_failure(&entry.path(), &raw),
                        }
                    }
                    Ok(None) => break,
                    Err(raw) => {
                        self.record_walk_failure(&abs, &raw);
                        break;
                    }
                }
            }
        }

        if self.delete_extraneous {
            let mut stack: Vec<PathBuf> = vec![PathBuf::new()];
            while let Some(rel) = stack.pop() {
                let abs = dest.join(&rel);
                let Some(mut reader) = self.read_dir_op(abs.clone()).await else {
                    continue;
                };
                loop {
                    match reader.next_entry().await {
                        Ok(Some(entry)) => {
                            let child_rel = rel.join(entry.file_name());
                            if !seen.contains(&child_rel) {
                                // Extraneous: delete as a unit, do not descend
                                plan.extraneous.push(child_rel);
                            } else if entry.file_type().await.map(|ft| ft.is_dir()).unwrap_or(false)
                            {
                                stack.push(child_rel);
                            }
                        }
                        Ok(None) => break,
                        Err(raw) => {
                            self.record_walk_failure(&abs, &raw);
                            break;
                        }
                    }
                }
            }
        }

        plan
    }

    /// Opens a directory reader through the retry pipeline
    async fn read_dir_op(&self, path: PathBuf) -> Option<tokio::fs::ReadDir> {
        let open_path = path.clone();
        self.run_op(OpContext::new(path, SyncAction::Stat), move || {
            let path = open_path.clone();
            async move { tokio::fs::read_dir(path).await }
        })
        .await
    }

    /// Records a mid-walk failure
    ///
    /// Directory entries cannot be re-driven individually, so these are
    /// terminal without consulting retry policy; fatal severity still
    /// aborts the run.
    fn record_walk_failure(&self, path: &Path, raw: &io::Error) {
        let error = self
            .classifier
            .classify(Some(raw), &OpContext::new(path, SyncAction::Stat));
        let decision = if error.is_fatal() {
            self.coordinator.cancel();
            Decision::AbortRun
        } else {
            Decision::Skip
        };
        self.aggregator.record(&error, decision);
    }
}
