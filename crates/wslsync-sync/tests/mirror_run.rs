//! Integration tests for the mirror engine against real temp directories

use std::path::Path;
use std::sync::Arc;

use wslsync_core::config::{Config, ConfigBuilder};
use wslsync_core::domain::ErrorCategory;
use wslsync_recovery::{ErrorCatalog, ErrorClassifier, RetryCoordinator, RunAggregator, RunOutcome};
use wslsync_sync::MirrorEngine;

fn engine_with(config: &Config) -> Arc<MirrorEngine> {
    let catalog = Arc::new(ErrorCatalog::builtin());
    let classifier = Arc::new(ErrorClassifier::new(catalog));
    let coordinator = Arc::new(RetryCoordinator::new(config.retry.clone()));
    let aggregator = Arc::new(RunAggregator::new());
    Arc::new(MirrorEngine::new(config, classifier, coordinator, aggregator))
}

fn fast_config() -> Config {
    ConfigBuilder::new()
        .sync_workers(4)
        .retry_base_delay_ms(1)
        .retry_max_delay_ms(10)
        .build()
}

async fn write_tree(root: &Path) {
    tokio::fs::create_dir_all(root.join("docs/reports")).await.unwrap();
    tokio::fs::write(root.join("top.txt"), b"top").await.unwrap();
    tokio::fs::write(root.join("docs/a.txt"), b"alpha").await.unwrap();
    tokio::fs::write(root.join("docs/reports/q1.txt"), b"q1 numbers")
        .await
        .unwrap();
}

#[tokio::test]
async fn mirrors_a_tree_cleanly() {
    let source = tempfile::tempdir().unwrap();
    let dest = tempfile::tempdir().unwrap();
    write_tree(source.path()).await;

    let engine = engine_with(&fast_config());
    let report = engine
        .run(source.path().to_path_buf(), dest.path().to_path_buf())
        .await
        .unwrap();

    assert_eq!(report.summary.outcome, RunOutcome::Clean);
    assert_eq!(report.files_copied, 3);
    assert_eq!(report.dirs_created, 2);

    let copied = tokio::fs::read(dest.path().join("docs/reports/q1.txt"))
        .await
        .unwrap();
    assert_eq!(copied, b"q1 numbers");
}

#[tokio::test]
async fn second_run_copies_nothing() {
    let source = tempfile::tempdir().unwrap();
    let dest = tempfile::tempdir().unwrap();
    write_tree(source.path()).await;

    let config = fast_config();
    let first = engine_with(&config);
    first
        .run(source.path().to_path_buf(), dest.path().to_path_buf())
        .await
        .unwrap();

    let second = engine_with(&config);
    let report = second
        .run(source.path().to_path_buf(), dest.path().to_path_buf())
        .await
        .unwrap();

    assert_eq!(report.summary.outcome, RunOutcome::Clean);
    assert_eq!(report.files_copied, 0);
    assert_eq!(report.files_up_to_date, 3);
}

#[tokio::test]
async fn modified_source_file_is_recopied() {
    let source = tempfile::tempdir().unwrap();
    let dest = tempfile::tempdir().unwrap();
    write_tree(source.path()).await;

    let config = fast_config();
    engine_with(&config)
        .run(source.path().to_path_buf(), dest.path().to_path_buf())
        .await
        .unwrap();

    // Grow the file so size alone marks it stale
    tokio::fs::write(source.path().join("docs/a.txt"), b"alpha v2 longer")
        .await
        .unwrap();

    let report = engine_with(&config)
        .run(source.path().to_path_buf(), dest.path().to_path_buf())
        .await
        .unwrap();

    assert_eq!(report.files_copied, 1);
    let copied = tokio::fs::read(dest.path().join("docs/a.txt")).await.unwrap();
    assert_eq!(copied, b"alpha v2 longer");
}

#[tokio::test]
async fn creates_missing_destination_root() {
    let source = tempfile::tempdir().unwrap();
    let dest_parent = tempfile::tempdir().unwrap();
    write_tree(source.path()).await;
    let dest = dest_parent.path().join("mirror/out");

    let report = engine_with(&fast_config())
        .run(source.path().to_path_buf(), dest.clone())
        .await
        .unwrap();

    assert_eq!(report.summary.outcome, RunOutcome::Clean);
    assert_eq!(report.files_copied, 3);
    assert!(dest.join("top.txt").exists());
    assert!(dest.join("docs/reports/q1.txt").exists());
}

#[tokio::test]
async fn extraneous_entries_deleted_when_enabled() {
    let source = tempfile::tempdir().unwrap();
    let dest = tempfile::tempdir().unwrap();
    write_tree(source.path()).await;
    tokio::fs::write(dest.path().join("stale.txt"), b"old").await.unwrap();
    tokio::fs::create_dir_all(dest.path().join("old-dir/sub")).await.unwrap();

    let config = ConfigBuilder::from_config(fast_config())
        .sync_delete_extraneous(true)
        .build();
    let report = engine_with(&config)
        .run(source.path().to_path_buf(), dest.path().to_path_buf())
        .await
        .unwrap();

    assert_eq!(report.summary.outcome, RunOutcome::Clean);
    // stale.txt plus old-dir (deleted as a unit, children not double-counted)
    assert_eq!(report.files_deleted, 2);
    assert!(!dest.path().join("stale.txt").exists());
    assert!(!dest.path().join("old-dir").exists());
}

#[tokio::test]
async fn extraneous_entries_kept_by_default() {
    let source = tempfile::tempdir().unwrap();
    let dest = tempfile::tempdir().unwrap();
    write_tree(source.path()).await;
    tokio::fs::write(dest.path().join("stale.txt"), b"old").await.unwrap();

    let report = engine_with(&fast_config())
        .run(source.path().to_path_buf(), dest.path().to_path_buf())
        .await
        .unwrap();

    assert_eq!(report.files_deleted, 0);
    assert!(dest.path().join("stale.txt").exists());
}

#[tokio::test]
async fn mkdir_over_existing_file_reports_conflict() {
    let source = tempfile::tempdir().unwrap();
    let dest = tempfile::tempdir().unwrap();
    tokio::fs::create_dir(source.path().join("docs")).await.unwrap();
    tokio::fs::write(source.path().join("docs/a.txt"), b"alpha").await.unwrap();
    // The destination already has a *file* named "docs"
    tokio::fs::write(dest.path().join("docs"), b"not a dir").await.unwrap();

    let report = engine_with(&fast_config())
        .run(source.path().to_path_buf(), dest.path().to_path_buf())
        .await
        .unwrap();

    assert_ne!(report.summary.outcome, RunOutcome::Clean);
    assert!(report
        .summary
        .category_counts
        .get(&ErrorCategory::Conflict)
        .copied()
        .unwrap_or(0)
        >= 1);
}

#[tokio::test]
async fn missing_source_records_path_errors() {
    let source = tempfile::tempdir().unwrap();
    let dest = tempfile::tempdir().unwrap();
    let gone = source.path().join("never-existed");

    let report = engine_with(&fast_config())
        .run(gone, dest.path().to_path_buf())
        .await
        .unwrap();

    assert_eq!(report.summary.outcome, RunOutcome::CompletedWithWarnings);
    assert!(report.summary.category_counts[&ErrorCategory::Path] >= 1);
    assert_eq!(report.files_copied, 0);
}

#[tokio::test]
async fn cancelled_run_copies_nothing() {
    let source = tempfile::tempdir().unwrap();
    let dest = tempfile::tempdir().unwrap();
    write_tree(source.path()).await;

    let engine = engine_with(&fast_config());
    engine.coordinator().cancel();

    let report = engine
        .run(source.path().to_path_buf(), dest.path().to_path_buf())
        .await
        .unwrap();

    assert_eq!(report.files_copied, 0);
    assert_eq!(report.dirs_created, 0);
    // An interrupted run is not a successful one
    assert_eq!(report.summary.outcome, RunOutcome::Failed);
}
