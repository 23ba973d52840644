//! WSLSync Recovery - error classification and recovery engine
//!
//! Takes the raw, heterogeneous OS and network failures produced during file
//! copy/watch/delete operations and turns them into a bounded set of
//! actionable outcomes, while preserving enough context for a human-readable
//! run summary.
//!
//! # Pipeline
//!
//! ```text
//! io::Error ──→ ErrorClassifier ──→ SyncError ──→ RetryCoordinator ──→ Decision
//!                    │                                                    │
//!               ErrorCatalog                                       Retry / Skip / AbortRun
//!                (+ heuristics)                                           │
//!                                                          final ──→ RunAggregator ──→ RunSummary
//! ```
//!
//! The components are deliberately independent: the catalog is an immutable
//! value the classifier borrows, the coordinator owns all per-operation retry
//! state, and the aggregator owns all run-level state. The caller (the sync
//! driver) wires them together and acts on the returned decisions.

pub mod aggregator;
pub mod catalog;
pub mod classifier;
pub mod heuristics;
pub mod retry;

// Re-export the engine surface
pub use aggregator::{ErrorEvent, ReportError, RunAggregator, RunOutcome, RunSummary};
pub use catalog::{CatalogEntry, ErrorCatalog};
pub use classifier::ErrorClassifier;
pub use heuristics::{default_heuristics, Heuristic};
pub use retry::{Decision, RetryCoordinator};
