//! WSLSync Sync - one-shot mirror sync driver
//!
//! Walks a source tree, mirrors it into a destination tree over a bounded
//! worker pool, and routes every operation failure through the recovery
//! engine (`wslsync-recovery`): classify, evaluate, retry with the granted
//! backoff, and record terminal failures for the run summary.
//!
//! The full bidirectional watcher is out of scope here; this driver is the
//! engine's in-repo caller and the substrate the CLI runs.

pub mod engine;
pub mod filesystem;

pub use engine::{MirrorEngine, RunReport};
