//! Domain types shared across the synchronizer
//!
//! - Operation vocabulary: which file-level action failed, on which path,
//!   on which attempt
//! - Error vocabulary: the closed category set, severities, and the
//!   immutable classified `SyncError`

pub mod error;
pub mod operation;

// Re-export commonly used types
pub use error::{ErrorCategory, Severity, SyncError};
pub use operation::{OpContext, OpKey, SyncAction};
