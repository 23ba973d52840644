//! Classified error types
//!
//! A raw OS or network failure becomes a [`SyncError`]: one of nine closed
//! [`ErrorCategory`] buckets, a [`Severity`], a retryability flag, and the
//! operation context it occurred under. A `SyncError` is immutable after
//! construction; a retry produces a *new* value with an incremented attempt
//! number rather than overwriting history.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::operation::{OpContext, OpKey};

/// Semantic bucket a raw failure is classified into
///
/// The set is closed and exhaustive: every classified error carries exactly
/// one category, and raw codes the engine does not recognize resolve to
/// [`Unknown`](ErrorCategory::Unknown), never to an absent value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Access denied, operation not permitted, locked file
    Permission,
    /// Missing file or directory, malformed or over-long path
    Path,
    /// Disk or quota exhaustion
    DiskSpace,
    /// Timeouts, refused connections, dropped network mounts
    Network,
    /// Filename collision between the two filesystems
    Conflict,
    /// Read-only filesystem, low-level I/O failure
    System,
    /// Failure while reading the configuration
    Config,
    /// Invalid input detected before the operation ran
    Validation,
    /// Anything the catalog and heuristics could not place
    Unknown,
}

impl ErrorCategory {
    /// All categories, in reporting order
    pub const ALL: [ErrorCategory; 9] = [
        ErrorCategory::Permission,
        ErrorCategory::Path,
        ErrorCategory::DiskSpace,
        ErrorCategory::Network,
        ErrorCategory::Conflict,
        ErrorCategory::System,
        ErrorCategory::Config,
        ErrorCategory::Validation,
        ErrorCategory::Unknown,
    ];

    /// Returns the category name as used in logs and reports
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Permission => "permission",
            ErrorCategory::Path => "path",
            ErrorCategory::DiskSpace => "disk_space",
            ErrorCategory::Network => "network",
            ErrorCategory::Conflict => "conflict",
            ErrorCategory::System => "system",
            ErrorCategory::Config => "config",
            ErrorCategory::Validation => "validation",
            ErrorCategory::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How serious a classified error is for the run as a whole
///
/// `Fatal` forces a run-level abort regardless of category.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Noted in the summary, does not affect the run outcome beyond
    /// `completed_with_warnings`
    Warning,
    /// The operation failed terminally but the run continues
    Error,
    /// The whole run must stop
    Fatal,
}

impl Severity {
    /// Returns the severity name as used in logs and reports
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Fatal => "fatal",
        }
    }

    /// Returns true if this severity forces a run-level abort
    pub fn is_fatal(&self) -> bool {
        matches!(self, Severity::Fatal)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified operation failure
///
/// Constructed by the classifier on every failed operation and never
/// mutated afterwards. The original raw error survives as its display
/// string plus the OS error number, enough for the terminal report without
/// dragging a non-`Clone` `std::io::Error` through the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncError {
    code: String,
    category: ErrorCategory,
    severity: Severity,
    retryable: bool,
    message: String,
    context: OpContext,
    source: Option<String>,
    os_code: Option<i32>,
    timestamp: DateTime<Utc>,
}

impl SyncError {
    /// Creates a classified error for the given operation context
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        code: impl Into<String>,
        category: ErrorCategory,
        severity: Severity,
        retryable: bool,
        message: impl Into<String>,
        context: OpContext,
        source: Option<String>,
        os_code: Option<i32>,
    ) -> Self {
        Self {
            code: code.into(),
            category,
            severity,
            retryable,
            message: message.into(),
            context,
            source,
            os_code,
            timestamp: Utc::now(),
        }
    }

    /// Returns the normalized code string (e.g. `"EACCES"`)
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Returns the semantic category
    pub fn category(&self) -> ErrorCategory {
        self.category
    }

    /// Returns the severity
    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// Returns whether the default policy permits automatic retry
    pub fn retryable(&self) -> bool {
        self.retryable
    }

    /// Returns the human-readable message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the operation context this error occurred under
    pub fn context(&self) -> &OpContext {
        &self.context
    }

    /// Returns the display string of the raw error, if one was present
    pub fn source_message(&self) -> Option<&str> {
        self.source.as_deref()
    }

    /// Returns the raw OS error number, if one was present
    pub fn os_code(&self) -> Option<i32> {
        self.os_code
    }

    /// Returns when the error was classified
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Returns the stable key of the logical operation that failed
    pub fn key(&self) -> OpKey {
        self.context.key()
    }

    /// Returns true if this error forces a run-level abort
    pub fn is_fatal(&self) -> bool {
        self.severity.is_fatal()
    }

    /// Returns a new error for the next attempt of the same operation
    ///
    /// The original value is left untouched so the attempt history remains
    /// an ordered sequence of immutable errors.
    pub fn next_attempt(&self) -> Self {
        Self {
            context: self.context.next_attempt(),
            timestamp: Utc::now(),
            ..self.clone()
        }
    }
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}/{}] {}: {}",
            self.category, self.severity, self.context, self.message
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::operation::SyncAction;

    fn sample_error() -> SyncError {
        SyncError::new(
            "EACCES",
            ErrorCategory::Permission,
            Severity::Error,
            true,
            "permission denied",
            OpContext::new("/data/locked.txt", SyncAction::Delete),
            Some("Permission denied (os error 13)".to_string()),
            Some(13),
        )
    }

    #[test]
    fn test_category_display() {
        assert_eq!(ErrorCategory::DiskSpace.to_string(), "disk_space");
        assert_eq!(ErrorCategory::Unknown.to_string(), "unknown");
    }

    #[test]
    fn test_category_all_is_exhaustive() {
        assert_eq!(ErrorCategory::ALL.len(), 9);
        let mut seen = std::collections::HashSet::new();
        for cat in ErrorCategory::ALL {
            assert!(seen.insert(cat), "duplicate category {cat}");
        }
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Warning < Severity::Error);
        assert!(Severity::Error < Severity::Fatal);
        assert!(Severity::Fatal.is_fatal());
        assert!(!Severity::Error.is_fatal());
    }

    #[test]
    fn test_sync_error_accessors() {
        let err = sample_error();
        assert_eq!(err.code(), "EACCES");
        assert_eq!(err.category(), ErrorCategory::Permission);
        assert_eq!(err.severity(), Severity::Error);
        assert!(err.retryable());
        assert_eq!(err.os_code(), Some(13));
        assert_eq!(err.context().attempt(), 1);
    }

    #[test]
    fn test_next_attempt_preserves_original() {
        let first = sample_error();
        let second = first.next_attempt();

        assert_eq!(first.context().attempt(), 1);
        assert_eq!(second.context().attempt(), 2);
        assert_eq!(first.key(), second.key());
        assert_eq!(second.code(), "EACCES");
    }

    #[test]
    fn test_display_carries_context() {
        let err = sample_error();
        let rendered = err.to_string();
        assert!(rendered.contains("permission"));
        assert!(rendered.contains("/data/locked.txt"));
        assert!(rendered.contains("attempt 1"));
    }

    #[test]
    fn test_serde_round_trip() {
        let err = sample_error();
        let json = serde_json::to_string(&err).unwrap();
        let back: SyncError = serde_json::from_str(&json).unwrap();
        assert_eq!(back.code(), err.code());
        assert_eq!(back.category(), err.category());
        assert_eq!(back.key(), err.key());
    }
}
