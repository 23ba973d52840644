//! Error catalog - static mapping from raw error codes to classification
//!
//! The catalog maps errno mnemonics (and recognized network failure names)
//! to a semantic category, default severity, and default retryability. It is
//! built once at process start and read-only afterwards; lookups are pure
//! and constant-time. Codes absent from the catalog are not an error: the
//! classifier falls back to heuristics for those.

use std::collections::HashMap;

use tracing::warn;

use wslsync_core::domain::{ErrorCategory, Severity};

/// One immutable catalog record for a raw error code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogEntry {
    /// Normalized raw code, e.g. `"EACCES"`
    pub code: &'static str,
    /// Semantic category the code maps to
    pub category: ErrorCategory,
    /// Whether policy permits automatic retry by default
    pub default_retryable: bool,
    /// Severity assigned when no context overrides it
    pub default_severity: Severity,
}

impl CatalogEntry {
    const fn new(
        code: &'static str,
        category: ErrorCategory,
        default_retryable: bool,
        default_severity: Severity,
    ) -> Self {
        Self {
            code,
            category,
            default_retryable,
            default_severity,
        }
    }
}

/// Built-in entries covering the failure modes seen when syncing between a
/// Linux subsystem and a Windows host (NTFS permissions, locked files,
/// case-insensitive collisions, SMB mounts dropping, disk exhaustion).
const BUILTIN_ENTRIES: &[CatalogEntry] = &[
    // Permission: denied outright, or transiently locked by another process
    CatalogEntry::new("EACCES", ErrorCategory::Permission, true, Severity::Error),
    CatalogEntry::new("EPERM", ErrorCategory::Permission, true, Severity::Error),
    CatalogEntry::new("EBUSY", ErrorCategory::Permission, true, Severity::Error),
    CatalogEntry::new("ETXTBSY", ErrorCategory::Permission, true, Severity::Error),
    // Path: missing, malformed, or unrepresentable on the other side
    CatalogEntry::new("ENOENT", ErrorCategory::Path, true, Severity::Error),
    CatalogEntry::new("ENOTDIR", ErrorCategory::Path, true, Severity::Error),
    CatalogEntry::new("ENAMETOOLONG", ErrorCategory::Path, false, Severity::Error),
    CatalogEntry::new("ELOOP", ErrorCategory::Path, false, Severity::Error),
    CatalogEntry::new("EINVAL", ErrorCategory::Path, false, Severity::Error),
    // Disk space
    CatalogEntry::new("ENOSPC", ErrorCategory::DiskSpace, true, Severity::Error),
    CatalogEntry::new("EDQUOT", ErrorCategory::DiskSpace, true, Severity::Error),
    // Network: timeouts, refused/reset connections, dropped network mounts
    CatalogEntry::new("ETIMEDOUT", ErrorCategory::Network, true, Severity::Error),
    CatalogEntry::new(
        "ECONNREFUSED",
        ErrorCategory::Network,
        true,
        Severity::Error,
    ),
    CatalogEntry::new("ECONNRESET", ErrorCategory::Network, true, Severity::Error),
    CatalogEntry::new(
        "EHOSTUNREACH",
        ErrorCategory::Network,
        true,
        Severity::Error,
    ),
    CatalogEntry::new("ENETUNREACH", ErrorCategory::Network, true, Severity::Error),
    CatalogEntry::new("ESTALE", ErrorCategory::Network, true, Severity::Error),
    // Conflict: the destination already has something under that name
    CatalogEntry::new("EEXIST", ErrorCategory::Conflict, false, Severity::Warning),
    // System: the filesystem itself is unusable
    CatalogEntry::new("EROFS", ErrorCategory::System, false, Severity::Fatal),
    CatalogEntry::new("EIO", ErrorCategory::System, false, Severity::Error),
    CatalogEntry::new("EMFILE", ErrorCategory::System, false, Severity::Error),
];

/// Immutable code → entry mapping, built once and shared by reference
///
/// Not a process-wide singleton: tests construct smaller catalogs via
/// [`from_entries`](ErrorCatalog::from_entries) and hand them to the
/// classifier directly.
#[derive(Debug, Clone)]
pub struct ErrorCatalog {
    entries: HashMap<&'static str, CatalogEntry>,
}

impl ErrorCatalog {
    /// Builds the catalog with the built-in entry set
    pub fn builtin() -> Self {
        Self::from_entries(BUILTIN_ENTRIES)
    }

    /// Builds a catalog from an explicit entry list
    ///
    /// Duplicate codes violate the uniqueness invariant; later duplicates
    /// are skipped with a warning rather than silently replacing earlier
    /// entries.
    pub fn from_entries(entries: &[CatalogEntry]) -> Self {
        let mut map = HashMap::with_capacity(entries.len());
        for entry in entries {
            if map.contains_key(entry.code) {
                warn!(code = entry.code, "Skipping duplicate catalog entry");
                continue;
            }
            map.insert(entry.code, *entry);
        }
        Self { entries: map }
    }

    /// Looks up a raw code, returning `None` for unlisted codes
    ///
    /// Absence is a valid, expected result that callers handle by falling
    /// back to heuristic classification.
    pub fn lookup(&self, code: &str) -> Option<&CatalogEntry> {
        self.entries.get(code)
    }

    /// Returns the number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the catalog has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
