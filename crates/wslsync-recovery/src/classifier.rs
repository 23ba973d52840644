//! Error classifier - raw failure + operation context → structured SyncError
//!
//! Classification is total and panic-free: a malformed or absent raw error
//! still yields a well-formed `unknown`-category [`SyncError`]. The engine
//! itself must never fail the process.
//!
//! Order of resolution:
//! 1. extract a normalized errno mnemonic from the raw error
//! 2. look it up in the [`ErrorCatalog`]
//! 3. on a miss, run the ordered [`heuristics`](crate::heuristics)
//! 4. otherwise fall back to `unknown` / `error` / not retryable

use std::io;
use std::sync::Arc;

use tracing::trace;

use wslsync_core::domain::{ErrorCategory, OpContext, Severity, SyncError};

use crate::catalog::ErrorCatalog;
use crate::heuristics::{self, Heuristic, HeuristicInput};

/// Code assigned when no mnemonic could be extracted from the raw error
const UNKNOWN_CODE: &str = "UNKNOWN";

/// Maps a Linux errno value to its mnemonic
///
/// Only the codes the synchronizer can meaningfully act on are listed; any
/// other value falls through to heuristic classification.
fn errno_mnemonic(errno: i32) -> Option<&'static str> {
    Some(match errno {
        1 => "EPERM",
        2 => "ENOENT",
        5 => "EIO",
        13 => "EACCES",
        16 => "EBUSY",
        17 => "EEXIST",
        20 => "ENOTDIR",
        22 => "EINVAL",
        24 => "EMFILE",
        26 => "ETXTBSY",
        28 => "ENOSPC",
        30 => "EROFS",
        36 => "ENAMETOOLONG",
        40 => "ELOOP",
        101 => "ENETUNREACH",
        104 => "ECONNRESET",
        110 => "ETIMEDOUT",
        111 => "ECONNREFUSED",
        113 => "EHOSTUNREACH",
        116 => "ESTALE",
        122 => "EDQUOT",
        _ => return None,
    })
}

/// Recognizes network-stack failures that carry no OS error number
fn kind_mnemonic(kind: io::ErrorKind) -> Option<&'static str> {
    Some(match kind {
        io::ErrorKind::TimedOut => "ETIMEDOUT",
        io::ErrorKind::ConnectionRefused => "ECONNREFUSED",
        io::ErrorKind::ConnectionReset => "ECONNRESET",
        io::ErrorKind::ConnectionAborted => "ECONNRESET",
        io::ErrorKind::NotFound => "ENOENT",
        io::ErrorKind::PermissionDenied => "EACCES",
        io::ErrorKind::AlreadyExists => "EEXIST",
        _ => return None,
    })
}

/// Wraps raw failures into structured [`SyncError`]s using a shared catalog
///
/// Referentially transparent: the same raw error and context always produce
/// the same classification (timestamps aside). Construction is the only
/// side effect.
#[derive(Debug, Clone)]
pub struct ErrorClassifier {
    catalog: Arc<ErrorCatalog>,
    heuristics: Vec<Heuristic>,
}

impl ErrorClassifier {
    /// Creates a classifier over the given catalog with the default
    /// heuristic list
    pub fn new(catalog: Arc<ErrorCatalog>) -> Self {
        Self {
            catalog,
            heuristics: heuristics::default_heuristics().to_vec(),
        }
    }

    /// Creates a classifier with an explicit heuristic list (tests)
    pub fn with_heuristics(catalog: Arc<ErrorCatalog>, heuristics: Vec<Heuristic>) -> Self {
        Self {
            catalog,
            heuristics,
        }
    }

    /// Classifies a raw failure under the given operation context
    ///
    /// `raw` is optional because some failure paths surface no underlying
    /// error object; those classify as `unknown` (or via an action-driven
    /// heuristic such as config reads).
    pub fn classify(&self, raw: Option<&io::Error>, ctx: &OpContext) -> SyncError {
        let os_code = raw.and_then(|e| e.raw_os_error());
        let code = os_code
            .and_then(errno_mnemonic)
            .or_else(|| raw.and_then(|e| kind_mnemonic(e.kind())));
        let message = raw
            .map(|e| e.to_string())
            .unwrap_or_else(|| "operation failed without an underlying error".to_string());

        if let Some(code) = code {
            if let Some(entry) = self.catalog.lookup(code) {
                trace!(code, category = %entry.category, %ctx, "Catalog classification");
                return SyncError::new(
                    code,
                    entry.category,
                    entry.default_severity,
                    entry.default_retryable,
                    &message,
                    ctx.clone(),
                    raw.map(|e| e.to_string()),
                    os_code,
                );
            }
        }

        let lowered = message.to_lowercase();
        let input = HeuristicInput {
            message: &lowered,
            action: ctx.action(),
        };
        if let Some(heuristic) = heuristics::apply(&self.heuristics, &input) {
            trace!(
                heuristic = heuristic.name,
                category = %heuristic.category,
                %ctx,
                "Heuristic classification"
            );
            return SyncError::new(
                code.unwrap_or(heuristic.name),
                heuristic.category,
                heuristic.severity,
                heuristic.retryable,
                &message,
                ctx.clone(),
                raw.map(|e| e.to_string()),
                os_code,
            );
        }

        // Fail safe: unknown failures are never silently retried.
        trace!(code = code.unwrap_or(UNKNOWN_CODE), %ctx, "Unclassified failure");
        SyncError::new(
            code.unwrap_or(UNKNOWN_CODE),
            ErrorCategory::Unknown,
            Severity::Error,
            false,
            &message,
            ctx.clone(),
            raw.map(|e| e.to_string()),
            os_code,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wslsync_core::domain::SyncAction;

    fn classifier() -> ErrorClassifier {
        ErrorClassifier::new(Arc::new(ErrorCatalog::builtin()))
    }

    fn ctx(action: SyncAction) -> OpContext {
        OpContext::new("/mnt/c/data/file.txt", action)
    }

    fn os_err(errno: i32) -> io::Error {
        io::Error::from_raw_os_error(errno)
    }

    #[test]
    fn test_catalog_codes_classify_exactly() {
        let classifier = classifier();
        let catalog = ErrorCatalog::builtin();

        for (errno, code) in [
            (13, "EACCES"),
            (1, "EPERM"),
            (2, "ENOENT"),
            (28, "ENOSPC"),
            (110, "ETIMEDOUT"),
            (111, "ECONNREFUSED"),
        ] {
            let err = classifier.classify(Some(&os_err(errno)), &ctx(SyncAction::Copy));
            let entry = catalog.lookup(code).unwrap();
            assert_eq!(err.code(), code);
            assert_eq!(err.category(), entry.category);
            assert_eq!(err.severity(), entry.default_severity);
            assert_eq!(err.retryable(), entry.default_retryable);
        }
    }

    #[test]
    fn test_enospc_on_copy_is_retryable_disk_space() {
        let err = classifier().classify(Some(&os_err(28)), &OpContext::new("/a/b.txt", SyncAction::Copy));
        assert_eq!(err.category(), ErrorCategory::DiskSpace);
        assert_eq!(err.severity(), Severity::Error);
        assert!(err.retryable());
        assert_eq!(err.os_code(), Some(28));
    }

    #[test]
    fn test_network_kind_without_os_code() {
        let raw = io::Error::new(io::ErrorKind::TimedOut, "connection timed out");
        let err = classifier().classify(Some(&raw), &ctx(SyncAction::Stat));
        assert_eq!(err.code(), "ETIMEDOUT");
        assert_eq!(err.category(), ErrorCategory::Network);
        assert!(err.retryable());
        assert_eq!(err.os_code(), None);
    }

    #[test]
    fn test_unlisted_code_falls_back_to_unknown() {
        // ENXIO (6) is not in the catalog and matches no heuristic
        let err = classifier().classify(Some(&os_err(6)), &ctx(SyncAction::Copy));
        assert_eq!(err.category(), ErrorCategory::Unknown);
        assert!(!err.retryable());
        assert_eq!(err.severity(), Severity::Error);
    }

    #[test]
    fn test_missing_raw_error_yields_unknown() {
        let err = classifier().classify(None, &ctx(SyncAction::Copy));
        assert_eq!(err.category(), ErrorCategory::Unknown);
        assert_eq!(err.code(), "UNKNOWN");
        assert!(!err.retryable());
        assert!(err.source_message().is_none());
    }

    #[test]
    fn test_collision_message_heuristic() {
        let raw = io::Error::other("destination 'Report.txt' collides with 'report.txt'");
        let err = classifier().classify(Some(&raw), &ctx(SyncAction::Copy));
        assert_eq!(err.category(), ErrorCategory::Conflict);
        assert_eq!(err.code(), "H_COLLISION");
    }

    #[test]
    fn test_config_read_heuristic() {
        let raw = io::Error::other("unexpected character at line 3");
        let err = classifier().classify(Some(&raw), &ctx(SyncAction::ConfigRead));
        assert_eq!(err.category(), ErrorCategory::Config);
        assert!(!err.retryable());
    }

    #[test]
    fn test_missing_raw_error_on_config_read_is_config() {
        let err = classifier().classify(None, &ctx(SyncAction::ConfigRead));
        assert_eq!(err.category(), ErrorCategory::Config);
    }

    #[test]
    fn test_classification_is_deterministic() {
        let classifier = classifier();
        let context = ctx(SyncAction::Delete);
        let a = classifier.classify(Some(&os_err(13)), &context);
        let b = classifier.classify(Some(&os_err(13)), &context);

        assert_eq!(a.code(), b.code());
        assert_eq!(a.category(), b.category());
        assert_eq!(a.severity(), b.severity());
        assert_eq!(a.retryable(), b.retryable());
    }

    #[test]
    fn test_empty_heuristic_list_falls_through_to_unknown() {
        let classifier =
            ErrorClassifier::with_heuristics(Arc::new(ErrorCatalog::builtin()), Vec::new());

        // A collision message only classifies as conflict via heuristics
        let raw = io::Error::other("destination already exists");
        let err = classifier.classify(Some(&raw), &ctx(SyncAction::Copy));
        assert_eq!(err.category(), ErrorCategory::Unknown);
        assert!(!err.retryable());
    }

    #[test]
    fn test_substituted_catalog_changes_outcome() {
        use crate::catalog::CatalogEntry;

        let tiny = ErrorCatalog::from_entries(&[CatalogEntry {
            code: "EACCES",
            category: ErrorCategory::System,
            default_retryable: false,
            default_severity: Severity::Fatal,
        }]);
        let classifier = ErrorClassifier::new(Arc::new(tiny));

        let err = classifier.classify(Some(&os_err(13)), &ctx(SyncAction::Copy));
        assert_eq!(err.category(), ErrorCategory::System);
        assert!(err.is_fatal());
    }
}
