//! Local filesystem operations for the mirror driver
//!
//! Thin async wrappers over `tokio::fs` that surface the raw `io::Error`
//! untouched: classification belongs to the recovery engine, not here.
//! Copies go through a temp file + rename so a crash mid-copy never leaves
//! a truncated destination behind.

use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::{debug, instrument};

/// Metadata subset the planner compares to decide whether a copy is needed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryMeta {
    pub is_dir: bool,
    pub len: u64,
    pub modified: Option<SystemTime>,
}

/// Filesystem adapter for the mirror driver
///
/// Zero-sized: all context comes from the path arguments.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

impl LocalFs {
    /// Create a new adapter
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Reads the metadata subset for a path
    #[instrument(skip(self), level = "debug")]
    pub async fn stat(&self, path: &Path) -> io::Result<EntryMeta> {
        let meta = tokio::fs::metadata(path).await?;
        Ok(EntryMeta {
            is_dir: meta.is_dir(),
            len: meta.len(),
            modified: meta.modified().ok(),
        })
    }

    /// Copies `src` to `dest` atomically (temp file + rename)
    #[instrument(skip(self), level = "debug")]
    pub async fn copy_file(&self, src: &Path, dest: &Path) -> io::Result<u64> {
        let tmp = temp_sibling(dest);
        let bytes = match tokio::fs::copy(src, &tmp).await {
            Ok(bytes) => bytes,
            Err(e) => {
                // Leave no temp droppings on a failed copy
                let _ = tokio::fs::remove_file(&tmp).await;
                return Err(e);
            }
        };
        if let Err(e) = tokio::fs::rename(&tmp, dest).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e);
        }
        debug!(src = %src.display(), dest = %dest.display(), bytes, "Copied file");
        Ok(bytes)
    }

    /// Creates a directory, tolerating it already existing
    #[instrument(skip(self), level = "debug")]
    pub async fn make_dir(&self, path: &Path) -> io::Result<()> {
        match tokio::fs::create_dir(path).await {
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                // A pre-existing directory is a satisfied mkdir
                let meta = tokio::fs::metadata(path).await?;
                if meta.is_dir() {
                    Ok(())
                } else {
                    Err(e)
                }
            }
            other => other,
        }
    }

    /// Creates a directory and any missing parents
    #[instrument(skip(self), level = "debug")]
    pub async fn make_dir_all(&self, path: &Path) -> io::Result<()> {
        tokio::fs::create_dir_all(path).await
    }

    /// Removes a file or an entire directory tree
    #[instrument(skip(self), level = "debug")]
    pub async fn remove(&self, path: &Path) -> io::Result<()> {
        let meta = tokio::fs::symlink_metadata(path).await?;
        if meta.is_dir() {
            tokio::fs::remove_dir_all(path).await
        } else {
            tokio::fs::remove_file(path).await
        }
    }
}

/// Sibling temp path used for atomic copies
fn temp_sibling(dest: &Path) -> PathBuf {
    let mut name = dest
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".wslsync-tmp");
    dest.with_file_name(name)
}

/// Returns true if the source entry needs copying over the destination
///
/// A destination that is missing, differs in size, or is older than the
/// source gets recopied. Equal mtimes are treated as up to date.
pub fn needs_copy(src: &EntryMeta, dest: Option<&EntryMeta>) -> bool {
    match dest {
        None => true,
        Some(dest) => {
            if dest.is_dir != src.is_dir || dest.len != src.len {
                return true;
            }
            match (src.modified, dest.modified) {
                (Some(s), Some(d)) => d < s,
                // Without usable mtimes, err on the side of copying
                _ => true,
            }
        }
    }
}
