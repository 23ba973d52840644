//! Operation vocabulary
//!
//! Every failure handed to the recovery engine carries an [`OpContext`]:
//! the path being acted on, the kind of action, and the attempt number.
//! Retries of the same logical operation share an [`OpKey`] so per-operation
//! state accumulates across attempts.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Kind of file-level action the synchronizer was performing when it failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncAction {
    /// Copying file content between the two filesystems
    Copy,
    /// Removing a file or directory
    Delete,
    /// Creating a directory
    Mkdir,
    /// Reading metadata (size, mtime, type)
    Stat,
    /// Reading the configuration file at startup
    ConfigRead,
}

impl SyncAction {
    /// Returns the action name as used in logs and reports
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncAction::Copy => "copy",
            SyncAction::Delete => "delete",
            SyncAction::Mkdir => "mkdir",
            SyncAction::Stat => "stat",
            SyncAction::ConfigRead => "config_read",
        }
    }
}

impl fmt::Display for SyncAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stable identifier of one logical operation (path + action)
///
/// Retries of the same operation produce the same key, so the retry
/// coordinator can accumulate attempt counts and the reporter can keep
/// only the most recent error per operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OpKey {
    path: PathBuf,
    action: SyncAction,
}

impl OpKey {
    /// Creates a key for the given path and action
    pub fn new(path: impl Into<PathBuf>, action: SyncAction) -> Self {
        Self {
            path: path.into(),
            action,
        }
    }

    /// Returns the path component
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Returns the action component
    pub fn action(&self) -> SyncAction {
        self.action
    }
}

impl fmt::Display for OpKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.action, self.path.display())
    }
}

/// Context describing one attempt of one file-level operation
///
/// Attempt numbers are 1-based: the first try is attempt 1. A retry does
/// not mutate the context; callers construct a fresh context via
/// [`next_attempt`](OpContext::next_attempt).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpContext {
    path: PathBuf,
    action: SyncAction,
    attempt: u32,
}

impl OpContext {
    /// Creates a first-attempt context for the given path and action
    pub fn new(path: impl Into<PathBuf>, action: SyncAction) -> Self {
        Self {
            path: path.into(),
            action,
            attempt: 1,
        }
    }

    /// Returns the path being operated on
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Returns the action being performed
    pub fn action(&self) -> SyncAction {
        self.action
    }

    /// Returns the 1-based attempt number
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Returns the stable key identifying this logical operation
    pub fn key(&self) -> OpKey {
        OpKey::new(self.path.clone(), self.action)
    }

    /// Returns a new context for the next attempt of the same operation
    pub fn next_attempt(&self) -> Self {
        Self {
            path: self.path.clone(),
            action: self.action,
            attempt: self.attempt + 1,
        }
    }
}

impl fmt::Display for OpContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} (attempt {})",
            self.action,
            self.path.display(),
            self.attempt
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_display() {
        assert_eq!(SyncAction::Copy.to_string(), "copy");
        assert_eq!(SyncAction::Delete.to_string(), "delete");
        assert_eq!(SyncAction::Mkdir.to_string(), "mkdir");
        assert_eq!(SyncAction::Stat.to_string(), "stat");
        assert_eq!(SyncAction::ConfigRead.to_string(), "config_read");
    }

    #[test]
    fn test_op_key_equality_across_attempts() {
        let first = OpContext::new("/data/a.txt", SyncAction::Copy);
        let second = first.next_attempt();

        assert_eq!(first.key(), second.key());
        assert_eq!(second.attempt(), 2);
        assert_eq!(first.attempt(), 1); // original untouched
    }

    #[test]
    fn test_op_key_distinguishes_actions() {
        let copy = OpKey::new("/data/a.txt", SyncAction::Copy);
        let delete = OpKey::new("/data/a.txt", SyncAction::Delete);
        assert_ne!(copy, delete);
    }

    #[test]
    fn test_op_key_display() {
        let key = OpKey::new("/data/a.txt", SyncAction::Delete);
        assert_eq!(key.to_string(), "delete:/data/a.txt");
    }

    #[test]
    fn test_context_display_includes_attempt() {
        let ctx = OpContext::new("/data/a.txt", SyncAction::Copy).next_attempt();
        assert_eq!(ctx.to_string(), "copy /data/a.txt (attempt 2)");
    }
}
