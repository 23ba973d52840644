//! WSLSync Core - Domain types and configuration
//!
//! This crate contains the shared vocabulary of the synchronizer:
//! - **Operation types** - `SyncAction`, `OpContext`, `OpKey`
//! - **Classified errors** - `ErrorCategory`, `Severity`, `SyncError`
//! - **Configuration** - typed YAML config with retry and logging sections
//!
//! The types here are deliberately free of engine logic: classification,
//! retry policy, and aggregation live in `wslsync-recovery`, the driver in
//! `wslsync-sync`. Everything downstream speaks in terms of this crate.

pub mod config;
pub mod domain;
