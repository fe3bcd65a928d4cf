//! Error types for filesync
//!
//! Library code returns [`SyncError`]; the binaries wrap it in `anyhow` for
//! reporting.

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while synchronizing two directory trees
#[derive(Debug, Error)]
pub enum SyncError {
    /// Generic filesystem failure (message names the path involved)
    #[error("Filesystem error: {0}")]
    FileSystem(String),

    /// A sync root is missing or is not a directory
    #[error("Invalid sync root {}: {reason}", path.display())]
    InvalidRoot {
        /// The offending root path
        path: PathBuf,
        /// Why it was rejected
        reason: String,
    },

    /// The `.sync_log` file could not be read, parsed or written
    #[error("Sync log error in {}: {message}", path.display())]
    SyncLog {
        /// Path of the log file
        path: PathBuf,
        /// What went wrong
        message: String,
    },

    /// Copying one entry to the other tree failed
    #[error("Copy failed: {0}")]
    CopyFailed(String),

    /// Reading a conflict decision from the user failed
    #[error("Prompt error: {0}")]
    Prompt(String),
}

/// Result alias used throughout the library
pub type Result<T> = std::result::Result<T, SyncError>;
