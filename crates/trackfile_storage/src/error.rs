//! Error types for storage operations.

use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Another handle currently holds a conflicting OS lock on the file.
    #[error("file is locked by another handle: {}", path.display())]
    LockContended {
        /// The contended file.
        path: PathBuf,
    },

    /// The OS lock could not be acquired before the timeout elapsed.
    #[error("timeout after {timeout:?} while trying to acquire file lock for '{}'", path.display())]
    LockTimeout {
        /// The file that could not be locked.
        path: PathBuf,
        /// The configured timeout.
        timeout: Duration,
    },
}

impl StorageError {
    /// Creates a lock contended error.
    pub fn lock_contended(path: impl Into<PathBuf>) -> Self {
        Self::LockContended { path: path.into() }
    }

    /// Returns true if this error reports a contended OS lock.
    #[must_use]
    pub fn is_contended(&self) -> bool {
        matches!(self, Self::LockContended { .. })
    }
}
