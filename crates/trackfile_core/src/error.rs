//! Error types for trackfile core.

use crate::uow::EntityOperationFailure;
use std::fmt;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use trackfile_storage::StorageError;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Storage error.
    #[error("storage error: {0}")]
    Storage(StorageError),

    /// Serialization error.
    #[error("codec error: {0}")]
    Codec(#[from] trackfile_codec::CodecError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The OS file lock could not be acquired in time.
    #[error("timeout after {timeout:?} while trying to acquire file lock for '{}'", path.display())]
    LockTimeout {
        /// The file that could not be locked.
        path: PathBuf,
        /// The configured timeout.
        timeout: Duration,
    },

    /// Some entity changes of a save failed.
    #[error(transparent)]
    EntityOperation(#[from] EntityOperationError),

    /// Operation not permitted in current state.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Description of why operation is invalid.
        message: String,
    },

    /// The save was cancelled.
    #[error("operation cancelled")]
    Cancelled,

    /// A blocking file task panicked or was cancelled.
    #[error("background task failed: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

impl CoreError {
    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Returns the entity failures if this is an entity operation error.
    #[must_use]
    pub fn failures(&self) -> Option<&[EntityOperationFailure]> {
        match self {
            Self::EntityOperation(err) => Some(err.failures()),
            _ => None,
        }
    }
}

impl From<StorageError> for CoreError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::LockTimeout { path, timeout } => Self::LockTimeout { path, timeout },
            StorageError::Io(err) => Self::Io(err),
            other => Self::Storage(other),
        }
    }
}

/// Aggregated business failures of one save.
#[derive(Debug, Clone)]
pub struct EntityOperationError {
    failures: Vec<EntityOperationFailure>,
    message: Option<String>,
}

impl EntityOperationError {
    /// Creates an error from the collected failures.
    #[must_use]
    pub fn new(failures: Vec<EntityOperationFailure>) -> Self {
        Self {
            failures,
            message: None,
        }
    }

    /// Attaches a message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Returns the failures.
    #[must_use]
    pub fn failures(&self) -> &[EntityOperationFailure] {
        &self.failures
    }

    /// Consumes the error and returns the failures.
    #[must_use]
    pub fn into_failures(self) -> Vec<EntityOperationFailure> {
        self.failures
    }
}

impl fmt::Display for EntityOperationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(message) => write!(f, "{message}")?,
            None => write!(f, "entity operation failed")?,
        }
        write!(f, " ({} failed", self.failures.len())?;
        if let Some(first) = self.failures.first() {
            write!(f, ", first: {first}")?;
        }
        write!(f, ")")
    }
}

impl std::error::Error for EntityOperationError {}
