//! Per-entity business failures reported by a save.

use crate::tracking::{AnyTracked, Trackable, Tracked};
use std::fmt;

/// Why an entity change could not be persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityOperationErrorCode {
    /// Cause not known.
    Unknown,
    /// Generic failure reported by the store.
    GenericError,
    /// An added entity already exists in the store.
    EntityAlreadyExists,
    /// An updated or deleted entity does not exist in the store.
    EntityDoesNotExist,
    /// The change was valid but another change of the same transaction failed.
    FailedBecauseOfTransaction,
}

impl fmt::Display for EntityOperationErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Unknown => "unknown error",
            Self::GenericError => "generic error",
            Self::EntityAlreadyExists => "entity already exists",
            Self::EntityDoesNotExist => "entity does not exist",
            Self::FailedBecauseOfTransaction => "failed because of transaction",
        };
        f.write_str(text)
    }
}

/// A failed entity change.
///
/// Produced only during a save and never persisted.
#[derive(Debug, Clone)]
pub struct EntityOperationFailure {
    entity: AnyTracked,
    error_code: EntityOperationErrorCode,
    message: Option<String>,
}

impl EntityOperationFailure {
    /// Creates a failure without a message.
    #[must_use]
    pub fn new(entity: AnyTracked, error_code: EntityOperationErrorCode) -> Self {
        Self {
            entity,
            error_code,
            message: None,
        }
    }

    /// Attaches a human-readable message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Returns the failed instance.
    #[must_use]
    pub fn entity(&self) -> &AnyTracked {
        &self.entity
    }

    /// Returns the error code.
    #[must_use]
    pub fn error_code(&self) -> EntityOperationErrorCode {
        self.error_code
    }

    /// Returns the message, if any.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Returns true if this failure belongs to `tracked`.
    #[must_use]
    pub fn is_for<T: Trackable>(&self, tracked: &Tracked<T>) -> bool {
        self.entity.is(tracked)
    }
}

impl fmt::Display for EntityOperationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.error_code, self.entity.type_name())?;
        if let Some(message) = &self.message {
            write!(f, ": {message}")?;
        }
        Ok(())
    }
}
