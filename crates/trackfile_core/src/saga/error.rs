//! Saga error types.

use thiserror::Error;

/// A type-erased error raised by a saga step.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result type for saga operations.
pub type SagaResult<T> = Result<T, SagaError>;

/// Errors that can occur while building or running a saga.
#[derive(Debug, Error)]
pub enum SagaError {
    /// An operation was added for an entity type with no registered context.
    #[error("entity type {type_name} is not known by this saga")]
    UnknownEntityType {
        /// Name of the entity type.
        type_name: &'static str,
    },

    /// A step failed and the committed steps were compensated.
    #[error("saga failed: {source} ({} rollback errors)", .rollback_errors.len())]
    Failed {
        /// The error of the failed step.
        source: BoxError,
        /// Errors raised while compensating, in rollback order.
        rollback_errors: Vec<BoxError>,
    },
}

impl SagaError {
    /// Returns the compensation errors of a failed saga.
    #[must_use]
    pub fn rollback_errors(&self) -> &[BoxError] {
        match self {
            Self::Failed {
                rollback_errors, ..
            } => rollback_errors,
            Self::UnknownEntityType { .. } => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn failed_keeps_original_cause() {
        let err = SagaError::Failed {
            source: "disk full".into(),
            rollback_errors: vec!["undo failed".into()],
        };

        assert_eq!(err.to_string(), "saga failed: disk full (1 rollback errors)");
        assert_eq!(err.source().unwrap().to_string(), "disk full");
        assert_eq!(err.rollback_errors().len(), 1);
    }

    #[test]
    fn unknown_type_display() {
        let err = SagaError::UnknownEntityType { type_name: "app::Order" };
        assert!(err.to_string().contains("app::Order"));
        assert!(err.rollback_errors().is_empty());
    }
}
