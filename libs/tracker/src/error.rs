//! Domain error type

use thiserror::Error;
use uuid::Uuid;

/// Failure of a tracker operation
///
/// Every variant is recoverable and maps onto a distinct HTTP status.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TrackerError {
    /// The entity does not exist (or is not visible to the caller)
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: Uuid },

    /// The caller is neither the creator nor an allowed member
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Malformed or out-of-range input
    #[error("Validation failed: {0}")]
    Validation(String),

    /// A uniqueness or capacity rule would be broken
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The storage adapter failed
    #[error("Storage error: {0}")]
    Storage(String),
}

impl TrackerError {
    pub fn not_found(entity: &'static str, id: Uuid) -> Self {
        TrackerError::NotFound { entity, id }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        TrackerError::Forbidden(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        TrackerError::Validation(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        TrackerError::Conflict(message.into())
    }

    pub fn storage(message: impl Into<String>) -> Self {
        TrackerError::Storage(message.into())
    }
}

/// Type alias for tracker results
pub type TrackerResult<T> = Result<T, TrackerError>;
