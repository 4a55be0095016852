//! Application-level errors

use domain::DomainError;
use thiserror::Error;

/// Errors that can occur in the application layer
///
/// Provider failures never surface here; they degrade the resolution instead.
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// Domain-level error
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Caller supplied unusable locations
    #[error("Could not resolve meeting point: check input locations ({0})")]
    InvalidInput(String),

    /// Budget state could not be read or written
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApplicationError {
    /// Whether the caller is at fault
    pub const fn is_user_error(&self) -> bool {
        matches!(self, Self::InvalidInput(_))
    }
}
