//! Application-level errors

use domain::DomainError;
use thiserror::Error;

/// Errors that can occur in the application layer
///
/// These never reach the client directly: validators fold them into a
/// [`domain::ValidationOutcome`] and only configuration loading may abort.
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// Domain-level error
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// External service error (sub-request or profile upstream)
    #[error("External service error: {0}")]
    ExternalService(String),

    /// Cache store error
    #[error("Cache error: {0}")]
    Cache(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApplicationError {
    /// Check if this error is fatal at load time
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            ApplicationError::Domain(_) | ApplicationError::Configuration(_)
        )
    }
}
