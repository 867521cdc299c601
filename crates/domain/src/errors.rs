//! Domain-level errors

use thiserror::Error;

/// Errors that can occur in the domain layer
///
/// Every variant is a load-time configuration fault. Per-request validation
/// failures are modelled as [`crate::ValidationOutcome`] values, never as errors.
#[derive(Debug, Error)]
pub enum DomainError {
    /// Malformed validation policy or validator directive
    #[error("Invalid validation policy: {0}")]
    InvalidPolicy(String),

    /// Malformed response override document
    #[error("Invalid response overrides: {0}")]
    InvalidOverrides(String),

    /// Error code that is not a positive integer
    #[error("Invalid error code: {0}")]
    InvalidErrorCode(String),
}

impl DomainError {
    /// Create a policy error for a named validator
    pub fn policy(validator: impl AsRef<str>, reason: impl AsRef<str>) -> Self {
        Self::InvalidPolicy(format!("{}: {}", validator.as_ref(), reason.as_ref()))
    }
}
