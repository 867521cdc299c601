//! Validation outcome - the result of running a single validator

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::value_objects::ErrorCode;

/// HTTP-style status signalling success
pub const STATUS_OK: u16 = 200;

/// Status used when a validator could not produce an answer
pub const STATUS_UNKNOWN_ERROR: u16 = 503;

/// Result of one validator run
///
/// `status == 200` is the sole success condition. Any other status is a
/// failure, whether or not an error code is present.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ValidationOutcome {
    /// HTTP-style status code
    pub status: u16,
    /// Domain-specific error code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<ErrorCode>,
    /// Optional payload produced by the validator
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// Variables the validator contributes to the request context
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub context_vars: BTreeMap<String, String>,
}

impl ValidationOutcome {
    /// Plain success
    #[must_use]
    pub fn success() -> Self {
        Self {
            status: STATUS_OK,
            ..Self::default()
        }
    }

    /// Success carrying context variables
    #[must_use]
    pub fn success_with(context_vars: BTreeMap<String, String>) -> Self {
        Self {
            status: STATUS_OK,
            context_vars,
            ..Self::default()
        }
    }

    /// Failure with a status and an error code
    #[must_use]
    pub fn failure(status: u16, error_code: ErrorCode) -> Self {
        Self {
            status,
            error_code: Some(error_code),
            ..Self::default()
        }
    }

    /// Failure identified only by its status and optional body
    #[must_use]
    pub fn raw_failure(status: u16, body: Option<String>) -> Self {
        Self {
            status,
            body,
            ..Self::default()
        }
    }

    /// Generic failure for unreachable, timed-out or misbehaving validators
    #[must_use]
    pub fn unknown_error() -> Self {
        Self::failure(STATUS_UNKNOWN_ERROR, ErrorCode::UNKNOWN_ERROR)
    }

    /// Whether this outcome approves the request
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status == STATUS_OK
    }

    /// Attach a context variable
    #[must_use]
    pub fn with_var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.context_vars.insert(name.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_200_is_success() {
        assert!(ValidationOutcome::success().is_success());
        assert!(!ValidationOutcome::raw_failure(201, None).is_success());
        assert!(!ValidationOutcome::raw_failure(403, None).is_success());
    }

    #[test]
    fn error_code_does_not_affect_success() {
        let outcome = ValidationOutcome {
            status: 200,
            error_code: Some(ErrorCode::INVALID_KEY),
            ..ValidationOutcome::default()
        };
        assert!(outcome.is_success());
    }

    #[test]
    fn unknown_error_is_503() {
        let outcome = ValidationOutcome::unknown_error();
        assert_eq!(outcome.status, 503);
        assert_eq!(outcome.error_code, Some(ErrorCode::UNKNOWN_ERROR));
    }

    #[test]
    fn with_var_collects_context() {
        let outcome = ValidationOutcome::success()
            .with_var("user_email", "a@b.c")
            .with_var("user_region", "NA");
        assert_eq!(outcome.context_vars.len(), 2);
        assert_eq!(outcome.context_vars["user_region"], "NA");
    }
}
