//! Response rules mapping validation error codes to client responses
//!
//! The default table covers every documented error family. A user override
//! document is merged over it once, producing a new immutable table:
//! user rules win on collision, every other default rule is kept.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    errors::DomainError,
    value_objects::{ErrorCode, ValueTemplate},
};

/// Context variable holding the request id
pub const REQUEST_ID_VAR: &str = "request_id";

/// Client-facing response for one error code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseRule {
    /// Status sent to the client, authoritative over the validator's status
    pub http_status: u16,
    /// Code this rule answers for
    pub error_code: ErrorCode,
    /// Response body
    pub message: String,
    /// Header name to value template
    #[serde(default)]
    pub headers: BTreeMap<String, ValueTemplate>,
}

impl ResponseRule {
    /// Build a rule with the standard JSON error body and headers
    #[must_use]
    pub fn standard(http_status: u16, error_code: ErrorCode, message: &str) -> Self {
        let body = serde_json::json!({
            "error_code": error_code.to_string(),
            "message": message,
        });
        Self {
            http_status,
            error_code,
            message: body.to_string(),
            headers: standard_headers(),
        }
    }
}

fn standard_headers() -> BTreeMap<String, ValueTemplate> {
    BTreeMap::from([
        (
            "Content-Type".to_string(),
            ValueTemplate::literal("application/json"),
        ),
        (
            "X-Request-Id".to_string(),
            ValueTemplate::variable(REQUEST_ID_VAR),
        ),
    ])
}

const DEFAULT_RULES: &[(ErrorCode, u16, &str)] = &[
    (ErrorCode::MISSING_KEY, 403, "Api Key is required"),
    (ErrorCode::INVALID_KEY, 403, "Api Key is invalid"),
    (ErrorCode::KEY_UNKNOWN_ERROR, 503, "Could not validate API Key"),
    (ErrorCode::MISSING_TOKEN, 403, "Oauth token is missing"),
    (ErrorCode::SCOPE_MISMATCH, 403, "Scope mismatch"),
    (ErrorCode::INVALID_TOKEN, 401, "Oauth token is not valid"),
    (
        ErrorCode::TOKEN_UNKNOWN_ERROR,
        503,
        "Could not validate the oauth token",
    ),
    (
        ErrorCode::PROFILE_MISSING_TOKEN,
        403,
        "Oauth token is missing or invalid",
    ),
    (ErrorCode::INVALID_PROFILE, 403, "Profile is not valid"),
    (ErrorCode::NOT_ALLOWED, 403, "Not allowed to read the profile"),
    (
        ErrorCode::PROFILE_UNKNOWN_ERROR,
        503,
        "Could not read the profile",
    ),
    (ErrorCode::MISSING_SIGNATURE, 403, "Signature is missing"),
    (ErrorCode::INVALID_SIGNATURE, 403, "Signature is invalid"),
    (
        ErrorCode::SIGNATURE_UNKNOWN_ERROR,
        503,
        "Could not validate Signature",
    ),
    (ErrorCode::INVALID_LINK, 403, "Link is invalid"),
    (ErrorCode::EXPIRED_LINK, 403, "Link has expired"),
    (ErrorCode::RATE_LIMIT_EXCEEDED, 429, "Rate limit exceeded"),
    (ErrorCode::USAGE_LIMIT_EXCEEDED, 429, "Usage limit exceeded"),
    (ErrorCode::UNKNOWN_ERROR, 503, "Could not validate the request"),
];

/// Immutable error code to response rule mapping
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResponseTable {
    rules: BTreeMap<ErrorCode, ResponseRule>,
}

impl ResponseTable {
    /// Table with the built-in rules for every documented error family
    #[must_use]
    pub fn defaults() -> Self {
        let rules = DEFAULT_RULES
            .iter()
            .map(|&(code, status, message)| (code, ResponseRule::standard(status, code, message)))
            .collect();
        Self { rules }
    }

    /// Table containing exactly the given rules
    #[must_use]
    pub fn from_rules(rules: impl IntoIterator<Item = ResponseRule>) -> Self {
        Self {
            rules: rules.into_iter().map(|r| (r.error_code, r)).collect(),
        }
    }

    /// Look up the rule for an error code
    #[must_use]
    pub fn get(&self, code: ErrorCode) -> Option<&ResponseRule> {
        self.rules.get(&code)
    }

    /// Number of rules
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the table has no rules
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Codes covered by this table, ascending
    pub fn codes(&self) -> impl Iterator<Item = ErrorCode> + '_ {
        self.rules.keys().copied()
    }

    /// Merge user rules over this table
    ///
    /// Every code the document defines takes the user's rule; every other
    /// code keeps this table's rule.
    #[must_use]
    pub fn with_overrides(&self, overrides: &OverrideDocument) -> Self {
        let mut rules = self.rules.clone();
        for rule in &overrides.rules {
            rules.insert(rule.error_code, rule.clone());
        }
        Self { rules }
    }
}

/// Parsed user override document
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OverrideDocument {
    rules: Vec<ResponseRule>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawOverride {
    #[serde(default)]
    error_code: Option<ErrorCode>,
    http_status: u16,
    message: Value,
    #[serde(default)]
    headers: BTreeMap<String, ValueTemplate>,
}

impl OverrideDocument {
    /// Parse a JSON override document
    ///
    /// The document is an object whose keys are error codes (or arbitrary
    /// labels when the entry carries its own `error_code`). Each entry has an
    /// `http_status`, a `message` (string, or any JSON value which is emitted
    /// compactly) and optional `headers`.
    ///
    /// ```
    /// use domain::{ErrorCode, OverrideDocument};
    ///
    /// let doc = OverrideDocument::from_json(
    ///     r#"{"403010": {"http_status": 401, "message": "token please"}}"#,
    /// ).unwrap();
    /// assert_eq!(doc.rules()[0].error_code, ErrorCode::MISSING_TOKEN);
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidOverrides`] when the document is not a
    /// JSON object, an entry is malformed, a code cannot be determined, or a
    /// status is outside `100..=599`.
    pub fn from_json(json: &str) -> Result<Self, DomainError> {
        let raw: BTreeMap<String, RawOverride> = serde_json::from_str(json)
            .map_err(|e| DomainError::InvalidOverrides(e.to_string()))?;

        let mut rules = Vec::with_capacity(raw.len());
        for (key, entry) in raw {
            let error_code = match entry.error_code {
                Some(code) => code,
                None => key.parse().map_err(|_| {
                    DomainError::InvalidOverrides(format!(
                        "entry '{key}' has no error_code and its key is not a code"
                    ))
                })?,
            };
            if !(100..=599).contains(&entry.http_status) {
                return Err(DomainError::InvalidOverrides(format!(
                    "entry '{key}' has invalid http_status {}",
                    entry.http_status
                )));
            }
            let message = match entry.message {
                Value::String(s) => s,
                other => other.to_string(),
            };
            rules.push(ResponseRule {
                http_status: entry.http_status,
                error_code,
                message,
                headers: entry.headers,
            });
        }

        Ok(Self { rules })
    }

    /// Rules defined by the document
    #[must_use]
    pub fn rules(&self) -> &[ResponseRule] {
        &self.rules
    }
}
