//! Validator port definition
//!
//! Every validator (API key, OAuth token, signature, profile, usage limit,
//! or a generic HTTP sub-request) implements [`ValidatorPort`]. A validator
//! must never fail with an error: every internal fault is folded into a
//! status-bearing [`ValidationOutcome`].

use std::collections::BTreeMap;

use async_trait::async_trait;
use domain::{ValidationOutcome, ValidatorSpec};
#[cfg(test)]
use mockall::automock;

use crate::RequestContext;

/// Read-only view of the incoming request handed to validators
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationRequest {
    method: String,
    uri: String,
    headers: BTreeMap<String, String>,
    preflight: bool,
}

impl ValidationRequest {
    /// Create a request view
    #[must_use]
    pub fn new(method: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            uri: uri.into(),
            headers: BTreeMap::new(),
            preflight: false,
        }
    }

    /// Add a header; names are stored lowercase
    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// Mark the request as a CORS preflight, exempting it from validation
    #[must_use]
    pub const fn with_preflight(mut self, preflight: bool) -> Self {
        self.preflight = preflight;
        self
    }

    /// HTTP method
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Path and query
    #[must_use]
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Path without the query string
    #[must_use]
    pub fn path(&self) -> &str {
        self.uri.split_once('?').map_or(self.uri.as_str(), |(p, _)| p)
    }

    /// Get a header value (case-insensitive)
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// All headers, lowercase names
    #[must_use]
    pub const fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    /// Whether this is a CORS preflight request
    #[must_use]
    pub const fn is_preflight(&self) -> bool {
        self.preflight
    }
}

/// Contract implemented by every validator
///
/// `context` is the cumulative context of all previous order groups. The
/// validator contributes variables through
/// [`ValidationOutcome::context_vars`]; they become visible only after the
/// whole group succeeded.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ValidatorPort: Send + Sync {
    /// Validate a request against one policy entry
    async fn validate(
        &self,
        spec: &ValidatorSpec,
        request: &ValidationRequest,
        context: &RequestContext,
    ) -> ValidationOutcome;
}
