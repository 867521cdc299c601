//! Request context carrying validator-produced variables
//!
//! A `RequestContext` lives for exactly one request. Validators in one order
//! group read it; their contributions are merged only after the whole group
//! succeeded, so later groups, the response decorator and the backend
//! forwarder observe the cumulative result.
//!
//! # Examples
//!
//! ```
//! use application::RequestContext;
//!
//! let mut ctx = RequestContext::new();
//! ctx.set("user_region", "EMEA");
//!
//! assert_eq!(ctx.get("user_region"), Some("EMEA"));
//! assert_eq!(ctx.get("request_id"), Some(ctx.request_id().to_string().as_str()));
//! ```

use std::collections::BTreeMap;

use domain::REQUEST_ID_VAR;
use tracing::warn;
use uuid::Uuid;

/// Per-request variable bag
#[derive(Debug, Clone)]
pub struct RequestContext {
    request_id: Uuid,
    vars: BTreeMap<String, String>,
}

impl RequestContext {
    /// Create a context with a fresh request id
    #[must_use]
    pub fn new() -> Self {
        Self::with_request_id(Uuid::new_v4())
    }

    /// Create a context for a known request id
    ///
    /// The id is also exposed as the `request_id` variable.
    #[must_use]
    pub fn with_request_id(request_id: Uuid) -> Self {
        let vars = BTreeMap::from([(REQUEST_ID_VAR.to_string(), request_id.to_string())]);
        Self { request_id, vars }
    }

    /// Get the unique request identifier
    #[must_use]
    pub const fn request_id(&self) -> Uuid {
        self.request_id
    }

    /// Read a variable
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// Write a variable, replacing any previous value
    ///
    /// The `request_id` variable is fixed at construction; writes to it are
    /// ignored.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        if name == REQUEST_ID_VAR {
            warn!("Ignoring write to reserved request_id variable");
            return;
        }
        self.vars.insert(name, value.into());
    }

    /// Merge a set of variables, later values win
    ///
    /// A `request_id` entry is dropped.
    pub fn merge(&mut self, vars: impl IntoIterator<Item = (String, String)>) {
        for (name, value) in vars {
            self.set(name, value);
        }
    }

    /// All variables, sorted by name
    #[must_use]
    pub const fn vars(&self) -> &BTreeMap<String, String> {
        &self.vars
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_creates_unique_request_id() {
        let ctx1 = RequestContext::new();
        let ctx2 = RequestContext::new();

        assert_ne!(ctx1.request_id(), ctx2.request_id());
    }

    #[test]
    fn with_request_id_exposes_variable() {
        let request_id = Uuid::new_v4();
        let ctx = RequestContext::with_request_id(request_id);

        assert_eq!(ctx.request_id(), request_id);
        assert_eq!(ctx.get(REQUEST_ID_VAR), Some(request_id.to_string().as_str()));
    }

    #[test]
    fn set_replaces_value() {
        let mut ctx = RequestContext::new();
        ctx.set("a", "1");
        ctx.set("a", "2");

        assert_eq!(ctx.get("a"), Some("2"));
    }

    #[test]
    fn merge_is_cumulative() {
        let mut ctx = RequestContext::new();
        ctx.merge([("a".to_string(), "1".to_string())]);
        ctx.merge([
            ("b".to_string(), "2".to_string()),
            ("a".to_string(), "3".to_string()),
        ]);

        assert_eq!(ctx.get("a"), Some("3"));
        assert_eq!(ctx.get("b"), Some("2"));
    }

    #[test]
    fn request_id_variable_cannot_be_replaced() {
        let request_id = Uuid::new_v4();
        let mut ctx = RequestContext::with_request_id(request_id);

        ctx.merge([
            (REQUEST_ID_VAR.to_string(), "spoofed".to_string()),
            ("tenant".to_string(), "acme".to_string()),
        ]);
        ctx.set(REQUEST_ID_VAR, "spoofed");

        assert_eq!(ctx.get(REQUEST_ID_VAR), Some(request_id.to_string().as_str()));
        assert_eq!(ctx.get("tenant"), Some("acme"));
    }

    #[test]
    fn missing_variable_is_none() {
        assert!(RequestContext::new().get("nope").is_none());
    }
}
