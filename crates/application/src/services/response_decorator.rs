//! Response decorator - turns a failed outcome into the client response
//!
//! Lookup order:
//! 1. the effective table's rule for the outcome's error code, whose status
//!    is authoritative;
//! 2. the validator's own status and non-empty body;
//! 3. the bare status with no body.

use std::sync::Arc;

use domain::{OverrideDocument, ResponseTable, ValidationOutcome};
use serde::Serialize;
use tracing::debug;

use crate::RequestContext;

/// Client-visible response produced for a failed validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecoratedResponse {
    /// HTTP status
    pub status: u16,
    /// Body, `None` for a bare status
    pub body: Option<String>,
    /// Resolved headers, in rule order
    pub headers: Vec<(String, String)>,
}

impl DecoratedResponse {
    fn bare(status: u16, body: Option<String>) -> Self {
        Self {
            status,
            body,
            headers: Vec::new(),
        }
    }
}

/// Maps outcomes to responses through an immutable response table
///
/// Loading overrides never mutates a decorator; it returns a new one whose
/// table is the defaults merged with the document. Holders swap the new
/// decorator in atomically.
#[derive(Debug, Clone)]
pub struct ResponseDecorator {
    defaults: Arc<ResponseTable>,
    table: Arc<ResponseTable>,
}

impl Default for ResponseDecorator {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseDecorator {
    /// Decorator over the built-in default table
    #[must_use]
    pub fn new() -> Self {
        Self::with_defaults(ResponseTable::defaults())
    }

    /// Decorator over a custom default table
    #[must_use]
    pub fn with_defaults(defaults: ResponseTable) -> Self {
        let defaults = Arc::new(defaults);
        Self {
            table: Arc::clone(&defaults),
            defaults,
        }
    }

    /// Decorator whose table is the defaults merged with `overrides`
    ///
    /// The merge always starts from the defaults, so loading the same
    /// document again yields the same table and the last load wins.
    #[must_use]
    pub fn load_overrides(&self, overrides: &OverrideDocument) -> Self {
        debug!(rules = overrides.rules().len(), "Loading response overrides");
        Self {
            defaults: Arc::clone(&self.defaults),
            table: Arc::new(self.defaults.with_overrides(overrides)),
        }
    }

    /// The effective table
    #[must_use]
    pub fn table(&self) -> &ResponseTable {
        &self.table
    }

    /// Build the client response for an outcome
    ///
    /// Header templates referencing request variables resolve against
    /// `context`; an absent variable resolves to an empty string.
    #[must_use]
    pub fn decorate(&self, outcome: &ValidationOutcome, context: &RequestContext) -> DecoratedResponse {
        let rule = outcome.error_code.and_then(|code| self.table.get(code));

        let Some(rule) = rule else {
            let body = outcome.body.as_ref().filter(|b| !b.is_empty()).cloned();
            return DecoratedResponse::bare(outcome.status, body);
        };

        let headers = rule
            .headers
            .iter()
            .map(|(name, template)| (name.clone(), template.resolve(|var| context.get(var))))
            .collect();

        DecoratedResponse {
            status: rule.http_status,
            body: Some(rule.message.clone()),
            headers,
        }
    }
}

#[cfg(test)]
mod tests {
    use domain::{ErrorCode, ResponseRule, ValueTemplate};
    use uuid::Uuid;

    use super::*;

    fn header<'a>(response: &'a DecoratedResponse, name: &str) -> Option<&'a str> {
        response
            .headers
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn missing_key_uses_default_rule() {
        let request_id = Uuid::new_v4();
        let ctx = RequestContext::with_request_id(request_id);
        let outcome = ValidationOutcome::failure(403, ErrorCode::MISSING_KEY);

        let response = ResponseDecorator::new().decorate(&outcome, &ctx);

        assert_eq!(response.status, 403);
        assert_eq!(
            response.body.as_deref(),
            Some(r#"{"error_code":"403000","message":"Api Key is required"}"#)
        );
        assert_eq!(
            header(&response, "X-Request-Id"),
            Some(request_id.to_string().as_str())
        );
        assert_eq!(header(&response, "Content-Type"), Some("application/json"));
    }

    #[test]
    fn request_id_header_ignores_validator_context() {
        let request_id = Uuid::new_v4();
        let mut ctx = RequestContext::with_request_id(request_id);
        ctx.merge([(domain::REQUEST_ID_VAR.to_string(), "forged".to_string())]);

        let outcome = ValidationOutcome::failure(403, ErrorCode::MISSING_KEY);
        let response = ResponseDecorator::new().decorate(&outcome, &ctx);

        assert_eq!(
            header(&response, "X-Request-Id"),
            Some(request_id.to_string().as_str())
        );
    }

    #[test]
    fn rule_status_overrides_outcome_status() {
        let outcome = ValidationOutcome::failure(500, ErrorCode::INVALID_TOKEN);
        let response = ResponseDecorator::new().decorate(&outcome, &RequestContext::new());
        assert_eq!(response.status, 401);
    }

    #[test]
    fn unmatched_code_falls_back_to_validator_body() {
        let outcome = ValidationOutcome {
            status: 409,
            error_code: Some(ErrorCode::new(409_999)),
            body: Some("conflict".to_string()),
            ..ValidationOutcome::default()
        };
        let response = ResponseDecorator::new().decorate(&outcome, &RequestContext::new());
        assert_eq!(response, DecoratedResponse::bare(409, Some("conflict".to_string())));
    }

    #[test]
    fn whitespace_body_is_emitted_verbatim() {
        let outcome = ValidationOutcome::raw_failure(418, Some(" \n".to_string()));
        let response = ResponseDecorator::new().decorate(&outcome, &RequestContext::new());
        assert_eq!(response, DecoratedResponse::bare(418, Some(" \n".to_string())));
    }

    #[test]
    fn empty_body_falls_back_to_bare_status() {
        let outcome = ValidationOutcome::raw_failure(418, Some(String::new()));
        let response = ResponseDecorator::new().decorate(&outcome, &RequestContext::new());
        assert_eq!(response.status, 418);
        assert_eq!(response.body, None);
        assert!(response.headers.is_empty());

        let outcome = ValidationOutcome::raw_failure(401, None);
        let response = ResponseDecorator::new().decorate(&outcome, &RequestContext::new());
        assert_eq!(response, DecoratedResponse::bare(401, None));
    }

    #[test]
    fn decorate_is_idempotent_for_fixed_context() {
        let decorator = ResponseDecorator::new();
        let ctx = RequestContext::new();
        let outcome = ValidationOutcome::failure(403, ErrorCode::INVALID_SIGNATURE);
        assert_eq!(decorator.decorate(&outcome, &ctx), decorator.decorate(&outcome, &ctx));
    }

    #[test]
    fn overrides_replace_only_redefined_codes() {
        let doc = OverrideDocument::from_json(
            r#"{"403010": {"http_status": 403, "message": "newMessage"}}"#,
        )
        .unwrap();
        let base = ResponseDecorator::new();
        let decorator = base.load_overrides(&doc);
        let ctx = RequestContext::new();

        let response =
            decorator.decorate(&ValidationOutcome::failure(403, ErrorCode::MISSING_TOKEN), &ctx);
        assert_eq!(response.body.as_deref(), Some("newMessage"));

        for code in base.table().codes().filter(|c| *c != ErrorCode::MISSING_TOKEN) {
            let outcome = ValidationOutcome::failure(400, code);
            assert_eq!(decorator.decorate(&outcome, &ctx), base.decorate(&outcome, &ctx));
        }
    }

    #[test]
    fn loading_overrides_twice_matches_once_and_last_wins() {
        let first =
            OverrideDocument::from_json(r#"{"403003": {"http_status": 401, "message": "one"}}"#)
                .unwrap();
        let second =
            OverrideDocument::from_json(r#"{"403000": {"http_status": 401, "message": "two"}}"#)
                .unwrap();
        let base = ResponseDecorator::new();

        let once = base.load_overrides(&first);
        let twice = once.load_overrides(&first);
        assert_eq!(once.table(), twice.table());

        let last = once.load_overrides(&second);
        let ctx = RequestContext::new();
        let invalid_key = last.decorate(&ValidationOutcome::failure(403, ErrorCode::INVALID_KEY), &ctx);
        assert_eq!(invalid_key.status, 403);
        let missing_key = last.decorate(&ValidationOutcome::failure(403, ErrorCode::MISSING_KEY), &ctx);
        assert_eq!(missing_key.body.as_deref(), Some("two"));
    }

    #[test]
    fn absent_variable_resolves_to_empty() {
        let rule = ResponseRule {
            http_status: 429,
            error_code: ErrorCode::RATE_LIMIT_EXCEEDED,
            message: "slow down".to_string(),
            headers: [
                ("Retry-After".to_string(), ValueTemplate::variable("retry_after")),
                ("X-Cost".to_string(), ValueTemplate::parse("$$5")),
            ]
            .into(),
        };
        let decorator = ResponseDecorator::with_defaults(ResponseTable::from_rules([rule]));
        let outcome = ValidationOutcome::failure(429, ErrorCode::RATE_LIMIT_EXCEEDED);

        let response = decorator.decorate(&outcome, &RequestContext::new());
        assert_eq!(header(&response, "Retry-After"), Some(""));
        assert_eq!(header(&response, "X-Cost"), Some("$5"));

        let mut ctx = RequestContext::new();
        ctx.set("retry_after", "30");
        let response = decorator.decorate(&outcome, &ctx);
        assert_eq!(header(&response, "Retry-After"), Some("30"));
    }
}
