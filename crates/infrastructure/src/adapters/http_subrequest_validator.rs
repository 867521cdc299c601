//! HTTP sub-request validator
//!
//! Generic validator that delegates the decision to an HTTP endpoint named
//! by the policy entry. The endpoint receives the original method, the
//! original headers, the original URI and the context accumulated so far,
//! and answers with a status plus an optional error code or JSON document.

use application::{
    RequestContext,
    ports::{ValidationRequest, ValidatorPort},
};
use async_trait::async_trait;
use domain::{ErrorCode, ValidationOutcome, ValidatorSpec};
use reqwest::Method;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::http::CorrelatedHttpClient;

/// Header carrying the URI of the request under validation
pub const X_ORIGINAL_URI: &str = "x-original-uri";
/// Header carrying the method of the request under validation
pub const X_ORIGINAL_METHOD: &str = "x-original-method";
/// Prefix of headers exposing context variables
pub const CONTEXT_HEADER_PREFIX: &str = "x-context-";

/// Headers never copied onto a sub-request
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "content-length",
    "host",
    "keep-alive",
    "proxy-connection",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
    "x-request-id",
];

/// Validator calling the endpoint of its policy entry
#[derive(Debug, Clone)]
pub struct HttpSubrequestValidator {
    client: CorrelatedHttpClient,
    base_url: Option<String>,
}

impl HttpSubrequestValidator {
    /// Create a validator; relative endpoints need a base URL
    #[must_use]
    pub const fn new(client: CorrelatedHttpClient) -> Self {
        Self {
            client,
            base_url: None,
        }
    }

    /// Base URL that relative endpoints (`/validate_api_key`) resolve against
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    fn endpoint_url(&self, endpoint: &str) -> Option<String> {
        if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            return Some(endpoint.to_string());
        }
        let base = self.base_url.as_deref()?.trim_end_matches('/');
        let path = endpoint.trim_start_matches('/');
        Some(format!("{base}/{path}"))
    }
}

#[async_trait]
impl ValidatorPort for HttpSubrequestValidator {
    #[instrument(skip(self, request, context), fields(validator = %spec.name), level = "debug")]
    async fn validate(
        &self,
        spec: &ValidatorSpec,
        request: &ValidationRequest,
        context: &RequestContext,
    ) -> ValidationOutcome {
        let Some(url) = spec
            .endpoint
            .as_deref()
            .and_then(|endpoint| self.endpoint_url(endpoint))
        else {
            warn!(endpoint = ?spec.endpoint, "Validator has no resolvable endpoint");
            return ValidationOutcome::unknown_error();
        };

        let method = Method::from_bytes(request.method().as_bytes()).unwrap_or(Method::GET);
        let forwarded = request
            .headers()
            .iter()
            .filter(|(name, _)| {
                !HOP_BY_HOP.contains(&name.as_str()) && !name.starts_with(CONTEXT_HEADER_PREFIX)
            })
            .map(|(name, value)| (name.as_str(), value.as_str()));
        let context_headers: Vec<(String, &str)> = context
            .vars()
            .iter()
            .map(|(name, value)| (format!("{CONTEXT_HEADER_PREFIX}{name}"), value.as_str()))
            .collect();

        let reply = self
            .client
            .request(method, &url)
            .with_request_id(context)
            .headers(forwarded)
            .headers(context_headers.iter().map(|(n, v)| (n.as_str(), *v)))
            .header(X_ORIGINAL_URI, request.uri())
            .header(X_ORIGINAL_METHOD, request.method())
            .send()
            .await;

        let response = match reply {
            Ok(response) => response,
            Err(e) => {
                warn!(url = %url, error = %e, "Validator sub-request failed");
                return ValidationOutcome::unknown_error();
            },
        };

        let status = response.status().as_u16();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                warn!(url = %url, error = %e, "Failed to read validator reply");
                return ValidationOutcome::unknown_error();
            },
        };

        debug!(url = %url, status, "Validator replied");
        outcome_from_reply(status, &body)
    }
}

/// Interpret a validator endpoint reply
///
/// - a body that is a bare integer is the error code;
/// - a JSON object may carry `error_code` and a `context` object whose
///   scalar members become context variables;
/// - any other non-empty body of a failing reply is kept verbatim.
#[must_use]
pub fn outcome_from_reply(status: u16, body: &str) -> ValidationOutcome {
    let trimmed = body.trim();

    if let Ok(code) = trimmed.parse::<ErrorCode>() {
        return ValidationOutcome {
            status,
            error_code: Some(code),
            ..ValidationOutcome::default()
        };
    }

    if let Ok(Value::Object(document)) = serde_json::from_str::<Value>(trimmed) {
        let error_code = document.get("error_code").and_then(|v| match v {
            Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()).map(ErrorCode::new),
            Value::String(s) => s.parse().ok(),
            _ => None,
        });
        let context_vars = document
            .get("context")
            .and_then(Value::as_object)
            .map(|vars| {
                vars.iter()
                    .filter_map(|(name, value)| scalar_to_string(value).map(|v| (name.clone(), v)))
                    .collect()
            })
            .unwrap_or_default();
        let body = (status != 200 && error_code.is_none()).then(|| body.to_string());
        return ValidationOutcome {
            status,
            error_code,
            body,
            context_vars,
        };
    }

    ValidationOutcome {
        status,
        body: (status != 200 && !body.is_empty()).then(|| body.to_string()),
        ..ValidationOutcome::default()
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => Some(String::new()),
        Value::Array(_) | Value::Object(_) => None,
    }
}
