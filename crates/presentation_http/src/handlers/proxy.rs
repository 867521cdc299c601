//! Backend forwarding handler
//!
//! Proxies a validated request to its route's backend. The request path and
//! query are kept as-is; every context variable accumulated during
//! validation travels as an `X-Context-<name>` header.

use application::RequestContext;
use axum::{
    body::{Body, to_bytes},
    extract::{Request, State},
    http::HeaderName,
    response::Response,
};
use infrastructure::CONTEXT_HEADER_PREFIX;
use tracing::{debug, instrument, warn};

use crate::{error::ApiError, middleware::MatchedRoute, state::AppState};

/// Largest request body forwarded to a backend
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Headers that describe a single hop and are never forwarded
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "content-length",
    "host",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "proxy-connection",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

fn is_forwardable(name: &HeaderName) -> bool {
    let name = name.as_str();
    !HOP_BY_HOP.contains(&name) && name != "x-request-id" && !name.starts_with(CONTEXT_HEADER_PREFIX)
}

/// Join a backend base URL and a request path
#[must_use]
pub fn backend_url(base: &str, path_and_query: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path_and_query.trim_start_matches('/')
    )
}

/// Forward a validated request to its backend
#[instrument(skip(state, req), fields(path = %req.uri().path()), level = "debug")]
pub async fn forward(State(state): State<AppState>, req: Request) -> Result<Response, ApiError> {
    let Some(route) = req.extensions().get::<MatchedRoute>().cloned() else {
        return Err(ApiError::NotFound(req.uri().path().to_string()));
    };
    let context = req
        .extensions()
        .get::<RequestContext>()
        .cloned()
        .unwrap_or_default();

    let (parts, body) = req.into_parts();
    let body = to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|e| ApiError::PayloadTooLarge(e.to_string()))?;

    let url = backend_url(
        &route.backend_url,
        parts.uri.path_and_query().map_or("/", |pq| pq.as_str()),
    );

    let forwarded = parts
        .headers
        .iter()
        .filter(|(name, _)| is_forwardable(name))
        .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str(), v)));
    let context_headers: Vec<(String, &str)> = context
        .vars()
        .iter()
        .map(|(name, value)| (format!("{CONTEXT_HEADER_PREFIX}{name}"), value.as_str()))
        .collect();

    let upstream = state
        .client
        .request(parts.method.clone(), &url)
        .with_request_id(&context)
        .headers(forwarded)
        .headers(context_headers.iter().map(|(n, v)| (n.as_str(), *v)))
        .body(body)
        .send()
        .await
        .map_err(|e| {
            warn!(backend = %route.backend_url, error = %e, "Backend request failed");
            ApiError::BadGateway(e.to_string())
        })?;

    let status = upstream.status();
    let headers = upstream.headers().clone();
    let bytes = upstream
        .bytes()
        .await
        .map_err(|e| ApiError::BadGateway(e.to_string()))?;

    debug!(status = status.as_u16(), bytes = bytes.len(), "Backend replied");

    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = status;
    for (name, value) in headers.iter().filter(|(name, _)| is_forwardable(name)) {
        response.headers_mut().append(name.clone(), value.clone());
    }
    Ok(response)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use application::{
        OrchestratorConfig, ResponseDecorator, ValidationOrchestrator, ValidatorRegistry,
    };
    use axum::http::StatusCode;
    use infrastructure::{CorrelatedHttpClient, MokaCache};
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{body_string, header, method, path, query_param},
    };

    use super::*;
    use crate::state::GatewaySnapshot;

    fn state() -> AppState {
        AppState::new(
            GatewaySnapshot::new(
                ValidationOrchestrator::new(ValidatorRegistry::new(), OrchestratorConfig::default()),
                ResponseDecorator::new(),
                Vec::new(),
            ),
            Arc::new(MokaCache::new()),
            CorrelatedHttpClient::new().unwrap(),
        )
    }

    fn validated(request: Request, backend: &str, context: RequestContext) -> Request {
        let mut request = request;
        request.extensions_mut().insert(MatchedRoute {
            path_prefix: "/v1".to_string(),
            backend_url: backend.to_string(),
        });
        request.extensions_mut().insert(context);
        request
    }

    #[test]
    fn backend_url_joins_single_slash() {
        assert_eq!(backend_url("http://b:1/", "/v1/x?y=1"), "http://b:1/v1/x?y=1");
        assert_eq!(backend_url("http://b:1", "v1"), "http://b:1/v1");
    }

    #[tokio::test]
    async fn forwards_context_as_headers() {
        let server = MockServer::start().await;
        let mut context = RequestContext::new();
        context.set("user_region", "EMEA");

        Mock::given(method("POST"))
            .and(path("/v1/orders"))
            .and(query_param("id", "7"))
            .and(header("x-context-user_region", "EMEA"))
            .and(header("x-request-id", context.request_id().to_string().as_str()))
            .and(body_string("payload"))
            .respond_with(
                ResponseTemplate::new(201)
                    .insert_header("x-backend", "orders")
                    .set_body_string("created"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let request = Request::builder()
            .method("POST")
            .uri("/v1/orders?id=7")
            .header("x-context-user_region", "spoofed")
            .body(Body::from("payload"))
            .unwrap();

        let response = forward(State(state()), validated(request, &server.uri(), context))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers().get("x-backend").unwrap(), "orders");
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"created");
    }

    #[tokio::test]
    async fn unmatched_request_is_not_found() {
        let request = Request::builder().uri("/nowhere").body(Body::empty()).unwrap();
        let result = forward(State(state()), request).await;
        assert!(matches!(result, Err(ApiError::NotFound(path)) if path == "/nowhere"));
    }

    #[tokio::test]
    async fn unreachable_backend_is_bad_gateway() {
        let request = Request::builder().uri("/v1").body(Body::empty()).unwrap();
        let result = forward(
            State(state()),
            validated(request, "http://127.0.0.1:1", RequestContext::new()),
        )
        .await;
        assert!(matches!(result, Err(ApiError::BadGateway(_))));
    }
}
