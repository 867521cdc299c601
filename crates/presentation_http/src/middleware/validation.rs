//! Request validation middleware
//!
//! Resolves the route guarding the request path, runs its validation policy
//! and either answers with the decorated failure response or lets the
//! request through carrying the accumulated [`RequestContext`] and the
//! matched [`MatchedRoute`] in its extensions.

use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use application::{DecoratedResponse, RequestContext, ValidationRequest};
use axum::{
    body::Body,
    extract::Request,
    http::{HeaderName, HeaderValue, Method, StatusCode, header},
    response::{IntoResponse, Response},
};
use tower::{Layer, Service};
use tracing::{debug, info, warn};

use crate::{middleware::RequestId, state::AppState};

/// Paths served by the gateway itself
const EXCLUDED_PATHS: &[&str] = &["/health", "/ready"];

/// Route selected for a validated request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedRoute {
    /// Prefix of the matched route
    pub path_prefix: String,
    /// Backend receiving the request
    pub backend_url: String,
}

/// Layer that applies route validation policies
#[derive(Debug, Clone)]
pub struct ValidationLayer {
    state: AppState,
}

impl ValidationLayer {
    /// Create a layer reading policies from the gateway state
    #[must_use]
    pub const fn new(state: AppState) -> Self {
        Self { state }
    }
}

impl<S> Layer<S> for ValidationLayer {
    type Service = ValidationService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ValidationService {
            inner,
            state: self.state.clone(),
        }
    }
}

/// Middleware service running the validation orchestrator
#[derive(Debug, Clone)]
pub struct ValidationService<S> {
    inner: S,
    state: AppState,
}

impl<S> Service<Request> for ValidationService<S>
where
    S: Service<Request, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request) -> Self::Future {
        let snapshot = self.state.snapshot();
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let path = req.uri().path().to_string();
            if EXCLUDED_PATHS.contains(&path.as_str()) {
                return inner.call(req).await;
            }

            let Some(route) = snapshot.resolve_route(&path) else {
                debug!(path = %path, "No route matches, skipping validation");
                return inner.call(req).await;
            };

            let mut context = req
                .extensions()
                .get::<RequestId>()
                .map_or_else(RequestContext::new, |id| {
                    RequestContext::with_request_id(id.as_uuid())
                });
            let validation_request = validation_request(&req);

            let outcome = snapshot
                .orchestrator
                .validate(&route.policy, &validation_request, &mut context)
                .await;

            if !outcome.is_success() {
                info!(
                    route = %route.path_prefix,
                    status = outcome.status,
                    error_code = ?outcome.error_code,
                    "Request rejected"
                );
                let decorated = snapshot.decorator.decorate(&outcome, &context);
                return Ok(decorated_response(decorated));
            }

            debug!(route = %route.path_prefix, vars = context.vars().len(), "Request validated");
            req.extensions_mut().insert(MatchedRoute {
                path_prefix: route.path_prefix.clone(),
                backend_url: route.backend_url.clone(),
            });
            req.extensions_mut().insert(context);
            inner.call(req).await
        })
    }
}

/// CORS preflight: `OPTIONS` with both `Origin` and `Access-Control-Request-Method`
#[must_use]
pub fn is_preflight(req: &Request) -> bool {
    req.method() == Method::OPTIONS
        && req.headers().contains_key(header::ORIGIN)
        && req
            .headers()
            .contains_key(header::ACCESS_CONTROL_REQUEST_METHOD)
}

/// Read-only view of the request handed to validators
fn validation_request(req: &Request) -> ValidationRequest {
    let uri = req
        .uri()
        .path_and_query()
        .map_or_else(|| req.uri().path().to_string(), ToString::to_string);

    req.headers()
        .iter()
        .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str(), v)))
        .fold(
            ValidationRequest::new(req.method().as_str(), uri).with_preflight(is_preflight(req)),
            |request, (name, value)| request.with_header(name, value),
        )
}

/// Turn a decorated failure into an HTTP response
///
/// Headers with names or values HTTP cannot carry are dropped.
#[must_use]
pub fn decorated_response(decorated: DecoratedResponse) -> Response {
    let status = StatusCode::from_u16(decorated.status).unwrap_or_else(|_| {
        warn!(status = decorated.status, "Invalid status in response rule");
        StatusCode::SERVICE_UNAVAILABLE
    });

    let mut response = match decorated.body {
        Some(body) => (status, Body::from(body)).into_response(),
        None => status.into_response(),
    };

    for (name, value) in decorated.headers {
        match (
            HeaderName::try_from(name.as_str()),
            HeaderValue::try_from(value.as_str()),
        ) {
            (Ok(name), Ok(value)) => {
                response.headers_mut().insert(name, value);
            },
            _ => warn!(header = %name, "Dropping unrepresentable response header"),
        }
    }

    response
}
