//! Route definitions

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::{
    handlers,
    middleware::{RequestIdLayer, ValidationLayer},
    state::AppState,
};

/// Create the gateway router
///
/// `/health` and `/ready` are served locally; every other request is
/// validated against its route policy and forwarded to the route backend.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health and status endpoints
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check))
        // Everything else goes to a backend
        .fallback(handlers::proxy::forward)
        // Layers run bottom-up: request ids exist before validation starts
        .layer(ValidationLayer::new(state.clone()))
        .layer(RequestIdLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
