//! Health check handlers

use application::ports::CacheStats;
use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;

use crate::state::AppState;

/// Health check response
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Liveness check - is the server running?
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Readiness response
#[derive(Debug, Clone, Serialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    pub routes: usize,
    pub validators: Vec<String>,
    pub cache: CacheStatus,
}

/// Profile cache statistics
#[derive(Debug, Clone, Serialize)]
pub struct CacheStatus {
    #[serde(flatten)]
    pub stats: CacheStats,
    pub hit_rate: f64,
}

/// Readiness check - a gateway without routes has nothing to serve
pub async fn readiness_check(
    State(state): State<AppState>,
) -> (StatusCode, Json<ReadinessResponse>) {
    let snapshot = state.snapshot();
    let stats = state.cache.stats();
    let routes = snapshot.routes().len();
    let ready = routes > 0;

    let status_code = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status_code,
        Json(ReadinessResponse {
            ready,
            routes,
            validators: snapshot.orchestrator.registry().names(),
            cache: CacheStatus {
                hit_rate: stats.hit_rate(),
                stats,
            },
        }),
    )
}
