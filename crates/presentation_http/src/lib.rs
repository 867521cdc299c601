//! Validation gateway HTTP presentation layer
//!
//! Guards backend routes with validation policies, answers failures with
//! decorated responses and forwards validated requests with their context.

pub mod config_reload;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod tasks;

pub use config_reload::{GatewayReloader, spawn_config_reload_handler};
pub use error::ApiError;
pub use middleware::{MatchedRoute, RequestIdLayer, ValidationLayer};
pub use routes::create_router;
pub use state::{AppState, GatewayRoute, GatewaySnapshot};
