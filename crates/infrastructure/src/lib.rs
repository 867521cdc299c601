//! Infrastructure layer - Adapters for external systems
//!
//! Implements ports defined in the application layer: the process-local and
//! shared cache stores, the HTTP sub-request transport, the generic HTTP
//! validator and the profile resolution validator. Also loads configuration
//! and installs logging.

pub mod adapters;
pub mod cache;
pub mod config;
pub mod http;
pub mod telemetry;

pub use adapters::*;
pub use cache::{
    MokaCache, MokaCacheConfig, RedbCache, TwoTierCache, generate_cache_key, profile_cache_key,
};
pub use config::{
    AppConfig, CacheConfig, LogFormat, LoggingConfig, ProfileConfig, ResponsesConfig, RouteConfig,
    ServerConfig, UpstreamConfig,
};
pub use http::{CorrelatedClientConfig, CorrelatedHttpClient, RequestIdProvider, X_REQUEST_ID};
pub use telemetry::{TelemetryError, init_logging};
