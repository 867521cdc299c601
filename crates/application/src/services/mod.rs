//! Application services
//!
//! Services orchestrate domain logic and coordinate with ports.

mod cache_ttl;
mod orchestrator;
mod response_decorator;
mod validator_registry;

pub use cache_ttl::{CacheTtl, TtlPolicy, normalize_epoch, now_epoch, parse_expiry, remaining_secs};
pub use orchestrator::{OrchestratorConfig, ValidationOrchestrator};
pub use response_decorator::{DecoratedResponse, ResponseDecorator};
pub use validator_registry::ValidatorRegistry;
