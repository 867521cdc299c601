//! Application layer - Use cases and orchestration
//!
//! Contains the validation orchestrator, response decoration, TTL derivation
//! and the port definitions implemented by infrastructure adapters.

pub mod error;
pub mod ports;
mod request_context;
pub mod services;

pub use error::ApplicationError;
pub use ports::*;
pub use request_context::RequestContext;
pub use services::*;
