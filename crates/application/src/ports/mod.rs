//! Port definitions for application layer
//!
//! Ports are interfaces that define how the application interacts with
//! external systems. Adapters in the infrastructure layer implement these ports.

mod cache_port;
mod profile_provider_port;
mod validator_port;

pub use cache_port::{CachePort, CachePortExt, CacheStats, ttl};
#[cfg(test)]
pub use profile_provider_port::MockProfileProviderPort;
pub use profile_provider_port::{ProfileProviderPort, UpstreamReply};
#[cfg(test)]
pub use validator_port::MockValidatorPort;
pub use validator_port::{ValidationRequest, ValidatorPort};
