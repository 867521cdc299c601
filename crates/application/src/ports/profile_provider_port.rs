//! Profile provider port definition
//!
//! The upstream authority that resolves a credential token into a user
//! profile. Implementations report the raw upstream status and payload;
//! interpretation belongs to the profile validator.

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::error::ApplicationError;

/// Raw reply of an upstream call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamReply {
    /// HTTP status returned by the upstream
    pub status: u16,
    /// Response payload
    pub body: String,
}

impl UpstreamReply {
    /// Create a reply
    #[must_use]
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Port for resolving a credential into a profile
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ProfileProviderPort: Send + Sync {
    /// Perform one profile resolution call
    ///
    /// Returns `Err` only when no reply was obtained (connection failure,
    /// timeout); any HTTP reply, successful or not, is returned as `Ok`.
    async fn fetch_profile(
        &self,
        token: &str,
        request_id: &str,
    ) -> Result<UpstreamReply, ApplicationError>;

    /// Scope discriminator for cache keys, typically the upstream host
    fn scope(&self) -> String;
}
