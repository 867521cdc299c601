//! Sub-request transport and profile upstream configuration.

use std::time::Duration;

use domain::Region;
use serde::{Deserialize, Serialize};

use crate::http::CorrelatedClientConfig;

/// HTTP transport settings shared by every validator sub-request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Connection timeout in milliseconds
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Whole-request timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// User agent sent upstream
    #[serde(default)]
    pub user_agent: Option<String>,

    /// Base URL that relative validator endpoints resolve against
    #[serde(default)]
    pub validator_base_url: Option<String>,
}

const fn default_connect_timeout_ms() -> u64 {
    2_000
}

const fn default_timeout_ms() -> u64 {
    5_000
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: default_connect_timeout_ms(),
            timeout_ms: default_timeout_ms(),
            user_agent: None,
            validator_base_url: None,
        }
    }
}

impl UpstreamConfig {
    /// Client settings for the correlated HTTP client
    #[must_use]
    pub fn client_config(&self) -> CorrelatedClientConfig {
        let config = CorrelatedClientConfig::default()
            .with_connect_timeout(Duration::from_millis(self.connect_timeout_ms))
            .with_timeout(Duration::from_millis(self.timeout_ms));
        match &self.user_agent {
            Some(agent) => config.with_user_agent(agent.clone()),
            None => config,
        }
    }
}

/// Profile resolution settings
///
/// The profile validator is registered only when an endpoint is configured.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileConfig {
    /// Identity endpoint answering `GET` with the caller's profile
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Cache scope discriminator; defaults to the endpoint host
    #[serde(default)]
    pub scope: Option<String>,

    /// Regions whose profiles are accepted (empty accepts all)
    #[serde(default)]
    pub accepted_regions: Vec<Region>,

    /// Reject profiles without an email address
    #[serde(default)]
    pub require_email: bool,
}
