//! Cache configuration with TTL settings.

use std::{path::PathBuf, time::Duration};

use application::ports::ttl;
use serde::{Deserialize, Serialize};

/// Two-tier cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Ceiling for entries kept in the process-local store (default: 60s)
    #[serde(default = "default_local_ceiling")]
    pub local_ceiling_secs: u64,

    /// TTL for cached profiles when the credential expiry is unknown (default: 2h)
    #[serde(default = "default_ttl")]
    pub default_ttl_secs: u64,

    /// Memory bound of the process-local store in MB
    #[serde(default = "default_local_capacity")]
    pub local_max_capacity_mb: u64,

    /// redb file backing the shared store; in memory when absent
    #[serde(default)]
    pub shared_path: Option<PathBuf>,
}

const fn default_local_ceiling() -> u64 {
    ttl::LOCAL_CEILING.as_secs()
}

const fn default_ttl() -> u64 {
    ttl::DEFAULT_PROFILE.as_secs()
}

const fn default_local_capacity() -> u64 {
    64
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            local_ceiling_secs: default_local_ceiling(),
            default_ttl_secs: default_ttl(),
            local_max_capacity_mb: default_local_capacity(),
            shared_path: None,
        }
    }
}

impl CacheConfig {
    /// Local ceiling as a Duration
    #[must_use]
    pub const fn local_ceiling(&self) -> Duration {
        Duration::from_secs(self.local_ceiling_secs)
    }

    /// Default profile TTL as a Duration
    #[must_use]
    pub const fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_secs)
    }
}
