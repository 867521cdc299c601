//! Two-tier cache implementation
//!
//! Combines a process-local store with a shared store. The shared store is
//! authoritative and keeps entries for their full TTL; the local store never
//! keeps an entry longer than a fixed ceiling.

use std::{sync::Arc, time::Duration};

use application::{
    error::ApplicationError,
    ports::{CachePort, CacheStats, ttl},
};
use async_trait::async_trait;
use tracing::{debug, instrument, warn};

/// Local store in front of a shared store
///
/// Read path: local -> miss -> shared -> back-fill local with
/// `min(remaining, ceiling)` -> return
/// Write path: shared with the full TTL, local with `min(ttl, ceiling)`
///
/// Errors from either store degrade to a miss on reads; a failed shared
/// write is reported, a failed local write is only logged.
pub struct TwoTierCache {
    local: Arc<dyn CachePort>,
    shared: Arc<dyn CachePort>,
    local_ceiling: Duration,
}

impl std::fmt::Debug for TwoTierCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwoTierCache")
            .field("local", &self.local)
            .field("shared", &self.shared)
            .field("local_ceiling", &self.local_ceiling)
            .finish()
    }
}

impl TwoTierCache {
    /// Create a two-tier cache with the standard local ceiling
    #[must_use]
    pub fn new(local: Arc<dyn CachePort>, shared: Arc<dyn CachePort>) -> Self {
        Self::with_ceiling(local, shared, ttl::LOCAL_CEILING)
    }

    /// Create a two-tier cache with a custom local ceiling
    #[must_use]
    pub fn with_ceiling(
        local: Arc<dyn CachePort>,
        shared: Arc<dyn CachePort>,
        local_ceiling: Duration,
    ) -> Self {
        Self {
            local,
            shared,
            local_ceiling,
        }
    }

    /// TTL ceiling for the local store
    #[must_use]
    pub const fn local_ceiling(&self) -> Duration {
        self.local_ceiling
    }

    /// The local store
    #[must_use]
    pub fn local(&self) -> &Arc<dyn CachePort> {
        &self.local
    }

    /// The shared store
    #[must_use]
    pub fn shared(&self) -> &Arc<dyn CachePort> {
        &self.shared
    }
}

#[async_trait]
impl CachePort for TwoTierCache {
    #[instrument(skip(self), level = "debug")]
    async fn get_bytes(&self, key: &str) -> Result<Option<Vec<u8>>, ApplicationError> {
        match self.local.get_bytes(key).await {
            Ok(Some(value)) => {
                debug!(key = %key, layer = "local", "Cache hit");
                return Ok(Some(value));
            },
            Ok(None) => {},
            Err(e) => warn!(error = %e, key = %key, "Local store read failed"),
        }

        let (value, remaining) = match self.shared.get_with_ttl(key).await {
            Ok(Some(found)) => found,
            Ok(None) => {
                debug!(key = %key, "Cache miss (all layers)");
                return Ok(None);
            },
            Err(e) => {
                warn!(error = %e, key = %key, "Shared store read failed, treating as miss");
                return Ok(None);
            },
        };

        // The local copy must not outlive the shared entry
        let local_ttl = remaining.map_or(self.local_ceiling, |left| left.min(self.local_ceiling));
        debug!(
            key = %key,
            layer = "shared",
            local_ttl_ms = local_ttl.as_millis(),
            "Cache hit, back-filling local store"
        );
        if !local_ttl.is_zero() {
            if let Err(e) = self.local.set_bytes(key, value.clone(), local_ttl).await {
                warn!(error = %e, key = %key, "Failed to back-fill local store");
            }
        }

        Ok(Some(value))
    }

    #[instrument(skip(self, value), level = "debug")]
    async fn set_bytes(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Duration,
    ) -> Result<(), ApplicationError> {
        if ttl.is_zero() {
            return Err(ApplicationError::Cache(format!(
                "refusing zero TTL for key {key}"
            )));
        }

        self.shared.set_bytes(key, value.clone(), ttl).await?;

        let local_ttl = ttl.min(self.local_ceiling);
        if let Err(e) = self.local.set_bytes(key, value, local_ttl).await {
            warn!(error = %e, key = %key, "Failed to write local store");
        }

        debug!(
            key = %key,
            ttl_secs = ttl.as_secs(),
            local_ttl_secs = local_ttl.as_secs(),
            "Cache set (both layers)"
        );
        Ok(())
    }

    fn stats(&self) -> CacheStats {
        let local = self.local.stats();
        let shared = self.shared.stats();

        // A local miss leads to a shared lookup, so only shared misses are final
        CacheStats {
            hits: local.hits + shared.hits,
            misses: shared.misses,
            entries: local.entries.max(shared.entries),
            memory_bytes: local.memory_bytes + shared.memory_bytes,
        }
    }
}
