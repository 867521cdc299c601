//! Cache port definition
//!
//! Defines the key/value store interface shared by the Local Store, the
//! Shared Store and the two-tier cache composed from both. Entries expire on
//! their own once their TTL elapses; there is no explicit eviction call.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::ApplicationError;

/// Cache port for storing and retrieving cached values
///
/// Implementations should be thread-safe and support async operations.
/// Values are stored as raw bytes - callers handle serialization.
#[async_trait]
pub trait CachePort: Send + Sync + std::fmt::Debug {
    /// Get a cached value by key
    ///
    /// Returns `None` if the key doesn't exist or has expired.
    async fn get_bytes(&self, key: &str) -> Result<Option<Vec<u8>>, ApplicationError>;

    /// Set a cached value with a time-to-live
    ///
    /// If the key already exists, its value and TTL are updated
    /// (last writer wins).
    async fn set_bytes(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Duration,
    ) -> Result<(), ApplicationError>;

    /// Get a cached value together with its remaining TTL
    ///
    /// Stores that do not track expiry report `None` for the TTL.
    async fn get_with_ttl(
        &self,
        key: &str,
    ) -> Result<Option<(Vec<u8>, Option<Duration>)>, ApplicationError> {
        Ok(self.get_bytes(key).await?.map(|value| (value, None)))
    }

    /// Get cache statistics (hits, misses, size)
    fn stats(&self) -> CacheStats;
}

/// Extension trait for typed cache operations
///
/// Provides convenient typed get/set methods on top of the raw byte interface.
#[async_trait]
pub trait CachePortExt: CachePort {
    /// Get a typed value from cache
    async fn get<T>(&self, key: &str) -> Result<Option<T>, ApplicationError>
    where
        T: serde::de::DeserializeOwned + Send,
    {
        match self.get_bytes(key).await? {
            Some(bytes) => {
                let value: T = serde_json::from_slice(&bytes).map_err(|e| {
                    ApplicationError::Cache(format!("Cache deserialization error: {e}"))
                })?;
                Ok(Some(value))
            },
            None => Ok(None),
        }
    }

    /// Set a typed value in cache
    async fn set<T>(&self, key: &str, value: &T, ttl: Duration) -> Result<(), ApplicationError>
    where
        T: serde::Serialize + Send + Sync,
    {
        let bytes = serde_json::to_vec(value)
            .map_err(|e| ApplicationError::Cache(format!("Cache serialization error: {e}")))?;
        self.set_bytes(key, bytes, ttl).await
    }
}

// Blanket implementation for all CachePort implementors
impl<T: CachePort + ?Sized> CachePortExt for T {}

/// Cache statistics for monitoring
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct CacheStats {
    /// Number of cache hits
    pub hits: u64,
    /// Number of cache misses
    pub misses: u64,
    /// Current number of entries
    pub entries: u64,
    /// Approximate memory usage in bytes
    pub memory_bytes: u64,
}

impl CacheStats {
    /// Calculate the hit rate as a percentage (0.0 - 1.0)
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            // Precision loss is acceptable for statistics display
            self.hits as f64 / total as f64
        }
    }
}

/// Standard TTL values for the validation caches
pub mod ttl {
    use std::time::Duration;

    /// Ceiling for entries held by the process-local store (1 minute)
    pub const LOCAL_CEILING: Duration = Duration::from_secs(60);

    /// TTL for cached profiles when the credential expiry is unknown (2 hours)
    pub const DEFAULT_PROFILE: Duration = Duration::from_secs(2 * 60 * 60);
}
