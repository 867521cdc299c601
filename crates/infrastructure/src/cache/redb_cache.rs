//! Redb embedded cache implementation
//!
//! Shared store of the two-tier cache. Every gateway process pointing at the
//! same file sees the same entries; redb serialises writers, so concurrent
//! `set_bytes` calls resolve as last writer wins.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use application::{
    error::ApplicationError,
    ports::{CachePort, CacheStats},
};
use async_trait::async_trait;
use bincode::{Decode, Encode};
use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition};
use tracing::{debug, instrument, warn};

/// Table definition for cache entries
const CACHE_TABLE: TableDefinition<&[u8], &[u8]> = TableDefinition::new("cache");

/// Entry wrapper that includes expiration time
#[derive(Debug, Encode, Decode)]
struct CacheEntry {
    /// Serialized value as bytes
    data: Vec<u8>,
    /// Expiration timestamp (Unix epoch milliseconds)
    expires_at_ms: u64,
}

fn store_error(context: &str, e: impl std::fmt::Display) -> ApplicationError {
    ApplicationError::Cache(format!("{context}: {e}"))
}

/// Redb-based shared cache
///
/// # Auto-Recovery
///
/// If the database file is corrupted or incompatible, it is deleted and
/// recreated on open.
pub struct RedbCache {
    db: Arc<Database>,
    path: Option<PathBuf>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl std::fmt::Debug for RedbCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbCache")
            .field("db", &"<Database>")
            .field("path", &self.path)
            .field("hits", &self.hits.load(Ordering::Relaxed))
            .field("misses", &self.misses.load(Ordering::Relaxed))
            .finish()
    }
}

impl RedbCache {
    /// Open or create a cache file
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened after recreating it.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, ApplicationError> {
        let path_buf = path.as_ref().to_path_buf();

        if let Some(parent) = path_buf.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| store_error("Failed to create cache directory", e))?;
        }

        let db = match Database::create(&path_buf) {
            Ok(db) => db,
            Err(e) => {
                warn!(
                    path = %path_buf.display(),
                    error = %e,
                    "Cache database corrupted or incompatible, recreating"
                );
                if path_buf.exists() {
                    fs::remove_file(&path_buf)
                        .map_err(|e| store_error("Failed to remove corrupted database", e))?;
                }
                Database::create(&path_buf)
                    .map_err(|e| store_error("Failed to create Redb database", e))?
            },
        };

        Self::from_database(db, Some(path_buf))
    }

    /// Create a cache backed by memory only
    ///
    /// Used when no shared path is configured, and in tests.
    pub fn in_memory() -> Result<Self, ApplicationError> {
        let db = Database::builder()
            .create_with_backend(redb::backends::InMemoryBackend::new())
            .map_err(|e| store_error("Failed to create in-memory Redb", e))?;
        Self::from_database(db, None)
    }

    fn from_database(db: Database, path: Option<PathBuf>) -> Result<Self, ApplicationError> {
        // Opening the table creates it if it doesn't exist
        let write_txn = db
            .begin_write()
            .map_err(|e| store_error("Failed to begin write transaction", e))?;
        {
            let _ = write_txn
                .open_table(CACHE_TABLE)
                .map_err(|e| store_error("Failed to open cache table", e))?;
        }
        write_txn
            .commit()
            .map_err(|e| store_error("Failed to commit transaction", e))?;

        Ok(Self {
            db: Arc::new(db),
            path,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        })
    }

    /// Path of the backing file, `None` when in memory
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn now_millis() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
            .unwrap_or(0)
    }

    /// Remove expired entries
    pub fn cleanup_expired(&self) -> Result<u64, ApplicationError> {
        let now = Self::now_millis();

        let expired: Vec<Vec<u8>> = {
            let read_txn = self
                .db
                .begin_read()
                .map_err(|e| store_error("Failed to begin read transaction", e))?;
            let table = read_txn
                .open_table(CACHE_TABLE)
                .map_err(|e| store_error("Failed to open cache table", e))?;

            table
                .iter()
                .map_err(|e| store_error("Redb iteration error", e))?
                .filter_map(|result| {
                    result.ok().and_then(|(key, value)| {
                        bincode::decode_from_slice::<CacheEntry, _>(
                            value.value(),
                            bincode::config::standard(),
                        )
                        .ok()
                        .filter(|(entry, _)| now >= entry.expires_at_ms)
                        .map(|_| key.value().to_vec())
                    })
                })
                .collect()
        };

        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| store_error("Failed to begin write transaction", e))?;
        let mut removed = 0u64;
        {
            let mut table = write_txn
                .open_table(CACHE_TABLE)
                .map_err(|e| store_error("Failed to open cache table", e))?;
            for key in expired {
                table
                    .remove(key.as_slice())
                    .map_err(|e| store_error("Redb remove error", e))?;
                removed += 1;
            }
        }
        write_txn
            .commit()
            .map_err(|e| store_error("Failed to commit cleanup transaction", e))?;

        if removed > 0 {
            debug!(removed = removed, "Cleaned up expired cache entries");
        }
        Ok(removed)
    }

    fn entry_count(&self) -> u64 {
        self.db
            .begin_read()
            .ok()
            .and_then(|txn| txn.open_table(CACHE_TABLE).ok())
            .and_then(|table| table.len().ok())
            .unwrap_or(0)
    }
}

#[async_trait]
impl CachePort for RedbCache {
    async fn get_bytes(&self, key: &str) -> Result<Option<Vec<u8>>, ApplicationError> {
        Ok(self.get_with_ttl(key).await?.map(|(value, _)| value))
    }

    #[instrument(skip(self), level = "debug")]
    async fn get_with_ttl(
        &self,
        key: &str,
    ) -> Result<Option<(Vec<u8>, Option<Duration>)>, ApplicationError> {
        let db = Arc::clone(&self.db);
        let key_bytes = key.as_bytes().to_vec();

        // Redb operations are blocking
        let stored = tokio::task::spawn_blocking(move || {
            let read_txn = db.begin_read()?;
            let table = read_txn.open_table(CACHE_TABLE)?;
            Ok::<_, redb::Error>(table.get(key_bytes.as_slice())?.map(|v| v.value().to_vec()))
        })
        .await
        .map_err(|e| store_error("Task join error", e))?
        .map_err(|e| store_error("Redb get error", e))?;

        let Some(bytes) = stored else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            debug!(key = %key, "Cache miss (Redb)");
            return Ok(None);
        };

        let (entry, _): (CacheEntry, _) =
            bincode::decode_from_slice(&bytes, bincode::config::standard())
                .map_err(|e| store_error("Cache entry deserialize error", e))?;

        let now = Self::now_millis();
        if now >= entry.expires_at_ms {
            self.misses.fetch_add(1, Ordering::Relaxed);
            debug!(key = %key, "Cache entry expired (Redb)");
            return Ok(None);
        }

        self.hits.fetch_add(1, Ordering::Relaxed);
        debug!(key = %key, "Cache hit (Redb)");
        let remaining = Duration::from_millis(entry.expires_at_ms - now);
        Ok(Some((entry.data, Some(remaining))))
    }

    #[instrument(skip(self, value), level = "debug")]
    async fn set_bytes(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Duration,
    ) -> Result<(), ApplicationError> {
        let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
        let entry = CacheEntry {
            data: value,
            expires_at_ms: Self::now_millis().saturating_add(ttl_ms),
        };
        let entry_bytes = bincode::encode_to_vec(&entry, bincode::config::standard())
            .map_err(|e| store_error("Entry serialize error", e))?;

        let db = Arc::clone(&self.db);
        let key_bytes = key.as_bytes().to_vec();
        tokio::task::spawn_blocking(move || {
            let write_txn = db.begin_write()?;
            {
                let mut table = write_txn.open_table(CACHE_TABLE)?;
                table.insert(key_bytes.as_slice(), entry_bytes.as_slice())?;
            }
            write_txn.commit()?;
            Ok::<_, redb::Error>(())
        })
        .await
        .map_err(|e| store_error("Task join error", e))?
        .map_err(|e| store_error("Redb insert error", e))?;

        debug!(key = %key, ttl_secs = ttl.as_secs(), "Cache set (Redb)");
        Ok(())
    }

    fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.entry_count(),
            memory_bytes: 0,
        }
    }
}
