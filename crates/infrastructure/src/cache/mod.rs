//! Cache implementations
//!
//! Provides caching adapters for the application layer:
//! - `MokaCache`: process-local store with per-entry TTL
//! - `RedbCache`: shared store, file-backed or in memory
//! - `TwoTierCache`: local store in front of the shared store

mod moka_cache;
mod redb_cache;
mod two_tier_cache;

pub use moka_cache::{MokaCache, MokaCacheConfig};
pub use redb_cache::RedbCache;
pub use two_tier_cache::TwoTierCache;

/// Generate a cache key from components using blake3 hash
///
/// This ensures consistent key generation across the application
/// and handles variable-length inputs efficiently.
#[must_use]
pub fn generate_cache_key(prefix: &str, components: &[&str]) -> String {
    let mut hasher = blake3::Hasher::new();
    for component in components {
        hasher.update(component.as_bytes());
        hasher.update(b"|"); // Separator to avoid collisions
    }
    let hash = hasher.finalize();
    format!("{}:{}", prefix, hash.to_hex())
}

/// Cache key for a resolved profile
///
/// The scope (typically the upstream host) keeps the same token from
/// colliding across identity providers. The raw token never appears in the
/// key.
#[must_use]
pub fn profile_cache_key(token: &str, scope: &str) -> String {
    generate_cache_key("profile", &[scope, token])
}
