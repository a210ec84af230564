//! # Cache Module
//!
//! Expiring key/value layer holding JSON snapshots of employee records.
//! Backends implement [`CacheStore`]; the Redis client is used in
//! production and [`MemoryCache`] stands in for tests and local runs.
//!
//! Every key carries an invalidation generation bumped by [`CacheStore::delete_many`].
//! A reader records the generation before it queries the store and populates
//! with [`CacheStore::set_ex_if_current`], so a write that lands in between
//! keeps the reader's older row out of the cache.

pub mod keys;
pub mod memory;
#[cfg(feature = "redis")]
pub mod redis_client;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::error::Result;

pub use memory::MemoryCache;
#[cfg(feature = "redis")]
pub use redis_client::{CacheClient, CacheConfig};

/// Raw string cache operations needed by the read-through layer
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Get the value stored under `key`, `None` if absent or expired
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value and resetting its TTL
    async fn set_ex(&self, key: &str, value: String, ttl: Duration) -> Result<()>;

    /// Store `value` only while the generation of `key` still equals `seen`.
    /// Returns whether the value was stored.
    async fn set_ex_if_current(
        &self,
        key: &str,
        value: String,
        ttl: Duration,
        seen: u64,
    ) -> Result<bool>;

    /// Current invalidation generation of `key`, 0 if never invalidated
    async fn generation(&self, key: &str) -> Result<u64>;

    /// Delete keys and bump their generations, returning how many existed
    async fn delete_many(&self, keys: &[String]) -> Result<u64>;
}

/// Cache TTL configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheTtl {
    pub employee: Duration,
    pub employee_list: Duration,
}

impl CacheTtl {
    /// Same TTL for both key families
    pub const fn uniform(ttl: Duration) -> Self {
        Self {
            employee: ttl,
            employee_list: ttl,
        }
    }
}

impl Default for CacheTtl {
    fn default() -> Self {
        Self::uniform(Duration::from_secs(3600))
    }
}

/// Shared cache handle
pub type SharedCache = Arc<dyn CacheStore>;
