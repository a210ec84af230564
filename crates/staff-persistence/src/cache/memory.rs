//! In-process cache on `DashMap` with per-entry expiry.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::CacheStore;
use crate::error::Result;

struct CacheEntry {
    value: String,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

/// A key's value and its invalidation generation, updated under one shard lock
#[derive(Default)]
struct Slot {
    entry: Option<CacheEntry>,
    generation: u64,
}

/// In-memory cache with TTL support
#[derive(Clone, Default)]
pub struct MemoryCache {
    data: Arc<DashMap<String, Slot>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (unexpired) entries
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.data
            .iter()
            .filter(|slot| slot.entry.as_ref().is_some_and(|e| e.is_live(now)))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check if key exists and has not expired
    pub fn contains(&self, key: &str) -> bool {
        let now = Instant::now();
        self.data
            .get(key)
            .is_some_and(|slot| slot.entry.as_ref().is_some_and(|e| e.is_live(now)))
    }

    /// Drop every expired entry, returning how many were removed.
    /// Generations survive so in-flight reads stay fenced.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut purged = 0;
        self.data.retain(|_, slot| {
            if slot.entry.as_ref().is_some_and(|e| !e.is_live(now)) {
                slot.entry = None;
                purged += 1;
            }
            slot.entry.is_some() || slot.generation > 0
        });
        purged
    }

    fn store(slot: &mut Slot, value: String, ttl: Duration) {
        slot.entry = Some(CacheEntry {
            value,
            expires_at: Instant::now() + ttl,
        });
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let Some(mut slot) = self.data.get_mut(key) else {
            return Ok(None);
        };

        let now = Instant::now();
        if slot.entry.as_ref().is_some_and(|e| !e.is_live(now)) {
            slot.entry = None;
        }
        Ok(slot.entry.as_ref().map(|e| e.value.clone()))
    }

    async fn set_ex(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
        let mut slot = self.data.entry(key.to_string()).or_default();
        Self::store(&mut slot, value, ttl);
        Ok(())
    }

    async fn set_ex_if_current(
        &self,
        key: &str,
        value: String,
        ttl: Duration,
        seen: u64,
    ) -> Result<bool> {
        let mut slot = self.data.entry(key.to_string()).or_default();
        if slot.generation != seen {
            return Ok(false);
        }
        Self::store(&mut slot, value, ttl);
        Ok(true)
    }

    async fn generation(&self, key: &str) -> Result<u64> {
        Ok(self.data.get(key).map_or(0, |slot| slot.generation))
    }

    async fn delete_many(&self, keys: &[String]) -> Result<u64> {
        let now = Instant::now();
        let mut removed = 0;
        for key in keys {
            let mut slot = self.data.entry(key.clone()).or_default();
            if slot.entry.take().is_some_and(|e| e.is_live(now)) {
                removed += 1;
            }
            slot.generation = slot.generation.wrapping_add(1);
        }
        Ok(removed)
    }
}
