//! # Redis Cache Layer
//!
//! Redis-backed [`CacheStore`] for employee snapshots.
//!
//! Generations live in `generation:{key}` counters. Invalidation deletes the
//! snapshots and bumps their counters in one `MULTI`/`EXEC`; conditional
//! population compares and writes inside a Lua script, so neither can
//! interleave with the other.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, Script};
use std::time::Duration;

use super::CacheStore;
use super::keys::generation as generation_key;
use crate::error::Result;

/// Generation counters outlive any in-flight read by a wide margin
const GENERATION_TTL_SECS: i64 = 24 * 60 * 60;

const SET_IF_CURRENT: &str = r"
local current = tonumber(redis.call('GET', KEYS[2]) or '0')
if current == tonumber(ARGV[2]) then
    redis.call('SET', KEYS[1], ARGV[1], 'EX', ARGV[3])
    return 1
end
return 0
";

/// Redis cache configuration
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub url: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
        }
    }
}

/// Redis cache client over a multiplexed, auto-reconnecting connection
#[derive(Clone)]
pub struct CacheClient {
    conn: ConnectionManager,
    set_if_current: Script,
}

impl CacheClient {
    /// Create a new cache client
    pub async fn new(config: CacheConfig) -> Result<Self> {
        let client = Client::open(config.url.as_str())?;
        let conn = ConnectionManager::new(client).await?;

        Ok(Self {
            conn,
            set_if_current: Script::new(SET_IF_CURRENT),
        })
    }

    /// Round-trip a `PING` to verify the server is reachable
    pub async fn ping(&self) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}

/// SETEX rejects a zero expiry
fn expiry_secs(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

#[async_trait]
impl CacheStore for CacheClient {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set_ex(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.set_ex(key, value, expiry_secs(ttl)).await?;
        Ok(())
    }

    async fn set_ex_if_current(
        &self,
        key: &str,
        value: String,
        ttl: Duration,
        seen: u64,
    ) -> Result<bool> {
        let mut conn = self.conn.clone();
        let stored: i64 = self
            .set_if_current
            .key(key)
            .key(generation_key(key))
            .arg(value)
            .arg(seen)
            .arg(expiry_secs(ttl))
            .invoke_async(&mut conn)
            .await?;
        Ok(stored == 1)
    }

    async fn generation(&self, key: &str) -> Result<u64> {
        let mut conn = self.conn.clone();
        let value: Option<u64> = conn.get(generation_key(key)).await?;
        Ok(value.unwrap_or(0))
    }

    async fn delete_many(&self, keys: &[String]) -> Result<u64> {
        if keys.is_empty() {
            return Ok(0);
        }

        let mut pipe = redis::pipe();
        pipe.atomic().del(keys);
        for key in keys {
            let counter = generation_key(key);
            pipe.incr(&counter, 1)
                .ignore()
                .expire(&counter, GENERATION_TTL_SECS)
                .ignore();
        }

        let mut conn = self.conn.clone();
        let (deleted,): (u64,) = pipe.query_async(&mut conn).await?;
        Ok(deleted)
    }
}
