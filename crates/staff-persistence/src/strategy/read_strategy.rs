//! Read strategy implementations using enum dispatch.

use std::fmt::Debug;
use std::future::Future;

use crate::error::PersistenceError;

/// Read strategy enum - determines cache/db access pattern.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReadStrategy {
    /// Check cache first, fall back to DB on miss and populate the cache
    #[default]
    CacheFirst,
    /// Only read from database, skip cache
    DbOnly,
}

/// Where a read was answered from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadSource {
    Cache,
    Store,
}

/// Result of a strategy read.
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched<T> {
    pub value: Option<T>,
    pub source: ReadSource,
}

impl ReadStrategy {
    /// Execute a read operation according to the strategy.
    ///
    /// - `cache_fn`: Async function to read from cache
    /// - `fence_fn`: Async function capturing the cache key's invalidation
    ///   generation, taken before the DB read
    /// - `db_fn`: Async function to read from database
    /// - `populate_fn`: Async function to populate cache after a DB hit; it
    ///   receives the fence and reports whether the value was stored
    ///
    /// Cache errors never fail the read: a failed lookup is treated as a
    /// miss and a failed population is only logged. DB errors propagate.
    /// Without a fence the DB value is returned but not cached.
    pub async fn read<T, G, CacheFut, FenceFut, DbFut, PopulateFut>(
        &self,
        cache_fn: impl FnOnce() -> CacheFut,
        fence_fn: impl FnOnce() -> FenceFut,
        db_fn: impl FnOnce() -> DbFut,
        populate_fn: impl FnOnce(T, G) -> PopulateFut,
    ) -> Result<Fetched<T>, DbError>
    where
        T: Clone + Debug,
        CacheFut: Future<Output = Result<Option<T>, CacheError>>,
        FenceFut: Future<Output = Result<G, CacheError>>,
        DbFut: Future<Output = Result<Option<T>, DbError>>,
        PopulateFut: Future<Output = Result<bool, CacheError>>,
    {
        match self {
            Self::CacheFirst => {
                match cache_fn().await {
                    Ok(Some(value)) => {
                        tracing::debug!("Cache hit");
                        return Ok(Fetched {
                            value: Some(value),
                            source: ReadSource::Cache,
                        });
                    }
                    Ok(None) => {
                        tracing::debug!("Cache miss, falling back to DB");
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Cache error, falling back to DB");
                    }
                }

                let fence = match fence_fn().await {
                    Ok(fence) => Some(fence),
                    Err(e) => {
                        tracing::warn!(error = %e, "Cache generation unavailable, result will not be cached");
                        None
                    }
                };

                let value = db_fn().await?;

                // Absent rows are never cached
                if let (Some(found), Some(fence)) = (&value, fence) {
                    match populate_fn(found.clone(), fence).await {
                        Ok(true) => {}
                        Ok(false) => {
                            tracing::debug!("Key invalidated during read, snapshot not cached");
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "Failed to populate cache");
                        }
                    }
                }

                Ok(Fetched {
                    value,
                    source: ReadSource::Store,
                })
            }

            Self::DbOnly => Ok(Fetched {
                value: db_fn().await?,
                source: ReadSource::Store,
            }),
        }
    }
}

/// Cache operation error.
#[derive(Debug, thiserror::Error)]
#[error("Cache error: {0}")]
pub struct CacheError(#[from] pub PersistenceError);

/// Database operation error.
#[derive(Debug, thiserror::Error)]
#[error("Database error: {0}")]
pub struct DbError(#[from] pub PersistenceError);
