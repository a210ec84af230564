//! Write strategy implementations using enum dispatch.

use std::fmt::Debug;
use std::future::Future;

use super::read_strategy::{CacheError, DbError};

/// Write strategy enum - determines how the cache follows a DB write.
///
/// Both variants write the DB first and invalidate only after the write
/// affected a row. They differ in what an invalidation failure means.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WriteStrategy {
    /// Write to DB, then invalidate; a failed invalidation fails the write
    #[default]
    WriteAround,
    /// Write to DB, then invalidate; a failed invalidation is logged and the
    /// stale entry is left to expire
    WriteAroundLenient,
}

impl WriteStrategy {
    /// Execute a write operation according to the strategy.
    ///
    /// - `db_fn`: Async function performing the DB write, returning the
    ///   affected row or `None` when no row matched
    /// - `invalidate_fn`: Async function deleting every cache key the row's
    ///   write can make stale
    ///
    /// `invalidate_fn` is never called when `db_fn` fails or matches nothing.
    pub async fn write<T, DbFut, InvalidateFut>(
        &self,
        db_fn: impl FnOnce() -> DbFut,
        invalidate_fn: impl FnOnce(&T) -> InvalidateFut,
    ) -> Result<Option<T>, WriteError>
    where
        T: Debug,
        DbFut: Future<Output = Result<Option<T>, DbError>>,
        InvalidateFut: Future<Output = Result<(), CacheError>>,
    {
        let Some(row) = db_fn().await? else {
            return Ok(None);
        };

        match (self, invalidate_fn(&row).await) {
            (_, Ok(())) => Ok(Some(row)),
            (Self::WriteAround, Err(e)) => {
                tracing::error!(error = %e, "Failed to invalidate cache after write");
                Err(WriteError::Invalidation(e))
            }
            (Self::WriteAroundLenient, Err(e)) => {
                tracing::warn!(error = %e, "Failed to invalidate cache, serving stale until expiry");
                Ok(Some(row))
            }
        }
    }
}

/// Write operation error.
#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    #[error("Cache invalidation error: {0}")]
    Invalidation(CacheError),
    #[error("Database error: {0}")]
    Database(#[from] DbError),
}
