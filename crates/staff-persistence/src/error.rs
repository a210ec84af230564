//! Persistence layer error types

use staff_domain::{DomainError, EmployeeId};
use thiserror::Error;

/// Persistence layer errors
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("PostgreSQL error: {0}")]
    Postgres(String),

    #[error("Redis error: {0}")]
    Redis(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Connection pool exhausted")]
    PoolExhausted,

    #[error("Call timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Constraint violation: {0}")]
    Constraint(String),
}

impl From<serde_json::Error> for PersistenceError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(feature = "postgres")]
impl From<sqlx::Error> for PersistenceError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut => Self::PoolExhausted,
            sqlx::Error::Database(db) if db.constraint().is_some() => {
                Self::Constraint(db.message().to_string())
            }
            other => Self::Postgres(other.to_string()),
        }
    }
}

#[cfg(feature = "redis")]
impl From<redis::RedisError> for PersistenceError {
    fn from(err: redis::RedisError) -> Self {
        Self::Redis(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PersistenceError>;

/// Errors surfaced by [`EmployeeService`](crate::service::EmployeeService)
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Employee {id} not found")]
    NotFound { id: EmployeeId },

    #[error("Validation failed: {0}")]
    Validation(#[from] DomainError),

    #[error("Record store fault: {0}")]
    Store(PersistenceError),

    #[error("Cache invalidation failed: {0}")]
    CacheInvalidation(PersistenceError),
}

impl ServiceError {
    /// Whether this error is a fault of a backing system rather than the caller
    pub fn is_fault(&self) -> bool {
        matches!(self, Self::Store(_) | Self::CacheInvalidation(_))
    }
}

pub type ServiceResult<T> = std::result::Result<T, ServiceError>;
