//! # Staff Persistence Library
//!
//! Record store and read-through cache for the employee directory.
//!
//! ## Architecture
//!
//! This crate implements the Repository pattern with pluggable Strategy pattern
//! for cache/database access:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     HTTP Adapter                             │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   EmployeeService                            │
//! │     (ReadStrategy: cache-first · WriteStrategy: write-around)│
//! └─────────────────────────────────────────────────────────────┘
//!                    │                   │
//!                    ▼                   ▼
//! ┌─────────────────────────┐   ┌──────────────────────────────┐
//! │     CacheStore          │   │     EmployeeRepository       │
//! │  (Redis / in-memory)    │   │ (PostgreSQL, source of truth)│
//! └─────────────────────────┘   └──────────────────────────────┘
//! ```
//!
//! ## Features
//!
//! - `postgres`: Enable PostgreSQL backend (default)
//! - `redis`: Enable Redis cache layer (default)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use staff_persistence::{CacheClient, CacheConfig, EmployeeService, PgConfig, PgEmployeeRepository};
//!
//! let repo = PgEmployeeRepository::connect(&PgConfig::default()).await?;
//! repo.ensure_schema().await?;
//! let cache = CacheClient::new(CacheConfig::default()).await?;
//!
//! let service = EmployeeService::new(Arc::new(repo), Arc::new(cache));
//! let employees = service.list(&RequestContext::generate()).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod cache;
pub mod error;
pub mod repository;
pub mod service;
pub mod strategy;

// Re-export commonly used types
pub use cache::{CacheStore, CacheTtl, MemoryCache, SharedCache};
#[cfg(feature = "redis")]
pub use cache::{CacheClient, CacheConfig};
pub use error::{PersistenceError, Result, ServiceError, ServiceResult};
pub use repository::{EmployeeRepository, InMemoryEmployeeRepository};
#[cfg(feature = "postgres")]
pub use repository::{PgConfig, PgEmployeeRepository};
pub use service::{EmployeeService, ServiceOptions, SharedRepository};
pub use strategy::{ReadSource, ReadStrategy, WriteStrategy};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
