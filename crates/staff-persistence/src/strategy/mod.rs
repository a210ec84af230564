//! # Strategy Module
//!
//! Enum-based cache/database access strategies using dispatch pattern.
//!
//! ## Available Strategies
//!
//! ### Read Strategies
//! - `CacheFirst` - Check cache, fall back to DB on miss and populate unless the
//!   key was invalidated while the DB read was in flight (default)
//! - `DbOnly` - Skip cache entirely
//!
//! ### Write Strategies
//! - `WriteAround` - Write DB, then invalidate; invalidation failure fails the write (default)
//! - `WriteAroundLenient` - Write DB, then invalidate; invalidation failure is logged
//!
//! ## Example
//!
//! ```rust,ignore
//! use staff_persistence::strategy::{ReadStrategy, WriteStrategy};
//!
//! let fetched = ReadStrategy::CacheFirst
//!     .read(
//!         || cache_lookup(key),
//!         || generation(key),
//!         || db.get_by_id(id),
//!         |row, seen| populate_if_current(key, row, seen),
//!     )
//!     .await?;
//!
//! let updated = WriteStrategy::WriteAround
//!     .write(|| db.update(id, &attrs), |row| invalidate(row.id))
//!     .await?;
//! ```

pub mod read_strategy;
pub mod write_strategy;

pub use read_strategy::{CacheError, DbError, Fetched, ReadSource, ReadStrategy};
pub use write_strategy::{WriteError, WriteStrategy};
