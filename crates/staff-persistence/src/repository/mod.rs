//! # Repository Module
//!
//! Repository pattern implementations for employee persistence.

pub mod memory_impl;
#[cfg(feature = "postgres")]
pub mod postgres_impl;
pub mod traits;

pub use memory_impl::InMemoryEmployeeRepository;
#[cfg(feature = "postgres")]
pub use postgres_impl::{PgConfig, PgEmployeeRepository};
pub use traits::EmployeeRepository;
