//! # Repository Traits
//!
//! Abstract record store interface for employees.
//! Implementations can be swapped for different backends (PostgreSQL, in-memory, etc.)

use async_trait::async_trait;

use crate::error::Result;
use staff_domain::{Employee, EmployeeAttributes, EmployeeId};

// =============================================================================
// EMPLOYEE REPOSITORY
// =============================================================================

/// Record store for Employee rows.
///
/// Each method is a single statement against the store; writes return the
/// affected row as read back by that same statement.
#[async_trait]
pub trait EmployeeRepository: Send + Sync {
    /// Insert a new employee; the store assigns the id
    async fn create(&self, attrs: &EmployeeAttributes) -> Result<Employee>;

    /// All employees ordered by id ascending
    async fn list(&self) -> Result<Vec<Employee>>;

    /// Get employee by ID
    async fn get_by_id(&self, id: EmployeeId) -> Result<Option<Employee>>;

    /// Overwrite every mutable field, `None` if no row matched
    async fn update(
        &self,
        id: EmployeeId,
        attrs: &EmployeeAttributes,
    ) -> Result<Option<Employee>>;

    /// Delete by id, returning the deleted row, `None` if no row matched
    async fn delete(&self, id: EmployeeId) -> Result<Option<Employee>>;
}
