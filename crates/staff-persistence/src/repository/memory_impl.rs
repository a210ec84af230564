//! In-memory repository implementation.
//!
//! Behaves like the relational store for a single process: ids come from a
//! monotonically increasing counter and are never reused, and each call is
//! atomic with respect to the others.

use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use super::traits::EmployeeRepository;
use crate::error::Result;
use staff_domain::{Employee, EmployeeAttributes, EmployeeId};

#[derive(Debug)]
struct Table {
    rows: BTreeMap<EmployeeId, Employee>,
    next_id: EmployeeId,
}

/// Employee repository held entirely in process memory
#[derive(Debug)]
pub struct InMemoryEmployeeRepository {
    table: RwLock<Table>,
}

impl InMemoryEmployeeRepository {
    pub fn new() -> Self {
        Self {
            table: RwLock::new(Table {
                rows: BTreeMap::new(),
                next_id: 1,
            }),
        }
    }

    /// Number of stored rows
    pub async fn len(&self) -> usize {
        self.table.read().await.rows.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for InMemoryEmployeeRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmployeeRepository for InMemoryEmployeeRepository {
    async fn create(&self, attrs: &EmployeeAttributes) -> Result<Employee> {
        let mut table = self.table.write().await;
        let id = table.next_id;
        table.next_id += 1;

        let employee = Employee::from_attributes(id, attrs.clone());
        table.rows.insert(id, employee.clone());
        Ok(employee)
    }

    async fn list(&self) -> Result<Vec<Employee>> {
        // BTreeMap iterates in ascending key order
        Ok(self.table.read().await.rows.values().cloned().collect())
    }

    async fn get_by_id(&self, id: EmployeeId) -> Result<Option<Employee>> {
        Ok(self.table.read().await.rows.get(&id).cloned())
    }

    async fn update(
        &self,
        id: EmployeeId,
        attrs: &EmployeeAttributes,
    ) -> Result<Option<Employee>> {
        let mut table = self.table.write().await;
        let Some(row) = table.rows.get_mut(&id) else {
            return Ok(None);
        };

        *row = Employee::from_attributes(id, attrs.clone());
        Ok(Some(row.clone()))
    }

    async fn delete(&self, id: EmployeeId) -> Result<Option<Employee>> {
        Ok(self.table.write().await.rows.remove(&id))
    }
}
