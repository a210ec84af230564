//! Cache key layout.

use staff_domain::EmployeeId;

/// Key holding the full collection, ordered by id
pub const EMPLOYEE_LIST_KEY: &str = "employees:all";

/// Prefix of per-record keys
pub const EMPLOYEE_KEY_PREFIX: &str = "employee:id:";

/// Key holding a single employee
pub fn employee(id: EmployeeId) -> String {
    format!("{EMPLOYEE_KEY_PREFIX}{id}")
}

/// Prefix of the counters fencing snapshot keys against stale population
pub const GENERATION_KEY_PREFIX: &str = "generation:";

/// Invalidation counter of a snapshot key
pub fn generation(key: &str) -> String {
    format!("{GENERATION_KEY_PREFIX}{key}")
}

/// Every key whose snapshot a write to `id` can make stale
pub fn write_scope(id: EmployeeId) -> Vec<String> {
    vec![EMPLOYEE_LIST_KEY.to_string(), employee(id)]
}
