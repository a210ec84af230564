//! PostgreSQL repository implementation.

use async_trait::async_trait;
use sqlx::FromRow;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;

use super::traits::EmployeeRepository;
use crate::error::Result;
use staff_domain::{Employee, EmployeeAttributes, EmployeeId};

// =============================================================================
// POSTGRES CONFIGURATION
// =============================================================================

/// PostgreSQL connection configuration.
#[derive(Debug, Clone)]
pub struct PgConfig {
    pub url: String,
    pub max_connections: u32,
    /// Upper bound on waiting for a pooled connection
    pub acquire_timeout: Duration,
}

impl Default for PgConfig {
    fn default() -> Self {
        Self {
            url: "postgres://postgres@localhost:5432/employees".to_string(),
            max_connections: 10,
            acquire_timeout: Duration::from_secs(5),
        }
    }
}

// =============================================================================
// ROW MAPPING
// =============================================================================

#[derive(Debug, FromRow)]
struct EmployeeRow {
    id: i64,
    name: String,
    title: String,
    email: Option<String>,
    address: Option<String>,
    phone: Option<String>,
    organization: Option<String>,
    department: Option<String>,
    office: Option<String>,
    status: Option<String>,
    pay: Option<String>,
}

impl From<EmployeeRow> for Employee {
    fn from(row: EmployeeRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            title: row.title,
            email: row.email,
            address: row.address,
            phone: row.phone,
            organization: row.organization,
            department: row.department,
            office: row.office,
            status: row.status,
            pay: row.pay,
        }
    }
}

// =============================================================================
// EMPLOYEE REPOSITORY
// =============================================================================

/// Employee repository on a shared PostgreSQL pool.
#[derive(Clone)]
pub struct PgEmployeeRepository {
    pool: PgPool,
}

impl PgEmployeeRepository {
    /// Open a connection pool.
    ///
    /// Connections are handed out in request order and return to the pool
    /// when dropped, including when the owning future is cancelled.
    pub async fn connect(config: &PgConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect(&config.url)
            .await?;

        tracing::info!(max_connections = config.max_connections, "PostgreSQL pool ready");

        Ok(Self { pool })
    }

    /// Create the employees table if it does not exist yet.
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS employees (
                id BIGSERIAL PRIMARY KEY,
                name VARCHAR(255) NOT NULL,
                title VARCHAR(255) NOT NULL,
                email VARCHAR(255),
                address VARCHAR(255),
                phone VARCHAR(255),
                organization VARCHAR(255),
                department VARCHAR(255),
                office VARCHAR(255),
                status VARCHAR(255),
                pay VARCHAR(255)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        tracing::info!("Employees table exists");
        Ok(())
    }
}

#[async_trait]
impl EmployeeRepository for PgEmployeeRepository {
    async fn create(&self, attrs: &EmployeeAttributes) -> Result<Employee> {
        let row = sqlx::query_as::<_, EmployeeRow>(
            r#"
            INSERT INTO employees
                (name, title, email, address, phone, organization, department, office, status, pay)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id, name, title, email, address, phone,
                      organization, department, office, status, pay
            "#,
        )
        .bind(&attrs.name)
        .bind(&attrs.title)
        .bind(&attrs.email)
        .bind(&attrs.address)
        .bind(&attrs.phone)
        .bind(&attrs.organization)
        .bind(&attrs.department)
        .bind(&attrs.office)
        .bind(&attrs.status)
        .bind(&attrs.pay)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn list(&self) -> Result<Vec<Employee>> {
        let rows = sqlx::query_as::<_, EmployeeRow>(
            r#"
            SELECT id, name, title, email, address, phone,
                   organization, department, office, status, pay
            FROM employees
            ORDER BY id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Employee::from).collect())
    }

    async fn get_by_id(&self, id: EmployeeId) -> Result<Option<Employee>> {
        let row = sqlx::query_as::<_, EmployeeRow>(
            r#"
            SELECT id, name, title, email, address, phone,
                   organization, department, office, status, pay
            FROM employees
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Employee::from))
    }

    async fn update(
        &self,
        id: EmployeeId,
        attrs: &EmployeeAttributes,
    ) -> Result<Option<Employee>> {
        let row = sqlx::query_as::<_, EmployeeRow>(
            r#"
            UPDATE employees
            SET name = $1, title = $2, email = $3, address = $4, phone = $5,
                organization = $6, department = $7, office = $8, status = $9, pay = $10
            WHERE id = $11
            RETURNING id, name, title, email, address, phone,
                      organization, department, office, status, pay
            "#,
        )
        .bind(&attrs.name)
        .bind(&attrs.title)
        .bind(&attrs.email)
        .bind(&attrs.address)
        .bind(&attrs.phone)
        .bind(&attrs.organization)
        .bind(&attrs.department)
        .bind(&attrs.office)
        .bind(&attrs.status)
        .bind(&attrs.pay)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Employee::from))
    }

    async fn delete(&self, id: EmployeeId) -> Result<Option<Employee>> {
        let row = sqlx::query_as::<_, EmployeeRow>(
            r#"
            DELETE FROM employees
            WHERE id = $1
            RETURNING id, name, title, email, address, phone,
                      organization, department, office, status, pay
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Employee::from))
    }
}
