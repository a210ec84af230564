//! # Employee Service
//!
//! Single authority over employee data. Reads go through the cache with
//! [`ReadStrategy`]; writes go to the record store first and then
//! invalidate, never update, the cache keys they make stale
//! ([`WriteStrategy`]).
//!
//! Cache entries are therefore either absent or equal to what the store
//! returned at population time, and every successful write removes the
//! collection snapshot and the per-record snapshot of the row it touched.
//! A read populates only if no invalidation of its key happened since it
//! started, so a row fetched before a concurrent write never outlives it.

use serde::{Serialize, de::DeserializeOwned};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{CacheTtl, SharedCache, keys};
use crate::error::{PersistenceError, ServiceError, ServiceResult};
use crate::repository::EmployeeRepository;
use crate::strategy::{CacheError, DbError, ReadSource, ReadStrategy, WriteError, WriteStrategy};
use staff_domain::{Employee, EmployeeAttributes, EmployeeId, RequestContext, ValidationProfile};

/// Shared record store handle
pub type SharedRepository = Arc<dyn EmployeeRepository>;

/// Tunables for [`EmployeeService`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceOptions {
    pub read_strategy: ReadStrategy,
    pub write_strategy: WriteStrategy,
    pub ttl: CacheTtl,
    /// Deadline applied to every individual store and cache call
    pub call_timeout: Duration,
    pub validation: ValidationProfile,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            read_strategy: ReadStrategy::CacheFirst,
            write_strategy: WriteStrategy::WriteAround,
            ttl: CacheTtl::default(),
            call_timeout: Duration::from_secs(5),
            validation: ValidationProfile::Minimal,
        }
    }
}

/// Orchestrates reads and writes across the record store and the cache.
#[derive(Clone)]
pub struct EmployeeService {
    repo: SharedRepository,
    cache: SharedCache,
    options: ServiceOptions,
}

impl EmployeeService {
    /// Create a service with default options.
    pub fn new(repo: SharedRepository, cache: SharedCache) -> Self {
        Self::with_options(repo, cache, ServiceOptions::default())
    }

    /// Create with custom options.
    pub fn with_options(repo: SharedRepository, cache: SharedCache, options: ServiceOptions) -> Self {
        Self {
            repo,
            cache,
            options,
        }
    }

    pub fn options(&self) -> &ServiceOptions {
        &self.options
    }

    // =========================================================================
    // WRITES
    // =========================================================================

    /// Insert a new employee and return it with its store-assigned id.
    pub async fn create(
        &self,
        ctx: &RequestContext,
        attrs: EmployeeAttributes,
    ) -> ServiceResult<Employee> {
        let attrs = self.validated(ctx, attrs)?;

        let created = self
            .options
            .write_strategy
            .write(
                || async { self.store(self.repo.create(&attrs)).await.map(Some) },
                |row: &Employee| self.invalidate(row.id),
            )
            .await
            .map_err(|e| write_failure(ctx, "creating", None, e))?
            .ok_or_else(|| {
                ServiceError::Store(PersistenceError::Postgres("INSERT returned no row".into()))
            })?;

        tracing::info!(
            employee_id = created.id,
            request_id = %ctx.request_id,
            "Employee created successfully"
        );
        Ok(created)
    }

    /// Overwrite every mutable field of `id`.
    pub async fn update(
        &self,
        ctx: &RequestContext,
        id: EmployeeId,
        attrs: EmployeeAttributes,
    ) -> ServiceResult<Employee> {
        let attrs = self.validated(ctx, attrs)?;

        let updated = self
            .options
            .write_strategy
            .write(
                || self.store(self.repo.update(id, &attrs)),
                |row: &Employee| self.invalidate(row.id),
            )
            .await
            .map_err(|e| write_failure(ctx, "updating", Some(id), e))?;

        match updated {
            Some(employee) => {
                tracing::info!(employee_id = id, request_id = %ctx.request_id, "Employee updated successfully");
                Ok(employee)
            }
            None => Err(not_found(ctx, id)),
        }
    }

    /// Delete `id`, returning its last-known values.
    pub async fn delete(&self, ctx: &RequestContext, id: EmployeeId) -> ServiceResult<Employee> {
        let deleted = self
            .options
            .write_strategy
            .write(
                || self.store(self.repo.delete(id)),
                |row: &Employee| self.invalidate(row.id),
            )
            .await
            .map_err(|e| write_failure(ctx, "deleting", Some(id), e))?;

        match deleted {
            Some(employee) => {
                tracing::info!(employee_id = id, request_id = %ctx.request_id, "Employee deleted successfully");
                Ok(employee)
            }
            None => Err(not_found(ctx, id)),
        }
    }

    // =========================================================================
    // READS
    // =========================================================================

    /// All employees ordered by id ascending.
    pub async fn list(&self, ctx: &RequestContext) -> ServiceResult<Vec<Employee>> {
        let ttl = self.options.ttl.employee_list;

        let fetched = self
            .options
            .read_strategy
            .read(
                || self.cached::<Vec<Employee>>(keys::EMPLOYEE_LIST_KEY),
                || self.generation(keys::EMPLOYEE_LIST_KEY),
                || async { self.store(self.repo.list()).await.map(Some) },
                |employees: Vec<Employee>, seen: u64| async move {
                    self.populate(keys::EMPLOYEE_LIST_KEY, &employees, ttl, seen).await
                },
            )
            .await
            .map_err(|DbError(e)| {
                tracing::error!(error = %e, request_id = %ctx.request_id, "Error getting all employees");
                ServiceError::Store(e)
            })?;

        let employees = fetched.value.unwrap_or_default();
        match fetched.source {
            ReadSource::Cache => {
                tracing::info!(count = employees.len(), request_id = %ctx.request_id, "Serving all employees from cache");
            }
            ReadSource::Store => {
                tracing::info!(count = employees.len(), request_id = %ctx.request_id, "Fetched all employees from database");
            }
        }
        Ok(employees)
    }

    /// A single employee by id.
    pub async fn get_by_id(&self, ctx: &RequestContext, id: EmployeeId) -> ServiceResult<Employee> {
        let key = keys::employee(id);
        let ttl = self.options.ttl.employee;

        let fetched = self
            .options
            .read_strategy
            .read(
                || self.cached::<Employee>(&key),
                || self.generation(&key),
                || self.store(self.repo.get_by_id(id)),
                |employee: Employee, seen: u64| {
                    let key = &key;
                    async move { self.populate(key, &employee, ttl, seen).await }
                },
            )
            .await
            .map_err(|DbError(e)| {
                tracing::error!(error = %e, employee_id = id, request_id = %ctx.request_id, "Error getting employee by ID");
                ServiceError::Store(e)
            })?;

        let Some(employee) = fetched.value else {
            return Err(not_found(ctx, id));
        };

        match fetched.source {
            ReadSource::Cache => {
                tracing::info!(employee_id = id, request_id = %ctx.request_id, "Serving single employee from cache");
            }
            ReadSource::Store => {
                tracing::info!(employee_id = id, request_id = %ctx.request_id, "Fetched single employee from database");
            }
        }
        Ok(employee)
    }

    // =========================================================================
    // HELPERS
    // =========================================================================

    fn validated(
        &self,
        ctx: &RequestContext,
        attrs: EmployeeAttributes,
    ) -> ServiceResult<EmployeeAttributes> {
        let attrs = attrs.normalized();
        if let Err(e) = attrs.validate(self.options.validation) {
            tracing::warn!(error = %e, request_id = %ctx.request_id, "Rejected employee attributes");
            return Err(e.into());
        }
        Ok(attrs)
    }

    /// Run a store call under the call deadline.
    async fn store<T>(
        &self,
        call: impl Future<Output = crate::error::Result<T>>,
    ) -> Result<T, DbError> {
        Ok(with_deadline(self.options.call_timeout, call).await?)
    }

    async fn cached<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CacheError> {
        let raw = with_deadline(self.options.call_timeout, self.cache.get(key)).await?;
        let decoded = raw
            .map(|json| serde_json::from_str(&json))
            .transpose()
            .map_err(PersistenceError::from)?;
        Ok(decoded)
    }

    async fn generation(&self, key: &str) -> Result<u64, CacheError> {
        Ok(with_deadline(self.options.call_timeout, self.cache.generation(key)).await?)
    }

    /// Cache `value` unless `key` was invalidated after `seen` was read.
    async fn populate<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
        seen: u64,
    ) -> Result<bool, CacheError> {
        let json = serde_json::to_string(value).map_err(PersistenceError::from)?;
        let stored = with_deadline(
            self.options.call_timeout,
            self.cache.set_ex_if_current(key, json, ttl, seen),
        )
        .await?;
        Ok(stored)
    }

    async fn invalidate(&self, id: EmployeeId) -> Result<(), CacheError> {
        let scope = keys::write_scope(id);
        let removed = with_deadline(self.options.call_timeout, self.cache.delete_many(&scope)).await?;
        tracing::debug!(employee_id = id, removed, "Invalidated cache entries");
        Ok(())
    }
}

/// Bound a store or cache call; dropping the call on expiry releases any
/// connection it holds.
async fn with_deadline<T>(
    timeout: Duration,
    call: impl Future<Output = crate::error::Result<T>>,
) -> crate::error::Result<T> {
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(PersistenceError::Timeout {
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        }),
    }
}

fn not_found(ctx: &RequestContext, id: EmployeeId) -> ServiceError {
    tracing::warn!(employee_id = id, request_id = %ctx.request_id, "Employee not found");
    ServiceError::NotFound { id }
}

fn write_failure(
    ctx: &RequestContext,
    action: &str,
    id: Option<EmployeeId>,
    err: WriteError,
) -> ServiceError {
    tracing::error!(
        error = %err,
        employee_id = ?id,
        request_id = %ctx.request_id,
        "Error {action} employee"
    );
    match err {
        WriteError::Database(DbError(e)) => ServiceError::Store(e),
        WriteError::Invalidation(CacheError(e)) => ServiceError::CacheInvalidation(e),
    }
}
