//! # API Context
//!
//! Application state and dependency injection for HTTP handlers.

use std::sync::Arc;

use crate::config::Environment;
use staff_persistence::{EmployeeService, SharedCache, SharedRepository, ServiceOptions};

/// Application context shared across all handlers
#[derive(Clone)]
pub struct ApiContext {
    /// Employee service (record store + cache)
    pub employees: Arc<EmployeeService>,

    /// Deployment environment
    pub environment: Environment,
}

impl ApiContext {
    /// Create a new API context around a constructed service
    pub fn new(employees: EmployeeService, environment: Environment) -> Self {
        Self {
            employees: Arc::new(employees),
            environment,
        }
    }
}

/// Builder for ApiContext
#[derive(Default)]
pub struct ApiContextBuilder {
    repo: Option<SharedRepository>,
    cache: Option<SharedCache>,
    options: ServiceOptions,
    environment: Environment,
}

impl ApiContextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_repository(mut self, repo: SharedRepository) -> Self {
        self.repo = Some(repo);
        self
    }

    pub fn with_cache(mut self, cache: SharedCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_options(mut self, options: ServiceOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    pub fn build(self) -> Result<ApiContext, &'static str> {
        let repo = self.repo.ok_or("Record store required")?;
        let cache = self.cache.ok_or("Cache client required")?;
        let service = EmployeeService::with_options(repo, cache, self.options);
        Ok(ApiContext::new(service, self.environment))
    }
}
