//! # API Configuration
//!
//! Environment-based configuration for the employee directory service.

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use axum::http::HeaderValue;
use staff_domain::ValidationProfile;
use staff_persistence::{CacheTtl, ReadStrategy, ServiceOptions, WriteStrategy};
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {key}: '{value}'")]
    Invalid { key: &'static str, value: String },
}

/// Deployment environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    /// Whether internal fault detail may be shown to clients
    pub fn exposes_fault_detail(self) -> bool {
        self == Self::Development
    }
}

impl FromStr for Environment {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            _ => Err(()),
        }
    }
}

/// What to do when a cache invalidation fails after a successful write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InvalidationPolicy {
    /// Fail the request
    #[default]
    Propagate,
    /// Log and serve possibly stale data until the entry expires
    Log,
}

impl FromStr for InvalidationPolicy {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "propagate" => Ok(Self::Propagate),
            "log" => Ok(Self::Log),
            _ => Err(()),
        }
    }
}

/// API server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address
    pub server_addr: SocketAddr,

    pub environment: Environment,

    /// PostgreSQL configuration
    pub database: DatabaseConfig,

    /// Redis configuration
    pub redis: RedisConfig,

    /// Read-through cache behaviour
    pub cache: CacheSettings,

    /// Deadline for each store and cache call
    pub connection_timeout: Duration,

    pub invalidation_policy: InvalidationPolicy,

    pub validation_profile: ValidationProfile,

    /// Logging level
    pub log_level: String,

    /// Transport policies applied by the router
    pub http: HttpConfig,
}

/// PostgreSQL connection configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// Redis connection configuration
#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub url: String,
}

/// Router-level policies
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Origins allowed to make credentialed cross-origin requests
    pub cors_origins: Vec<HeaderValue>,
    pub rate_limit: RateLimitConfig,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            cors_origins: vec![HeaderValue::from_static(DEFAULT_CORS_ORIGIN)],
            rate_limit: RateLimitConfig::default(),
        }
    }
}

/// Per-client request quota
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub window: Duration,
    /// Requests allowed per client within `window`
    pub max_requests: u32,
    /// Message returned with 429 responses
    pub message: String,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window: Duration::from_millis(DEFAULT_RATE_LIMIT_WINDOW_MS),
            max_requests: DEFAULT_RATE_LIMIT_MAX,
            message: DEFAULT_RATE_LIMIT_MESSAGE.to_string(),
        }
    }
}

const DEFAULT_CORS_ORIGIN: &str = "http://localhost:3000";
const DEFAULT_RATE_LIMIT_WINDOW_MS: u64 = 15 * 60 * 1000;
const DEFAULT_RATE_LIMIT_MAX: u32 = 100;
const DEFAULT_RATE_LIMIT_MESSAGE: &str =
    "Too many requests from this IP address, please try again later";

#[derive(Debug, Clone, Copy)]
pub struct CacheSettings {
    pub enabled: bool,
    pub ttl: Duration,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let database_url = var("DATABASE_URL").unwrap_or_else(|| {
            let user = var("DB_USER").unwrap_or_else(|| "postgres".to_string());
            let credentials = match var("DB_PASSWORD") {
                Some(password) => format!("{user}:{password}"),
                None => user,
            };
            format!(
                "postgres://{credentials}@{}:{}/{}",
                var("DB_HOST").unwrap_or_else(|| "localhost".to_string()),
                var("DB_PORT").unwrap_or_else(|| "5432".to_string()),
                var("DB_NAME").unwrap_or_else(|| "employees".to_string()),
            )
        });

        let redis_url = var("REDIS_URL").unwrap_or_else(|| {
            let auth = var("REDIS_PASSWORD")
                .map(|p| format!(":{p}@"))
                .unwrap_or_default();
            format!(
                "redis://{auth}{}:{}",
                var("REDIS_HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
                var("REDIS_PORT").unwrap_or_else(|| "6379".to_string()),
            )
        });

        Ok(Self {
            server_addr: parse(&var, "SERVER_ADDR", "0.0.0.0:3000")?,

            environment: parse(&var, "APP_ENV", "development")?,

            database: DatabaseConfig {
                url: database_url,
                max_connections: parse(&var, "DB_MAX_CONNECTIONS", "10")?,
            },

            redis: RedisConfig { url: redis_url },

            cache: CacheSettings {
                enabled: parse_flag(&var, "CACHE_ENABLED", true)?,
                ttl: Duration::from_secs(parse(&var, "CACHE_TTL_SECS", "3600")?),
            },

            connection_timeout: Duration::from_millis(parse(&var, "CONNECTION_TIMEOUT_MS", "5000")?),

            invalidation_policy: parse(&var, "INVALIDATION_POLICY", "propagate")?,

            validation_profile: parse(&var, "VALIDATION_PROFILE", "minimal")?,

            log_level: var("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),

            http: HttpConfig {
                cors_origins: parse_origins(&var)?,
                rate_limit: RateLimitConfig {
                    window: Duration::from_millis(parse_positive(
                        &var,
                        "RATE_LIMIT_WINDOW_MS",
                        DEFAULT_RATE_LIMIT_WINDOW_MS,
                    )?),
                    max_requests: parse_positive(
                        &var,
                        "RATE_LIMIT_MAX",
                        DEFAULT_RATE_LIMIT_MAX,
                    )?,
                    message: var("RATE_LIMIT_MESSAGE")
                        .unwrap_or_else(|| DEFAULT_RATE_LIMIT_MESSAGE.to_string()),
                },
            },
        })
    }

    /// Options for the employee service derived from this configuration
    pub fn service_options(&self) -> ServiceOptions {
        ServiceOptions {
            read_strategy: if self.cache.enabled {
                ReadStrategy::CacheFirst
            } else {
                ReadStrategy::DbOnly
            },
            write_strategy: match self.invalidation_policy {
                InvalidationPolicy::Propagate => WriteStrategy::WriteAround,
                InvalidationPolicy::Log => WriteStrategy::WriteAroundLenient,
            },
            ttl: CacheTtl::uniform(self.cache.ttl),
            call_timeout: self.connection_timeout,
            validation: self.validation_profile,
        }
    }
}

fn parse<T: FromStr>(
    var: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: &str,
) -> Result<T, ConfigError> {
    let value = var(key).unwrap_or_else(|| default.to_string());
    let parsed = value.trim().parse();
    parsed.map_err(|_| ConfigError::Invalid { key, value })
}

fn parse_positive<T>(
    var: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr + PartialOrd + Default + ToString,
{
    let value: T = parse(var, key, &default.to_string())?;
    if value > T::default() {
        Ok(value)
    } else {
        Err(ConfigError::Invalid {
            key,
            value: value.to_string(),
        })
    }
}

/// Comma-separated origins; `*` is refused because credentials are allowed
fn parse_origins(var: &impl Fn(&str) -> Option<String>) -> Result<Vec<HeaderValue>, ConfigError> {
    const KEY: &str = "CORS_ALLOWED_ORIGINS";

    var(KEY)
        .unwrap_or_else(|| DEFAULT_CORS_ORIGIN.to_string())
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(|origin| {
            HeaderValue::from_str(origin)
                .ok()
                .filter(|_| origin != "*")
                .ok_or_else(|| ConfigError::Invalid {
                    key: KEY,
                    value: origin.to_string(),
                })
        })
        .collect()
}

fn parse_flag(
    var: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: bool,
) -> Result<bool, ConfigError> {
    match var(key) {
        None => Ok(default),
        Some(v) => {
            let flag = v.trim().to_ascii_lowercase();
            match flag.as_str() {
                "true" | "1" | "yes" => Ok(true),
                "false" | "0" | "no" => Ok(false),
                _ => Err(ConfigError::Invalid { key, value: v }),
            }
        }
    }
}
