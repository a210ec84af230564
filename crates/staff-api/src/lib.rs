//! # Employee Directory API
//!
//! REST API for the employee directory.
//!
//! ## Features
//!
//! - **CRUD**: Create, list, fetch, update and delete employee records
//! - **Read-through cache**: Reads served from Redis, populated on miss
//! - **Write-around invalidation**: Writes go to PostgreSQL, then drop the
//!   affected cache keys
//! - **Request tagging**: Every request carries an `x-request-id`
//! - **Transport policies**: Per-client rate limiting, gzip compression,
//!   security headers and credentialed CORS
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Axum HTTP Server                         │
//! │        (/employees, /api/v1/employees, /health)             │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    ApiContext                               │
//! │                  (EmployeeService)                          │
//! └─────────────────────────────────────────────────────────────┘
//!                    │                   │
//!                    ▼                   ▼
//! ┌─────────────────────────┐   ┌──────────────────────────────┐
//! │     Redis Cache         │   │        PostgreSQL            │
//! │  (Snapshots, TTL)       │   │   (Source of Truth)          │
//! └─────────────────────────┘   └──────────────────────────────┘
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod context;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod rate_limit;

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware as axum_middleware,
    routing::get,
};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use config::HttpConfig;
use rate_limit::RateLimits;

pub use config::Config;
pub use context::{ApiContext, ApiContextBuilder};
pub use error::{ApiError, ApiResult};

/// Mount points for the employee resource
pub const EMPLOYEE_ROUTES: [&str; 2] = ["/employees", "/api/v1/employees"];

/// Build the Axum router
pub fn build_router(ctx: ApiContext, http: &HttpConfig) -> Router {
    let expose_detail = ctx.environment.exposes_fault_detail();

    let mut router = Router::new();
    for base in EMPLOYEE_ROUTES {
        router = router
            .route(
                base,
                get(handlers::list_employees).post(handlers::create_employee),
            )
            .route(
                &format!("{base}/{{id}}"),
                get(handlers::get_employee)
                    .put(handlers::update_employee)
                    .delete(handlers::delete_employee),
            );
    }

    let mut router = router
        // Health check
        .route("/health", get(handlers::health_check))
        .route("/", get(handlers::banner))
        .fallback(handlers::route_not_found)
        .with_state(ctx);

    if expose_detail {
        router = router.layer(axum_middleware::map_response(
            middleware::expose_fault_detail,
        ));
    }

    let mut router = router
        .layer(axum_middleware::from_fn_with_state(
            RateLimits::new(&http.rate_limit),
            rate_limit::enforce,
        ))
        .layer(axum_middleware::from_fn(middleware::request_context));

    for (name, value) in middleware::security_headers() {
        router = router.layer(SetResponseHeaderLayer::if_not_present(name, value));
    }

    router
        .layer(cors_layer(&http.cors_origins))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
}

/// Credentialed CORS for the configured origins
fn cors_layer(origins: &[HeaderValue]) -> CorsLayer {
    CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_origin(AllowOrigin::list(origins.iter().cloned()))
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            middleware::REQUEST_ID_HEADER,
        ])
        .allow_credentials(true)
        .expose_headers([middleware::REQUEST_ID_HEADER])
}

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
