//! # Employee Directory API Server
//!
//! Binary entry point for the REST API service.

use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use staff_api::config::Environment;
use staff_api::{ApiContext, Config, build_router};
use staff_persistence::{
    CacheClient, CacheConfig, EmployeeService, MemoryCache, PgConfig, PgEmployeeRepository,
    SharedCache,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize tracing
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let registry = tracing_subscriber::registry().with(filter);
    match config.environment {
        Environment::Production => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        Environment::Development => registry.with(tracing_subscriber::fmt::layer()).init(),
    }

    tracing::info!(
        version = staff_api::VERSION,
        environment = ?config.environment,
        "Starting Employee Directory API"
    );

    // Initialize PostgreSQL
    tracing::info!(max_connections = config.database.max_connections, "Connecting to PostgreSQL");

    let pg_config = PgConfig {
        url: config.database.url.clone(),
        max_connections: config.database.max_connections,
        acquire_timeout: config.connection_timeout,
    };

    let repo = PgEmployeeRepository::connect(&pg_config).await?;
    repo.ensure_schema().await?;
    tracing::info!("PostgreSQL connected");

    // Initialize Redis cache
    let cache: SharedCache = if config.cache.enabled {
        tracing::info!("Connecting to Redis");

        let cache = CacheClient::new(CacheConfig {
            url: config.redis.url.clone(),
        })
        .await?;
        cache.ping().await?;
        tracing::info!(ttl_secs = config.cache.ttl.as_secs(), "Redis connected");
        Arc::new(cache)
    } else {
        tracing::warn!("Cache disabled, every read goes to PostgreSQL");
        Arc::new(MemoryCache::new())
    };

    // Build API context
    let service = EmployeeService::with_options(Arc::new(repo), cache, config.service_options());
    let api_ctx = ApiContext::new(service, config.environment);

    tracing::info!(
        invalidation_policy = ?config.invalidation_policy,
        validation_profile = config.validation_profile.as_str(),
        timeout_ms = u64::try_from(config.connection_timeout.as_millis()).unwrap_or(u64::MAX),
        "Employee service ready"
    );

    // Build router
    tracing::info!(
        cors_origins = ?config.http.cors_origins,
        rate_limit_max = config.http.rate_limit.max_requests,
        rate_limit_window_ms = u64::try_from(config.http.rate_limit.window.as_millis()).unwrap_or(u64::MAX),
        "Transport policies configured"
    );
    let app = build_router(api_ctx, &config.http);

    // Start server
    let addr = config.server_addr;
    tracing::info!(%addr, "Starting HTTP server");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Peer addresses key the rate limiter
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shut down gracefully");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, shutting down");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, shutting down");
        }
    }
}
