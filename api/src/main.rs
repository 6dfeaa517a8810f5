use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;

mod extract;
mod handlers;
mod middleware;
mod routes;
mod state;

use common::auth::{RedisRefreshTokenStore, TokenService};
use common::config::Settings;
use common::db::{DbPool, RedisPool};
use common::storage::{MinioStorage, UploadService};
use common::telemetry;
use common::tour::TourApiClient;
use state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Settings::load()?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;

    // Initialize tracing
    telemetry::init_logging(
        &config.observability.log_level,
        config.observability.tracing_endpoint.as_deref(),
    )?;

    tracing::info!(
        host = %config.server.host,
        port = %config.server.port,
        "Starting API server"
    );

    // Initialize database connection pool
    let db_pool = DbPool::new(&config.database).await?;
    db_pool.migrate().await?;
    tracing::info!("Database connection pool established and migrations applied");

    // Refresh tokens live in Redis
    let redis_pool = RedisPool::new(&config.redis).await?;
    let token_store = Arc::new(RedisRefreshTokenStore::new(redis_pool));
    let tokens = TokenService::new(
        &config.auth.jwt_secret,
        config.auth.access_token_ttl_minutes,
        config.auth.refresh_token_ttl_days,
        token_store,
    );

    // Initialize object storage
    let storage = MinioStorage::new(&config.storage)?;
    if let Err(e) = storage.health_check().await {
        tracing::warn!(error = %e, "Object storage is not reachable yet, uploads will fail until it is");
    }
    let uploads = UploadService::new(Arc::new(storage), config.upload.clone());

    let tour = TourApiClient::new(&config.tour_api)?;

    // Initialize Prometheus metrics exporter
    let metrics_handle = telemetry::install_metrics_recorder()?;

    let addr = SocketAddr::from((
        config.server.host.parse::<std::net::IpAddr>()?,
        config.server.port,
    ));

    // Create application state
    let state = AppState::new(
        db_pool.clone(),
        tokens,
        uploads,
        tour,
        metrics_handle,
        config,
    );

    // Create router
    let app = routes::create_router(state);

    tracing::info!(addr = %addr, "Starting HTTP server");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db_pool.close().await;
    telemetry::shutdown_tracer();
    tracing::info!("API server stopped");
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
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM signal");
        },
    }

    tracing::info!("Initiating graceful shutdown");
}
