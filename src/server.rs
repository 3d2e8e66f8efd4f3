//! HTTP server initialization and runtime setup.
//!
//! Handles the database pool, migrations, service wiring, the rate limiter
//! sweep and the Axum server lifecycle.

use crate::application::services::RateLimiter;
use crate::config::Config;
use crate::domain::chain_signer::ChainSigner;
use crate::infrastructure::auth::JwtTokenValidator;
use crate::infrastructure::persistence::PgAuditRepository;
use crate::routes::app_router;
use crate::state::AppState;

use anyhow::{Context, Result};
use axum::extract::Request;
use axum::{Router, ServiceExt};
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

/// Runs the HTTP server with the given configuration.
///
/// Initializes:
/// - PostgreSQL connection pool
/// - Apply migrations
/// - Audit service, token validator and request interceptor
/// - Background purge of lapsed rate limit windows
/// - Axum HTTP server with graceful shutdown on Ctrl+C
///
/// # Errors
///
/// Returns an error if:
/// - Database connection or migration fails
/// - The JWT algorithm is not supported
/// - Server bind fails
/// - Server runtime error occurs
pub async fn run(config: Config) -> Result<()> {
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_connect_timeout))
        .idle_timeout(Duration::from_secs(config.db_idle_timeout))
        .max_lifetime(Duration::from_secs(config.db_max_lifetime))
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Connected to database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to migrate")?;

    let validator = JwtTokenValidator::from_algorithm_name(&config.jwt_secret, &config.jwt_algorithm)
        .context("Invalid JWT configuration")?;

    let rate_limiter = Arc::new(RateLimiter::new());

    let state = AppState::new(
        Arc::new(PgAuditRepository::new(Arc::new(pool))),
        ChainSigner::new(&config.log_signing_key),
        Arc::new(validator),
        rate_limiter.clone(),
        config.interceptor.clone(),
    );

    if config.rate_limit_sweep_seconds > 0 {
        tokio::spawn(sweep_rate_limits(
            rate_limiter,
            Duration::from_secs(config.rate_limit_sweep_seconds),
        ));
        tracing::info!("Rate limit sweep started");
    }

    let app = app_router(state, Router::new());

    let addr: SocketAddr = config.listen_addr.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{addr}");

    axum::serve(
        listener,
        ServiceExt::<Request>::into_make_service_with_connect_info::<SocketAddr>(app),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Periodically drops rate limit windows that have lapsed.
async fn sweep_rate_limits(limiter: Arc<RateLimiter>, every: Duration) {
    let mut interval = tokio::time::interval(every);
    interval.tick().await;

    loop {
        interval.tick().await;
        let purged = limiter.purge_expired();
        if purged > 0 {
            tracing::debug!(purged, remaining = limiter.tracked_keys(), "Purged rate limit windows");
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
