//! Top-level router configuration.
//!
//! # Route Structure
//!
//! - `GET /health`   - Health check (public prefix, never audited)
//! - `GET /audit/*`  - Audit query API (admin bearer token required)
//! - anything merged in through `business` - the host's own endpoints
//!
//! # Middleware
//!
//! Outermost first:
//!
//! - **Path normalization** - Trailing slash handling, before routing and interception
//! - **Tracing** - Structured request/response logging
//! - **Interceptor** - Public bypass, rate limiting, body redaction, identity, auditing
//! - **Admin authorization** - Only on `/audit/*`

use crate::api;
use crate::api::handlers::health_handler;
use crate::api::middleware::{admin_auth, interceptor, tracing};
use crate::state::AppState;
use axum::routing::get;
use axum::{Router, middleware};
use tower::Layer;
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};

/// Builds the routed application without path normalization.
///
/// # Arguments
///
/// - `state` - shared application state injected into all handlers
/// - `business` - routes served behind the interceptor alongside the audit API;
///   pass `Router::new()` to serve only the built-in endpoints
pub fn router(state: AppState, business: Router<AppState>) -> Router {
    let admin_router = api::routes::admin_routes().route_layer(middleware::from_fn_with_state(
        state.clone(),
        admin_auth::layer,
    ));

    Router::new()
        .route("/health", get(health_handler))
        .merge(admin_router)
        .merge(business)
        .layer(middleware::from_fn_with_state(
            state.interceptor.clone(),
            interceptor::layer,
        ))
        .with_state(state)
        .layer(tracing::layer())
}

/// Constructs the application router with all routes and middleware.
///
/// Trailing slashes are trimmed before routing, so `/audit/` and `/audit`
/// share one rate limit window and one audit path.
pub fn app_router(state: AppState, business: Router<AppState>) -> NormalizePath<Router> {
    NormalizePathLayer::trim_trailing_slash().layer(router(state, business))
}
