//! Audit API route configuration.
//!
//! All routes require an admin bearer token via
//! [`crate::api::middleware::admin_auth`].

use crate::api::handlers::{audit_get_handler, audit_list_handler, audit_verify_handler};
use crate::state::AppState;
use axum::{Router, routing::get};

/// Admin-only audit routes.
///
/// # Endpoints
///
/// - `GET /audit`          - Paginated audit records, newest first
/// - `GET /audit/verify`   - Chain verification report
/// - `GET /audit/{id}`     - A single audit record
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/audit", get(audit_list_handler))
        .route("/audit/verify", get(audit_verify_handler))
        .route("/audit/{id}", get(audit_get_handler))
}
