//! Handler for health check endpoint.

use axum::{Json, extract::State, http::StatusCode};

use crate::api::dto::health::{CheckStatus, HealthChecks, HealthResponse};
use crate::state::AppState;

/// Returns service health status with component checks.
///
/// # Endpoint
///
/// `GET /health` (public, never rate limited or audited)
///
/// # Response Codes
///
/// - **200 OK**: All components healthy
/// - **503 Service Unavailable**: Audit storage unreachable
///
/// # Response
///
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "checks": {
///     "audit_store": { "status": "ok", "message": "Reachable" },
///     "rate_limiter": { "status": "ok", "message": "Tracked windows: 12" }
///   }
/// }
/// ```
pub async fn health_handler(
    State(state): State<AppState>,
) -> Result<Json<HealthResponse>, (StatusCode, Json<HealthResponse>)> {
    let audit_store = if state.audit_service.health_check().await {
        CheckStatus::ok("Reachable")
    } else {
        CheckStatus::error("Audit storage unreachable")
    };

    let rate_limiter =
        CheckStatus::ok(format!("Tracked windows: {}", state.rate_limiter.tracked_keys()));

    let all_healthy = audit_store.is_ok() && rate_limiter.is_ok();

    let response = HealthResponse {
        status: if all_healthy { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks: HealthChecks {
            audit_store,
            rate_limiter,
        },
    };

    if all_healthy {
        Ok(Json(response))
    } else {
        Err((StatusCode::SERVICE_UNAVAILABLE, Json(response)))
    }
}
