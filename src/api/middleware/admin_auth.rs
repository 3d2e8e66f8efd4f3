//! Bearer token authorization for the audit query API.

use axum::{
    extract::{FromRequestParts, Request, State},
    middleware::Next,
    response::Response,
};
use axum_auth::AuthBearer;
use serde_json::json;

use crate::{error::AppError, state::AppState};

/// Admits only requests carrying a valid token with the admin role.
///
/// # Header Format
///
/// ```text
/// Authorization: Bearer <jwt>
/// ```
///
/// The token is decoded with the same validator the interceptor uses for
/// audit identity, but here a decode failure is fatal. The decoded claims
/// are inserted into the request extensions for the handler.
///
/// # Errors
///
/// Returns `401 Unauthorized` (with `WWW-Authenticate: Bearer`) if:
/// - Authorization header is missing or not a bearer credential
/// - Token is malformed, expired or carries a bad signature
///
/// Returns `403 Forbidden` if the token's role is not `admin`.
///
/// # Example
///
/// ```rust,ignore
/// let admin = Router::new()
///     .route("/audit", get(audit_list_handler))
///     .route_layer(middleware::from_fn_with_state(state.clone(), admin_auth::layer));
/// ```
pub async fn layer(
    State(st): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let (mut parts, body) = req.into_parts();

    let AuthBearer(token) = AuthBearer::from_request_parts(&mut parts, &())
        .await
        .map_err(|_| {
            AppError::unauthorized(
                "Unauthorized",
                json!({"reason": "Authorization header is missing or invalid"}),
            )
        })?;

    let claims = st.token_validator.decode(&token).map_err(|e| {
        tracing::debug!(error = %e, "Admin token rejected");
        AppError::unauthorized("Unauthorized", json!({"reason": e.to_string()}))
    })?;

    if !claims.is_admin() {
        tracing::warn!(subject = %claims.sub, role = %claims.role, "Audit access denied");
        return Err(AppError::forbidden(
            "Forbidden",
            json!({"reason": "admin role required"}),
        ));
    }

    let mut req = Request::from_parts(parts, body);
    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}
