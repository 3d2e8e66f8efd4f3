//! Handlers for the admin audit query API.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde_json::json;

use crate::api::dto::audit::{AuditListResponse, AuditRecordItem, ChainVerificationResponse};
use crate::api::dto::pagination::{PaginationMeta, PaginationParams};
use crate::error::AppError;
use crate::state::AppState;

/// Lists audit records, newest first.
///
/// # Endpoint
///
/// `GET /audit`
///
/// # Query Parameters
///
/// - `page` (optional): Page number (default: 1)
/// - `page_size` (optional): Items per page (default: 25, max: 500)
///
/// # Errors
///
/// Returns 400 Bad Request if pagination parameters are invalid.
pub async fn audit_list_handler(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<AuditListResponse>, AppError> {
    let (offset, limit) = params
        .validate_and_get_offset_limit()
        .map_err(|e| AppError::bad_request(e, json!({})))?;

    let (records, total_items) = tokio::try_join!(
        state.audit_service.list(offset, limit),
        state.audit_service.count()
    )?;

    Ok(Json(AuditListResponse {
        pagination: PaginationMeta::new(params.page(), params.page_size(), total_items),
        items: records.into_iter().map(AuditRecordItem::from).collect(),
    }))
}

/// Returns one audit record.
///
/// # Endpoint
///
/// `GET /audit/{id}`
///
/// # Errors
///
/// Returns 404 Not Found if no record has this identifier.
pub async fn audit_get_handler(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<AuditRecordItem>, AppError> {
    let record = state.audit_service.get(id).await?;

    Ok(Json(record.into()))
}

/// Verifies every signature and link of the audit chain.
///
/// # Endpoint
///
/// `GET /audit/verify`
///
/// # Response
///
/// ```json
/// {
///   "valid": false,
///   "checked": 1042,
///   "breaks": [{ "id": 17, "kind": "signature_mismatch" }]
/// }
/// ```
pub async fn audit_verify_handler(
    State(state): State<AppState>,
) -> Result<Json<ChainVerificationResponse>, AppError> {
    let report = state.audit_service.verify_chain().await?;

    if !report.is_valid() {
        tracing::warn!(breaks = report.breaks.len(), "Audit chain verification failed");
    }

    Ok(Json(report.into()))
}
