//! DTOs for the audit query API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::dto::pagination::PaginationMeta;
use crate::application::services::{ChainBreak, ChainReport};
use crate::domain::entities::AuditRecord;

/// One audit record as exposed over HTTP.
#[derive(Debug, Serialize, Deserialize)]
pub struct AuditRecordItem {
    pub id: i64,
    pub subject_id: Option<String>,
    pub method: String,
    pub path: String,
    pub status_code: i32,
    pub ip: Option<String>,
    pub body: Option<Value>,
    pub error: Option<String>,
    pub duration_ms: i64,
    pub signature: String,
    pub previous_signature: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<AuditRecord> for AuditRecordItem {
    fn from(record: AuditRecord) -> Self {
        let fields = record.fields;

        Self {
            id: record.id,
            subject_id: fields.subject_id,
            method: fields.method,
            path: fields.path,
            status_code: fields.status_code,
            ip: fields.ip,
            body: fields.body,
            error: fields.error,
            duration_ms: fields.duration_ms,
            signature: record.signature,
            previous_signature: record.previous_signature,
            created_at: fields.created_at,
        }
    }
}

/// Paginated audit records, newest first.
#[derive(Debug, Serialize, Deserialize)]
pub struct AuditListResponse {
    pub pagination: PaginationMeta,
    pub items: Vec<AuditRecordItem>,
}

/// Result of verifying the whole audit chain.
#[derive(Debug, Serialize)]
pub struct ChainVerificationResponse {
    pub valid: bool,
    pub checked: u64,
    pub breaks: Vec<ChainBreak>,
}

impl From<ChainReport> for ChainVerificationResponse {
    fn from(report: ChainReport) -> Self {
        Self {
            valid: report.is_valid(),
            checked: report.checked,
            breaks: report.breaks,
        }
    }
}
