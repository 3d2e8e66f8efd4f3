//! Audit trail entities.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Status recorded when the downstream handler failed without producing a response.
pub const FAULT_STATUS: i32 = 500;

/// Facts about one intercepted request, as collected by the interceptor.
///
/// Turned into [`AuditFields`] by the recorder, which stamps the creation time.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditEvent {
    pub subject_id: Option<String>,
    pub method: String,
    pub path: String,
    pub status_code: i32,
    pub ip: Option<String>,
    pub body: Option<Value>,
    pub error: Option<String>,
    pub duration_ms: i64,
}

impl AuditEvent {
    /// Stamps the event with its creation time.
    ///
    /// The timestamp is truncated to microseconds, the precision PostgreSQL
    /// keeps, so a stored record re-serializes to exactly what was signed.
    pub fn into_fields(self, created_at: DateTime<Utc>) -> AuditFields {
        AuditFields {
            subject_id: self.subject_id,
            method: self.method,
            path: self.path,
            status_code: self.status_code,
            ip: self.ip,
            body: self.body,
            error: self.error,
            duration_ms: self.duration_ms,
            created_at: created_at.trunc_subsecs(6),
        }
    }
}

/// The signed portion of an audit record.
///
/// Everything except the identifier and the signatures themselves. Field
/// names are part of the canonical form fed to the chain signer; renaming
/// one invalidates every stored signature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditFields {
    pub subject_id: Option<String>,
    pub method: String,
    pub path: String,
    pub status_code: i32,
    pub ip: Option<String>,
    pub body: Option<Value>,
    pub error: Option<String>,
    pub duration_ms: i64,
    pub created_at: DateTime<Utc>,
}

/// A persisted, immutable audit record.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditRecord {
    pub id: i64,
    pub fields: AuditFields,
    pub signature: String,
    pub previous_signature: Option<String>,
}

/// A signed record ready for insertion.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAuditRecord {
    pub fields: AuditFields,
    pub signature: String,
    pub previous_signature: Option<String>,
}

impl NewAuditRecord {
    /// Attaches the storage-assigned identifier.
    pub fn into_record(self, id: i64) -> AuditRecord {
        AuditRecord {
            id,
            fields: self.fields,
            signature: self.signature,
            previous_signature: self.previous_signature,
        }
    }
}
