//! PostgreSQL implementation of the audit repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;
use std::sync::Arc;

use crate::domain::entities::{AuditFields, AuditRecord, NewAuditRecord};
use crate::domain::repositories::AuditRepository;
use crate::error::AppError;

const SELECT_COLUMNS: &str = r#"
    SELECT id, subject_id, method, path, status_code, host(ip) AS ip, body, error,
           duration_ms, signature, previous_signature, created_at
    FROM audit_records
"#;

#[derive(sqlx::FromRow)]
struct AuditRow {
    id: i64,
    subject_id: Option<String>,
    method: String,
    path: String,
    status_code: i32,
    ip: Option<String>,
    body: Option<Value>,
    error: Option<String>,
    duration_ms: i64,
    signature: String,
    previous_signature: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<AuditRow> for AuditRecord {
    fn from(row: AuditRow) -> Self {
        AuditRecord {
            id: row.id,
            fields: AuditFields {
                subject_id: row.subject_id,
                method: row.method,
                path: row.path,
                status_code: row.status_code,
                ip: row.ip,
                body: row.body,
                error: row.error,
                duration_ms: row.duration_ms,
                created_at: row.created_at,
            },
            signature: row.signature,
            previous_signature: row.previous_signature,
        }
    }
}

/// PostgreSQL repository for the audit trail.
///
/// The `audit_records` table rejects a second claim on the same
/// `previous_signature` and a second genesis record, and refuses updates and
/// deletes (see `migrations/`).
pub struct PgAuditRepository {
    pool: Arc<PgPool>,
}

impl PgAuditRepository {
    /// Creates a new repository with a database connection pool.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditRepository for PgAuditRepository {
    async fn last_signature(&self) -> Result<Option<String>, AppError> {
        let signature = sqlx::query_scalar::<_, String>(
            "SELECT signature FROM audit_records ORDER BY id DESC LIMIT 1",
        )
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(signature)
    }

    async fn insert(&self, record: NewAuditRecord) -> Result<AuditRecord, AppError> {
        let fields = &record.fields;

        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO audit_records (
                subject_id, method, path, status_code, ip, body, error,
                duration_ms, signature, previous_signature, created_at
            )
            VALUES ($1, $2, $3, $4, $5::inet, $6, $7, $8, $9, $10, $11)
            RETURNING id
            "#,
        )
        .bind(&fields.subject_id)
        .bind(&fields.method)
        .bind(&fields.path)
        .bind(fields.status_code)
        .bind(&fields.ip)
        .bind(&fields.body)
        .bind(&fields.error)
        .bind(fields.duration_ms)
        .bind(&record.signature)
        .bind(&record.previous_signature)
        .bind(fields.created_at)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(record.into_record(id))
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<AuditRecord>, AppError> {
        let row = sqlx::query_as::<_, AuditRow>(&format!("{SELECT_COLUMNS} WHERE id = $1"))
            .bind(id)
            .fetch_optional(self.pool.as_ref())
            .await?;

        Ok(row.map(AuditRecord::from))
    }

    async fn list(&self, offset: i64, limit: i64) -> Result<Vec<AuditRecord>, AppError> {
        let rows = sqlx::query_as::<_, AuditRow>(&format!(
            "{SELECT_COLUMNS} ORDER BY id DESC OFFSET $1 LIMIT $2"
        ))
        .bind(offset)
        .bind(limit)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows.into_iter().map(AuditRecord::from).collect())
    }

    async fn count(&self) -> Result<i64, AppError> {
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM audit_records")
            .fetch_one(self.pool.as_ref())
            .await?;

        Ok(total)
    }

    async fn chain_page(&self, after_id: i64, limit: i64) -> Result<Vec<AuditRecord>, AppError> {
        let rows = sqlx::query_as::<_, AuditRow>(&format!(
            "{SELECT_COLUMNS} WHERE id > $1 ORDER BY id ASC LIMIT $2"
        ))
        .bind(after_id)
        .bind(limit)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows.into_iter().map(AuditRecord::from).collect())
    }

    async fn health_check(&self) -> bool {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(self.pool.as_ref())
            .await
            .is_ok()
    }
}
