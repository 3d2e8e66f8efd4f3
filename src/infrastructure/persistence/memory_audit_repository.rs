//! Process-local audit repository.

use async_trait::async_trait;
use serde_json::json;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::domain::entities::{AuditRecord, NewAuditRecord};
use crate::domain::repositories::AuditRepository;
use crate::error::AppError;

/// Audit repository kept in memory.
///
/// Enforces the same uniqueness rules as the PostgreSQL schema (one claim
/// per predecessor, one genesis record, unique signatures), so chain
/// behaviour matches production. Records are lost on restart.
#[derive(Default)]
pub struct InMemoryAuditRepository {
    records: Mutex<Vec<AuditRecord>>,
}

impl InMemoryAuditRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all records in insertion order.
    pub fn records(&self) -> Vec<AuditRecord> {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<AuditRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl AuditRepository for InMemoryAuditRepository {
    async fn last_signature(&self) -> Result<Option<String>, AppError> {
        Ok(self.lock().last().map(|r| r.signature.clone()))
    }

    async fn insert(&self, record: NewAuditRecord) -> Result<AuditRecord, AppError> {
        let mut records = self.lock();

        if records
            .iter()
            .any(|r| r.previous_signature == record.previous_signature)
        {
            return Err(AppError::conflict(
                "Unique constraint violation",
                json!({ "constraint": "audit_records_previous_signature_key" }),
            ));
        }

        if records.iter().any(|r| r.signature == record.signature) {
            return Err(AppError::conflict(
                "Unique constraint violation",
                json!({ "constraint": "audit_records_signature_key" }),
            ));
        }

        let id = records.last().map_or(1, |r| r.id + 1);
        let record = record.into_record(id);
        records.push(record.clone());

        Ok(record)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<AuditRecord>, AppError> {
        Ok(self.lock().iter().find(|r| r.id == id).cloned())
    }

    async fn list(&self, offset: i64, limit: i64) -> Result<Vec<AuditRecord>, AppError> {
        Ok(self
            .lock()
            .iter()
            .rev()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn count(&self) -> Result<i64, AppError> {
        Ok(self.lock().len() as i64)
    }

    async fn chain_page(&self, after_id: i64, limit: i64) -> Result<Vec<AuditRecord>, AppError> {
        Ok(self
            .lock()
            .iter()
            .filter(|r| r.id > after_id)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn health_check(&self) -> bool {
        true
    }
}
