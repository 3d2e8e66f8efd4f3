//! Audit trail recording, lookup and chain verification.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use tokio::sync::Mutex;
use tokio_retry::RetryIf;
use tokio_retry::strategy::FixedInterval;

use crate::domain::chain_signer::ChainSigner;
use crate::domain::entities::{AuditEvent, AuditFields, AuditRecord, NewAuditRecord};
use crate::domain::repositories::AuditRepository;
use crate::error::AppError;

/// Delay between attempts after losing the predecessor race to another writer.
const CONFLICT_RETRY_INTERVAL_MS: u64 = 20;
/// Extra attempts after a conflict.
const CONFLICT_RETRIES: usize = 3;
/// Records fetched per page while verifying the chain.
const VERIFY_PAGE_SIZE: i64 = 500;

/// Why a record failed verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakKind {
    /// `previous_signature` does not match the preceding record's signature.
    BrokenLink,
    /// The stored signature does not match the record's content.
    SignatureMismatch,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainBreak {
    pub id: i64,
    pub kind: BreakKind,
}

/// Result of walking the whole audit chain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChainReport {
    pub checked: u64,
    pub breaks: Vec<ChainBreak>,
}

impl ChainReport {
    pub fn is_valid(&self) -> bool {
        self.breaks.is_empty()
    }
}

/// Writes signed audit records and reads them back.
///
/// # Chain Integrity
///
/// [`record`](Self::record) reads the latest signature, signs the new record
/// against it and inserts it while holding a process-wide async lock, so
/// two requests in this process can never claim the same predecessor. The
/// repository's uniqueness guarantee covers writers in other processes; a
/// lost race surfaces as [`AppError::Conflict`] and is retried with a fresh
/// read.
pub struct AuditService {
    repository: Arc<dyn AuditRepository>,
    signer: ChainSigner,
    write_lock: Mutex<()>,
}

impl AuditService {
    pub fn new(repository: Arc<dyn AuditRepository>, signer: ChainSigner) -> Self {
        Self {
            repository,
            signer,
            write_lock: Mutex::new(()),
        }
    }

    /// Persists an audit record, best effort.
    ///
    /// Never fails: storage errors are logged and counted, then dropped.
    pub async fn record(&self, event: AuditEvent) {
        let method = event.method.clone();
        let path = event.path.clone();

        match self.try_record(event).await {
            Ok(record) => {
                metrics::counter!("audit_records_written_total").increment(1);
                tracing::debug!(id = record.id, %method, %path, "Audit record written");
            }
            Err(e) => {
                metrics::counter!("audit_write_failures_total").increment(1);
                tracing::error!(error = %e, %method, %path, "Failed to persist audit record");
            }
        }
    }

    /// Persists an audit record and reports storage errors.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Conflict`] if every attempt lost the predecessor race.
    /// Returns [`AppError::Internal`] on storage errors.
    pub async fn try_record(&self, event: AuditEvent) -> Result<AuditRecord, AppError> {
        let _guard = self.write_lock.lock().await;

        let fields = event.into_fields(Utc::now());
        let strategy = FixedInterval::from_millis(CONFLICT_RETRY_INTERVAL_MS).take(CONFLICT_RETRIES);

        RetryIf::spawn(strategy, || self.append(&fields), AppError::is_conflict).await
    }

    async fn append(&self, fields: &AuditFields) -> Result<AuditRecord, AppError> {
        let previous = self.repository.last_signature().await?;
        let signature = self.signer.sign(fields, previous.as_deref());

        self.repository
            .insert(NewAuditRecord {
                fields: fields.clone(),
                signature,
                previous_signature: previous,
            })
            .await
    }

    /// Retrieves one record.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if no record has this identifier.
    pub async fn get(&self, id: i64) -> Result<AuditRecord, AppError> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("Audit record not found", json!({ "id": id })))
    }

    /// Lists records newest first.
    pub async fn list(&self, offset: i64, limit: i64) -> Result<Vec<AuditRecord>, AppError> {
        self.repository.list(offset, limit).await
    }

    pub async fn count(&self) -> Result<i64, AppError> {
        self.repository.count().await
    }

    /// Walks the chain from the first record and checks every link and signature.
    ///
    /// Each record is verified against its own stored `previous_signature`,
    /// so an edited record shows up as a [`BreakKind::SignatureMismatch`] on
    /// that record alone, while a deleted or reordered record shows up as a
    /// [`BreakKind::BrokenLink`] on its successor.
    pub async fn verify_chain(&self) -> Result<ChainReport, AppError> {
        let mut report = ChainReport::default();
        let mut previous: Option<String> = None;
        let mut after_id = 0;

        loop {
            let page = self.repository.chain_page(after_id, VERIFY_PAGE_SIZE).await?;
            if page.is_empty() {
                break;
            }

            for record in page {
                after_id = record.id;

                if record.previous_signature != previous {
                    report.breaks.push(ChainBreak {
                        id: record.id,
                        kind: BreakKind::BrokenLink,
                    });
                }

                if !self.signer.verify(
                    &record.fields,
                    record.previous_signature.as_deref(),
                    &record.signature,
                ) {
                    report.breaks.push(ChainBreak {
                        id: record.id,
                        kind: BreakKind::SignatureMismatch,
                    });
                }

                previous = Some(record.signature);
                report.checked += 1;
            }
        }

        Ok(report)
    }

    /// Checks that audit storage is reachable.
    pub async fn health_check(&self) -> bool {
        self.repository.health_check().await
    }
}
