//! Repository trait for the audit trail.

use crate::domain::entities::{AuditRecord, NewAuditRecord};
use crate::error::AppError;
use async_trait::async_trait;

/// Durable, append-only storage for audit records.
///
/// # Chain Integrity
///
/// Implementations must reject a second record claiming an already-claimed
/// `previous_signature` (including a second record with no predecessor) with
/// [`AppError::Conflict`]. Together with the recorder's single-writer lock
/// this keeps the hash chain from forking even across processes.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::PgAuditRepository`] - PostgreSQL implementation
/// - [`crate::infrastructure::persistence::InMemoryAuditRepository`] - process-local store
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuditRepository: Send + Sync {
    /// Returns the signature of the record with the highest identifier.
    ///
    /// `Ok(None)` when the trail is empty.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on storage errors.
    async fn last_signature(&self) -> Result<Option<String>, AppError>;

    /// Appends a signed record and returns it with its assigned identifier.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Conflict`] if the predecessor was already claimed.
    /// Returns [`AppError::Internal`] on storage errors.
    async fn insert(&self, record: NewAuditRecord) -> Result<AuditRecord, AppError>;

    /// Finds a record by identifier.
    async fn find_by_id(&self, id: i64) -> Result<Option<AuditRecord>, AppError>;

    /// Lists records newest first.
    async fn list(&self, offset: i64, limit: i64) -> Result<Vec<AuditRecord>, AppError>;

    /// Counts all records.
    async fn count(&self) -> Result<i64, AppError>;

    /// Returns up to `limit` records with `id > after_id` in ascending order.
    ///
    /// Used to walk the chain for verification.
    async fn chain_page(&self, after_id: i64, limit: i64) -> Result<Vec<AuditRecord>, AppError>;

    /// Checks that the storage backend is reachable.
    async fn health_check(&self) -> bool;
}
