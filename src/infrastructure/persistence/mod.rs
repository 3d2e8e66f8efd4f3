//! Audit repository implementations.
//!
//! # Repositories
//!
//! - [`PgAuditRepository`] - PostgreSQL storage via SQLx
//! - [`InMemoryAuditRepository`] - Process-local storage with the same constraints

pub mod memory_audit_repository;
pub mod pg_audit_repository;

pub use memory_audit_repository::InMemoryAuditRepository;
pub use pg_audit_repository::PgAuditRepository;
