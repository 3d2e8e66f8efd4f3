//! Repository trait definitions for the domain layer.
//!
//! Traits define the contract for data operations; implementations live in
//! `crate::infrastructure::persistence`. Mock implementations are
//! auto-generated via `mockall` for testing.
//!
//! # Available Repositories
//!
//! - [`AuditRepository`] - Append-only audit trail storage

pub mod audit_repository;

pub use audit_repository::AuditRepository;

#[cfg(test)]
pub use audit_repository::MockAuditRepository;
