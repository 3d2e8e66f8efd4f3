//! Core domain entities.
//!
//! # Entity Types
//!
//! - [`AuditRecord`] - A persisted, signed audit trail entry
//! - [`AuditEvent`] - Request facts collected by the interceptor
//! - [`RateLimitRule`] / [`RateLimitRules`] - Per-path request budgets
//!
//! Creation follows the "New Type" pattern: [`NewAuditRecord`] is a signed
//! record that has not been assigned an identifier yet.

pub mod audit_record;
pub mod rate_limit_rule;

pub use audit_record::{AuditEvent, AuditFields, AuditRecord, FAULT_STATUS, NewAuditRecord};
pub use rate_limit_rule::{RateLimitRule, RateLimitRules, RuleParseError};
