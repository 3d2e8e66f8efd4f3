//! Application layer services.
//!
//! Services orchestrate domain operations and are consumed by the HTTP
//! middleware and handlers.
//!
//! # Available Services
//!
//! - [`services::audit_service::AuditService`] - Signed audit trail recording and verification
//! - [`services::rate_limiter::RateLimiter`] - Fixed-window request counting
//! - [`services::identity_service::IdentityExtractor`] - Best-effort bearer identity

pub mod services;
