//! Business logic services for the application layer.

pub mod audit_service;
pub mod identity_service;
pub mod rate_limiter;

pub use audit_service::{AuditService, BreakKind, ChainBreak, ChainReport};
pub use identity_service::{Identity, IdentityExtractor};
pub use rate_limiter::{Clock, ManualClock, RateLimiter, SystemClock};
