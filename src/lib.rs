//! # Audit Gateway
//!
//! Request interception layer for a multi-tenant financial backend, built with
//! Axum and PostgreSQL.
//!
//! ## Architecture
//!
//! The crate follows a layered layout:
//!
//! - **Domain Layer** ([`domain`]) - Audit entities, rate limit rules, the chain signer
//!   and the repository / token validator contracts
//! - **Application Layer** ([`application`]) - Rate limiter, identity resolution and the
//!   audit service
//! - **Infrastructure Layer** ([`infrastructure`]) - PostgreSQL and in-memory audit storage,
//!   JWT validation
//! - **API Layer** ([`api`]) - The request interceptor, admin audit API and middleware
//!
//! ## Features
//!
//! - Fixed-window rate limiting per client address, method and path
//! - Public path allowlist exempt from limiting and auditing
//! - Sensitive field redaction in captured request bodies
//! - Tamper-evident audit trail: every record is HMAC-signed together with its
//!   predecessor's signature
//! - Best-effort auditing that never alters the caller's response
//!
//! ## Embedding
//!
//! ```rust,ignore
//! use audit_gateway::prelude::*;
//!
//! let business = Router::new().route("/cuentas", get(list_accounts));
//! let app = audit_gateway::routes::app_router(state, business);
//! ```
//!
//! ## Configuration
//!
//! Service configuration is loaded from environment variables via [`config::Config`].
//! See [`config`] module for available options.

pub mod api;
pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod state;
pub mod utils;

pub mod config;
pub mod server;

pub mod routes;

pub use error::AppError;
pub use state::AppState;

/// Commonly used types for external consumers.
///
/// Re-exports frequently used types to simplify imports for library users
/// and integration tests.
pub mod prelude {
    pub use crate::api::middleware::interceptor::RequestInterceptor;
    pub use crate::application::services::{AuditService, Identity, RateLimiter};
    pub use crate::config::InterceptorConfig;
    pub use crate::domain::chain_signer::ChainSigner;
    pub use crate::domain::entities::{AuditRecord, RateLimitRule, RateLimitRules};
    pub use crate::domain::token::{Claims, TokenValidator};
    pub use crate::error::AppError;
    pub use crate::state::AppState;
}
