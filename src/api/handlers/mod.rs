//! HTTP request handlers for API endpoints.
//!
//! Each handler module corresponds to a logical grouping of endpoints.

pub mod audit;
pub mod health;

pub use audit::{audit_get_handler, audit_list_handler, audit_verify_handler};
pub use health::health_handler;
