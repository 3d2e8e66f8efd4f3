//! HTTP middleware for request processing and protection.
//!
//! - [`interceptor`] - Rate limiting, body capture, identity and auditing
//! - [`admin_auth`] - Admin-only bearer authorization for the audit API
//! - [`tracing`] - Request spans and latency logging

pub mod admin_auth;
pub mod interceptor;
pub mod tracing;
