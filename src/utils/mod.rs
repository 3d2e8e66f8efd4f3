//! Request processing helpers.
//!
//! - [`body_sanitizer`] - Redaction of sensitive fields before auditing
//! - [`client_ip`] - Client address resolution (peer or trusted proxy headers)

pub mod body_sanitizer;
pub mod client_ip;
