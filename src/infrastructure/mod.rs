//! Infrastructure layer for external integrations.
//!
//! This layer implements interfaces defined by the domain layer.
//!
//! # Modules
//!
//! - [`auth`] - JWT bearer token validation
//! - [`persistence`] - PostgreSQL and in-memory audit repositories

pub mod auth;
pub mod persistence;
