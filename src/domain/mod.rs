//! Domain layer containing audit entities, contracts and the chain signer.
//!
//! # Architecture
//!
//! - [`entities`] - Audit records and rate limit rules
//! - [`repositories`] - Storage trait definitions
//! - [`chain_signer`] - HMAC hash chain over audit records
//! - [`token`] - Bearer token validation contract
//!
//! # Design Principles
//!
//! - Domain layer has no dependencies on infrastructure or presentation layers
//! - Repository and validator traits define contracts implemented by the
//!   infrastructure layer
//! - Orchestration lives in services (see [`crate::application::services`])

pub mod chain_signer;
pub mod entities;
pub mod repositories;
pub mod token;
