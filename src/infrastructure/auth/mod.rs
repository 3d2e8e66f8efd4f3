//! Bearer token verification.

pub mod jwt_validator;

pub use jwt_validator::{JwtTokenValidator, SUPPORTED_ALGORITHMS};
