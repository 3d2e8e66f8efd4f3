//! Bearer token validation contract.
//!
//! Signature and expiry checks live behind [`TokenValidator`]; the
//! interceptor only consumes the decoded [`Claims`].

use serde::{Deserialize, Serialize};

/// Role allowed to read the audit trail.
pub const ADMIN_ROLE: &str = "admin";

/// Claims carried by an access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user) identifier.
    pub sub: String,
    #[serde(rename = "rol", alias = "role")]
    pub role: String,
    /// Expiry as a UNIX timestamp in seconds.
    pub exp: u64,
}

impl Claims {
    pub fn is_admin(&self) -> bool {
        self.role == ADMIN_ROLE
    }
}

/// Reasons a bearer token could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,
    #[error("token expired")]
    Expired,
    #[error("invalid token signature")]
    InvalidSignature,
    #[error("invalid token: {0}")]
    Invalid(String),
}

/// Decodes and verifies bearer tokens.
///
/// Implementations must be synchronous and side-effect free; they are
/// called on the request path for every intercepted request.
#[cfg_attr(test, mockall::automock)]
pub trait TokenValidator: Send + Sync {
    /// Verifies `token` (signature and expiry) and returns its claims.
    fn decode(&self, token: &str) -> Result<Claims, TokenError>;
}
