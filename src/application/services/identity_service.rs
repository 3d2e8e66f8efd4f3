//! Best-effort identity resolution from the `Authorization` header.
//!
//! Identity is advisory and only used to tag audit records. It is not an
//! authorization decision: protected routes run their own verification.

use std::sync::Arc;

use crate::domain::token::{Claims, TokenError, TokenValidator};

/// Outcome of resolving a request's bearer credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    /// No bearer credential was presented.
    Anonymous,
    /// The credential decoded successfully.
    Authenticated(Claims),
    /// A bearer credential was presented but failed to decode.
    Rejected(TokenError),
}

impl Identity {
    /// Subject identifier, present only for authenticated requests.
    pub fn subject(&self) -> Option<&str> {
        match self {
            Identity::Authenticated(claims) => Some(&claims.sub),
            _ => None,
        }
    }

    pub fn claims(&self) -> Option<&Claims> {
        match self {
            Identity::Authenticated(claims) => Some(claims),
            _ => None,
        }
    }
}

/// Resolves a subject from a bearer token without ever failing the request.
#[derive(Clone)]
pub struct IdentityExtractor {
    validator: Arc<dyn TokenValidator>,
}

impl IdentityExtractor {
    pub fn new(validator: Arc<dyn TokenValidator>) -> Self {
        Self { validator }
    }

    /// Resolves the identity carried by an `Authorization` header value.
    ///
    /// Non-bearer schemes resolve to [`Identity::Anonymous`]; decode errors
    /// resolve to [`Identity::Rejected`].
    pub fn resolve(&self, authorization: Option<&str>) -> Identity {
        let Some(token) = authorization.and_then(bearer_token) else {
            return Identity::Anonymous;
        };

        match self.validator.decode(token) {
            Ok(claims) => Identity::Authenticated(claims),
            Err(e) => {
                tracing::debug!(error = %e, "Bearer token ignored for audit identity");
                Identity::Rejected(e)
            }
        }
    }
}

/// Extracts the token from `Bearer <token>`; the scheme is case-insensitive.
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    let token = token.trim();

    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}
