//! JWT implementation of the token validator.

use std::str::FromStr;

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};

use crate::domain::token::{Claims, TokenError, TokenValidator};

/// HMAC algorithms accepted for access tokens.
pub const SUPPORTED_ALGORITHMS: [&str; 3] = ["HS256", "HS384", "HS512"];

/// Verifies HMAC-signed JWT access tokens.
///
/// Expiry is always enforced, with no leeway.
pub struct JwtTokenValidator {
    key: DecodingKey,
    validation: Validation,
}

impl JwtTokenValidator {
    pub fn new(secret: &str, algorithm: Algorithm) -> Self {
        let mut validation = Validation::new(algorithm);
        validation.validate_exp = true;
        validation.leeway = 0;

        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Builds a validator from an algorithm name such as `HS256`.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Invalid`] for unknown or non-HMAC algorithms.
    pub fn from_algorithm_name(secret: &str, algorithm: &str) -> Result<Self, TokenError> {
        if !SUPPORTED_ALGORITHMS.contains(&algorithm) {
            return Err(TokenError::Invalid(format!(
                "unsupported algorithm '{algorithm}'"
            )));
        }

        let algorithm = Algorithm::from_str(algorithm)
            .map_err(|e| TokenError::Invalid(format!("unsupported algorithm: {e}")))?;

        Ok(Self::new(secret, algorithm))
    }
}

impl TokenValidator for JwtTokenValidator {
    fn decode(&self, token: &str) -> Result<Claims, TokenError> {
        decode::<Claims>(token, &self.key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidToken => TokenError::Malformed,
                ErrorKind::ExpiredSignature => TokenError::Expired,
                ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                _ => TokenError::Invalid(e.to_string()),
            })
    }
}
