//! HMAC hash chain over audit records.
//!
//! Each signature covers the record's own fields plus the signature of its
//! predecessor:
//!
//! ```text
//! signature_i = HMAC-SHA256(secret, canonical({"data": fields_i, "previous": signature_(i-1)}))
//! ```
//!
//! The canonical form is compact JSON with object keys sorted at every
//! nesting level, so signing is deterministic for equal inputs regardless of
//! how the fields were produced or stored.

use hmac::{Hmac, Mac};
use serde_json::{Value, json};
use sha2::Sha256;

use crate::domain::entities::AuditFields;

type HmacSha256 = Hmac<Sha256>;

/// Signs audit fields into the hash chain.
#[derive(Clone)]
pub struct ChainSigner {
    secret: Vec<u8>,
}

impl ChainSigner {
    /// Creates a signer keyed by the log signing secret.
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
        }
    }

    /// Computes the signature of `fields` chained to `previous`.
    ///
    /// `previous` is `None` only for the first record of the chain.
    /// Returns a 64-character lowercase hex-encoded MAC.
    pub fn sign(&self, fields: &AuditFields, previous: Option<&str>) -> String {
        let mut mac =
            HmacSha256::new_from_slice(&self.secret).expect("HMAC accepts any key length");
        mac.update(canonicalize(fields, previous).as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Checks a stored signature in constant time.
    pub fn verify(&self, fields: &AuditFields, previous: Option<&str>, signature: &str) -> bool {
        let Ok(expected) = hex::decode(signature) else {
            return false;
        };

        let mut mac =
            HmacSha256::new_from_slice(&self.secret).expect("HMAC accepts any key length");
        mac.update(canonicalize(fields, previous).as_bytes());
        mac.verify_slice(&expected).is_ok()
    }
}

impl std::fmt::Debug for ChainSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainSigner").finish_non_exhaustive()
    }
}

/// Canonical serialization of the signed payload.
fn canonicalize(fields: &AuditFields, previous: Option<&str>) -> String {
    let data = serde_json::to_value(fields).unwrap_or(Value::Null);
    sort_keys(json!({ "data": data, "previous": previous })).to_string()
}

/// Rebuilds objects with keys inserted in sorted order.
///
/// Keeps the output stable even when `serde_json` is built with
/// `preserve_order` somewhere in the dependency graph.
fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(key, value)| (key, sort_keys(value)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn fields(status: i32) -> AuditFields {
        AuditFields {
            subject_id: Some("usr000001".to_string()),
            method: "POST".to_string(),
            path: "/cuentas".to_string(),
            status_code: status,
            ip: Some("192.168.1.10".to_string()),
            body: Some(json!({"nombre": "Ahorros", "saldo": 10, "meta": {"z": 1, "a": 2}})),
            error: None,
            duration_ms: 8,
            created_at: Utc.with_ymd_and_hms(2026, 1, 15, 9, 30, 0).unwrap(),
        }
    }

    #[test]
    fn test_sign_is_deterministic() {
        let signer = ChainSigner::new("log-signing-key");

        let s1 = signer.sign(&fields(201), None);
        let s2 = signer.sign(&fields(201), None);

        assert_eq!(s1, s2);
        assert_eq!(s1.len(), 64);
        assert!(s1.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_chain_detects_field_tampering() {
        let signer = ChainSigner::new("log-signing-key");

        let s1 = signer.sign(&fields(201), None);
        let s2 = signer.sign(&fields(200), Some(&s1));

        assert!(signer.verify(&fields(200), Some(&s1), &s2));

        let tampered = signer.sign(&fields(500), None);
        assert_ne!(tampered, s1);
        assert!(!signer.verify(&fields(500), None, &s1));
    }

    #[test]
    fn test_previous_signature_is_bound() {
        let signer = ChainSigner::new("log-signing-key");

        let genesis = signer.sign(&fields(201), None);
        let chained = signer.sign(&fields(201), Some(&genesis));
        let other = signer.sign(&fields(201), Some("deadbeef"));

        assert_ne!(genesis, chained);
        assert_ne!(chained, other);
    }

    #[test]
    fn test_secret_matters() {
        let a = ChainSigner::new("secret-a");
        let b = ChainSigner::new("secret-b");

        assert_ne!(a.sign(&fields(201), None), b.sign(&fields(201), None));
    }

    #[test]
    fn test_canonical_form_sorts_nested_keys() {
        let canonical = canonicalize(&fields(201), Some("prev"));

        assert!(canonical.starts_with(r#"{"data":{"body":{"meta":{"a":2,"z":1}"#));
        assert!(canonical.ends_with(r#","previous":"prev"}"#));
    }

    #[test]
    fn test_verify_rejects_non_hex() {
        let signer = ChainSigner::new("log-signing-key");

        assert!(!signer.verify(&fields(201), None, "not-hex"));
    }
}
