//! Redaction of sensitive fields in request bodies before they are audited.

use std::collections::HashSet;

use serde_json::{Value, json};

/// Replacement value for redacted fields.
pub const REDACTED: &str = "***REDACTED***";

/// Field names always redacted, compared case-insensitively.
pub const DEFAULT_SENSITIVE_FIELDS: &[&str] = &[
    "password",
    "contrasena",
    "new_password",
    "current_password",
    "token",
    "access_token",
    "refresh_token",
    "authorization",
    "secret",
    "api_key",
    "pin",
    "cvv",
    "card_number",
];

/// Audited in place of a body that is not valid JSON.
pub fn unparsable_marker() -> Value {
    json!({ "error": "unparsable body" })
}

/// Structure-preserving redaction over parsed JSON.
///
/// Object entries whose key is in the sensitive set (any letter case) have
/// their value replaced by [`REDACTED`], whatever that value is. Other
/// objects and arrays are walked recursively; scalars are left untouched.
///
/// NUL characters are removed from keys and strings, as PostgreSQL `jsonb`
/// cannot store them.
#[derive(Debug, Clone)]
pub struct BodySanitizer {
    sensitive: HashSet<String>,
}

impl BodySanitizer {
    /// Creates a sanitizer for exactly the given field names.
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            sensitive: fields
                .into_iter()
                .map(|f| f.as_ref().trim().to_lowercase())
                .filter(|f| !f.is_empty())
                .collect(),
        }
    }

    /// Default field set plus `extra`.
    pub fn with_extra_fields<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut sanitizer = Self::default();
        sanitizer.sensitive.extend(
            extra
                .into_iter()
                .map(|f| f.as_ref().trim().to_lowercase())
                .filter(|f| !f.is_empty()),
        );
        sanitizer
    }

    pub fn is_sensitive(&self, key: &str) -> bool {
        self.sensitive.contains(&key.to_lowercase())
    }

    /// Returns `value` with every sensitive entry redacted, at any depth.
    pub fn sanitize(&self, mut value: Value) -> Value {
        self.redact(&mut value);
        value
    }

    /// Parses and sanitizes a raw request body.
    ///
    /// - empty or whitespace-only body: `None`
    /// - invalid JSON: `Some(`[`unparsable_marker`]`)`
    /// - otherwise: the sanitized document
    pub fn sanitize_bytes(&self, bytes: &[u8]) -> Option<Value> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return None;
        }

        match serde_json::from_slice::<Value>(bytes) {
            Ok(value) => Some(self.sanitize(value)),
            Err(_) => Some(unparsable_marker()),
        }
    }

    fn redact(&self, value: &mut Value) {
        match value {
            Value::Object(map) => {
                *map = std::mem::take(map)
                    .into_iter()
                    .map(|(key, mut entry)| {
                        let key = strip_nul(key);
                        if self.is_sensitive(&key) {
                            entry = Value::String(REDACTED.to_string());
                        } else {
                            self.redact(&mut entry);
                        }
                        (key, entry)
                    })
                    .collect();
            }
            Value::Array(items) => items.iter_mut().for_each(|item| self.redact(item)),
            Value::String(text) => *text = strip_nul(std::mem::take(text)),
            _ => {}
        }
    }
}

fn strip_nul(text: String) -> String {
    if text.contains('\0') {
        text.replace('\0', "")
    } else {
        text
    }
}

impl Default for BodySanitizer {
    fn default() -> Self {
        Self::new(DEFAULT_SENSITIVE_FIELDS)
    }
}
