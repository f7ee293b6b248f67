//! Redaction of request/response diagnostics.
//!
//! Only used when building the error of an `else_throw` terminal, so nothing
//! here sits on the request path.

use crate::http::Headers;
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Sanitizes headers and bodies before they are attached to an error.
pub trait Redactor: Send + Sync {
    fn redact_headers(&self, headers: &Headers) -> Headers;
    fn redact_body(&self, body: &[u8]) -> String;
}

const DEFAULT_SENSITIVE_HEADERS: &[&str] = &[
    "authorization",
    "proxy-authorization",
    "cookie",
    "set-cookie",
    "x-api-key",
];

const DEFAULT_SENSITIVE_FIELDS: &[&str] = &[
    "password",
    "secret",
    "token",
    "access_token",
    "refresh_token",
    "api_key",
    "client_secret",
];

const DEFAULT_MAX_BODY_CHARS: usize = 4096;

/// Replaces secrets with a short SHA-256 fingerprint so equal values can be
/// correlated across errors without being disclosed.
#[derive(Debug, Clone)]
pub struct DefaultRedactor {
    sensitive_headers: Vec<String>,
    sensitive_fields: Vec<String>,
    max_body_chars: usize,
}

impl Default for DefaultRedactor {
    fn default() -> Self {
        Self::new(
            DEFAULT_SENSITIVE_HEADERS.iter().map(|s| s.to_string()).collect(),
            DEFAULT_SENSITIVE_FIELDS.iter().map(|s| s.to_string()).collect(),
            DEFAULT_MAX_BODY_CHARS,
        )
    }
}

impl DefaultRedactor {
    pub fn new(
        sensitive_headers: Vec<String>,
        sensitive_fields: Vec<String>,
        max_body_chars: usize,
    ) -> Self {
        Self {
            sensitive_headers: sensitive_headers
                .into_iter()
                .map(|h| h.to_ascii_lowercase())
                .collect(),
            sensitive_fields: sensitive_fields
                .into_iter()
                .map(|f| f.to_ascii_lowercase())
                .collect(),
            max_body_chars,
        }
    }

    pub fn sensitive_headers(&self) -> &[String] {
        &self.sensitive_headers
    }

    pub fn sensitive_fields(&self) -> &[String] {
        &self.sensitive_fields
    }

    pub fn max_body_chars(&self) -> usize {
        self.max_body_chars
    }

    fn is_sensitive_header(&self, name: &str) -> bool {
        self.sensitive_headers
            .iter()
            .any(|h| h.eq_ignore_ascii_case(name))
    }

    fn is_sensitive_field(&self, name: &str) -> bool {
        self.sensitive_fields
            .iter()
            .any(|f| f.eq_ignore_ascii_case(name))
    }

    fn redact_json(&self, value: &mut Value) {
        match value {
            Value::Object(map) => {
                for (key, v) in map.iter_mut() {
                    if self.is_sensitive_field(key) {
                        let raw = match &*v {
                            Value::String(s) => s.clone(),
                            other => other.to_string(),
                        };
                        *v = Value::String(fingerprint(&raw));
                    } else {
                        self.redact_json(v);
                    }
                }
            }
            Value::Array(items) => items.iter_mut().for_each(|v| self.redact_json(v)),
            _ => {}
        }
    }

    fn truncate(&self, text: String) -> String {
        let total = text.chars().count();
        if total <= self.max_body_chars {
            return text;
        }
        let kept: String = text.chars().take(self.max_body_chars).collect();
        format!("{}…[truncated {} chars]", kept, total - self.max_body_chars)
    }
}

impl Redactor for DefaultRedactor {
    fn redact_headers(&self, headers: &Headers) -> Headers {
        headers
            .iter()
            .map(|(name, value)| {
                if self.is_sensitive_header(name) {
                    (name.to_string(), fingerprint(value))
                } else {
                    (name.to_string(), value.to_string())
                }
            })
            .collect()
    }

    fn redact_body(&self, body: &[u8]) -> String {
        let text = match serde_json::from_slice::<Value>(body) {
            Ok(mut value) => {
                self.redact_json(&mut value);
                value.to_string()
            }
            Err(_) => String::from_utf8_lossy(body).into_owned(),
        };
        self.truncate(text)
    }
}

fn fingerprint(secret: &str) -> String {
    let digest = Sha256::digest(secret.as_bytes());
    format!("[REDACTED sha256:{}]", &hex::encode(digest)[..8])
}
