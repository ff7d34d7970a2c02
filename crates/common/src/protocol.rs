//! Request, response, and declaration types exchanged between components.
//!
//! Request and response bodies are serialised as JSON over the HTTP API.
//! Column declarations are read from the columns file (YAML or JSON).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Encrypt / decrypt endpoints
// ---------------------------------------------------------------------------

/// Request body for `POST /encrypt` and `POST /decrypt`.
///
/// Each field value is the serialized JSON text stored in one column, or
/// `null` when the column holds no value. The record type is named by the
/// `X-Entity-Name` request header.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordRequest {
    /// Field name → stored JSON text.
    pub fields: BTreeMap<String, Option<String>>,
}

/// Successful response body for `POST /encrypt` and `POST /decrypt`.
///
/// Mirrors the request with every configured field transformed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordResponse {
    /// Field name → transformed JSON text.
    pub fields: BTreeMap<String, Option<String>>,
}

// ---------------------------------------------------------------------------
// Error response
// ---------------------------------------------------------------------------

/// Standard error response body returned on any non-2xx status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Short machine-readable error code (e.g. `"bad_request"`).
    pub code: String,
    /// Human-readable description safe to expose to callers.
    pub message: String,
}

impl ErrorResponse {
    /// Construct an [`ErrorResponse`] from a code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Health check
// ---------------------------------------------------------------------------

/// Response body for `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Overall service status: `"ok"` or `"degraded"`.
    pub status: String,
    /// Number of encrypted columns currently registered.
    pub columns_registered: usize,
}

// ---------------------------------------------------------------------------
// Column declarations
// ---------------------------------------------------------------------------

/// Top-level shape of the columns file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ColumnsFile {
    /// Every encrypted JSON column known to the service.
    #[serde(default)]
    pub columns: Vec<ColumnDeclaration>,
}

/// Declaration of one encrypted JSON column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnDeclaration {
    /// Record type the column is declared on.
    pub entity: String,
    /// Field (column) name within the record.
    pub field: String,
    /// Regular expressions tested against object key names.
    pub matching: Vec<String>,
    /// Cipher options for matched string values.
    pub encrypt: EncryptDeclaration,
}

/// Cipher options as written in a declaration, before validation.
///
/// Exactly one of `key` or `key_env` should be set. `key_env` names an
/// environment variable holding the hex key so that key material can stay out
/// of the columns file.
#[derive(Clone, Serialize, Deserialize)]
pub struct EncryptDeclaration {
    /// Hex-encoded key.
    #[serde(default)]
    pub key: Option<String>,
    /// Environment variable holding the hex-encoded key.
    #[serde(default)]
    pub key_env: Option<String>,
    /// Cipher identifier, e.g. `"aes-256-cbc"`.
    pub algorithm: String,
    /// IV length in bytes.
    #[serde(alias = "ivLength")]
    pub iv_length: usize,
    /// Apply this column's options to records of every type, not only `entity`.
    #[serde(default, alias = "looseMatching")]
    pub loose_matching: bool,
}

impl std::fmt::Debug for EncryptDeclaration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptDeclaration")
            .field("key", &self.key.as_ref().map(|_| "[REDACTED]"))
            .field("key_env", &self.key_env)
            .field("algorithm", &self.algorithm)
            .field("iv_length", &self.iv_length)
            .field("loose_matching", &self.loose_matching)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn record_request_accepts_null_fields() {
        let req: RecordRequest = serde_json::from_value(json!({
            "fields": {"secret": "{\"secret\":\"x\"}", "notes": null}
        }))
        .unwrap();
        assert_eq!(req.fields.len(), 2);
        assert!(req.fields["notes"].is_none());
    }

    #[test]
    fn error_response_new() {
        let e = ErrorResponse::new("bad_request", "missing entity header");
        assert_eq!(e.code, "bad_request");
        assert!(e.message.contains("missing entity header"));
    }

    #[test]
    fn declaration_accepts_camel_case_aliases() {
        let decl: ColumnDeclaration = serde_json::from_value(json!({
            "entity": "Test",
            "field": "secret",
            "matching": ["secret"],
            "encrypt": {
                "key": "00",
                "algorithm": "aes-256-cbc",
                "ivLength": 16,
                "looseMatching": true
            }
        }))
        .unwrap();
        assert_eq!(decl.encrypt.iv_length, 16);
        assert!(decl.encrypt.loose_matching);
        assert!(decl.encrypt.key_env.is_none());
    }

    #[test]
    fn loose_matching_defaults_to_false() {
        let decl: EncryptDeclaration = serde_json::from_value(json!({
            "key_env": "SECRET_KEY",
            "algorithm": "aes-256-cbc",
            "iv_length": 16
        }))
        .unwrap();
        assert!(!decl.loose_matching);
        assert!(decl.key.is_none());
    }

    #[test]
    fn declaration_debug_hides_key() {
        let decl = EncryptDeclaration {
            key: Some("d85117047fd06d3a".into()),
            key_env: None,
            algorithm: "aes-256-cbc".into(),
            iv_length: 16,
            loose_matching: false,
        };
        let printed = format!("{decl:?}");
        assert!(printed.contains("REDACTED"));
        assert!(!printed.contains("d85117047fd06d3a"));
    }
}
