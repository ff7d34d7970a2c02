//! Record-level encryption: apply field configurations to stored JSON text.
//!
//! A record maps field names to the JSON text stored in each column. For every
//! field that has a [`FieldMatchConfig`], the stored text is parsed, run through
//! the traversal engine, and re-serialized. Everything else passes through.
//!
//! # Tolerated failures
//!
//! A field whose stored text is not valid JSON is returned unchanged rather than
//! failing the record: one pass covers heterogeneous records and one bad column
//! must not block the rest. Cipher errors are not tolerated and propagate.

use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::crypto::CodecError;
use crate::traversal::{decrypt_value, encrypt_value, FieldMatchConfig};

/// Field name → stored JSON text (`None` for a null column).
pub type Record = BTreeMap<String, Option<String>>;

/// Field name → configuration for the fields that should be transformed.
pub type FieldConfigs = HashMap<String, Arc<FieldMatchConfig>>;

/// Which way a record is being transformed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Encrypt,
    Decrypt,
}

impl Direction {
    fn as_str(self) -> &'static str {
        match self {
            Self::Encrypt => "encrypt",
            Self::Decrypt => "decrypt",
        }
    }
}

/// Errors from transforming a single standalone document.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// The document text is not valid JSON.
    #[error("document is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    /// A matched value could not be encrypted or decrypted.
    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// One configured field's stored text, for the duration of a single call.
struct MatchedField<'a> {
    name: &'a str,
    raw: &'a str,
    config: &'a FieldMatchConfig,
}

impl MatchedField<'_> {
    /// Returns `Ok(None)` when the stored text is not JSON and must be kept as is.
    fn apply(&self, direction: Direction) -> Result<Option<String>, CodecError> {
        let value: Value = match serde_json::from_str(self.raw) {
            Ok(v) => v,
            Err(e) => {
                debug!(
                    field = self.name,
                    direction = direction.as_str(),
                    error = %e,
                    "stored value is not JSON; leaving field unchanged"
                );
                return Ok(None);
            }
        };
        Ok(Some(transform_value(&value, self.config, direction)?.to_string()))
    }
}

fn transform_value(
    value: &Value,
    config: &FieldMatchConfig,
    direction: Direction,
) -> Result<Value, CodecError> {
    match direction {
        Direction::Encrypt => encrypt_value(value, config),
        Direction::Decrypt => decrypt_value(value, config),
    }
}

/// Encrypt every configured field of `fields`.
///
/// # Errors
///
/// Returns [`CodecError::EncryptionFailed`] if a cipher cannot be initialised.
pub fn encrypt_record(fields: &Record, configs: &FieldConfigs) -> Result<Record, CodecError> {
    apply_record(fields, configs, Direction::Encrypt)
}

/// Decrypt every configured field of `fields`.
///
/// # Errors
///
/// Returns [`CodecError::DecryptionFailed`] if a matched value is not a valid
/// ciphertext under its field's options (wrong key, corrupted data).
pub fn decrypt_record(fields: &Record, configs: &FieldConfigs) -> Result<Record, CodecError> {
    apply_record(fields, configs, Direction::Decrypt)
}

/// Transform the configured fields of `fields` in `direction`.
///
/// # Errors
///
/// Propagates the first [`CodecError`]; the input record is never modified.
pub fn apply_record(
    fields: &Record,
    configs: &FieldConfigs,
    direction: Direction,
) -> Result<Record, CodecError> {
    let mut out = fields.clone();
    let mut transformed = 0usize;

    for (name, slot) in out.iter_mut() {
        let Some(config) = configs.get(name) else {
            continue;
        };
        let updated = match slot.as_deref() {
            Some(raw) if !raw.is_empty() => MatchedField {
                name,
                raw,
                config,
            }
            .apply(direction)?,
            _ => None,
        };
        if let Some(text) = updated {
            *slot = Some(text);
            transformed += 1;
        }
    }

    debug!(
        direction = direction.as_str(),
        fields = fields.len(),
        transformed,
        "record processed"
    );
    Ok(out)
}

/// Encrypt one standalone JSON document.
///
/// Empty input is returned as is. Unlike the record functions, invalid JSON
/// is reported rather than passed through.
///
/// # Errors
///
/// Returns [`DocumentError::Parse`] for invalid JSON and
/// [`DocumentError::Codec`] for cipher failures.
pub fn encrypt_document(raw: &str, config: &FieldMatchConfig) -> Result<String, DocumentError> {
    apply_document(raw, config, Direction::Encrypt)
}

/// Decrypt one standalone JSON document.
///
/// # Errors
///
/// Returns [`DocumentError::Parse`] for invalid JSON and
/// [`DocumentError::Codec`] when a matched value does not decrypt.
pub fn decrypt_document(raw: &str, config: &FieldMatchConfig) -> Result<String, DocumentError> {
    apply_document(raw, config, Direction::Decrypt)
}

fn apply_document(
    raw: &str,
    config: &FieldMatchConfig,
    direction: Direction,
) -> Result<String, DocumentError> {
    if raw.is_empty() {
        return Ok(String::new());
    }
    let value: Value = serde_json::from_str(raw)?;
    Ok(transform_value(&value, config, direction)?.to_string())
}
