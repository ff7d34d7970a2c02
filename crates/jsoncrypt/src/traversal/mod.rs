//! Key-driven traversal of JSON documents.
//!
//! [`transform`] walks a [`serde_json::Value`] and rewrites string leaves whose
//! enclosing object key matches the field's patterns. Classification, with the
//! parent key (absent at the root) threaded through the walk:
//!
//! 1. `null`, booleans, numbers and empty strings are returned unchanged, even
//!    under a matching key.
//! 2. A non-empty string under a matching key is passed to the leaf operation.
//! 3. A string under a non-matching key, or at the document root, is unchanged.
//! 4. Arrays carry no key of their own: every element is walked with the
//!    array's parent key, so `{"secret": ["a", "b"]}` transforms both elements.
//! 5. Objects are always walked; each value gets its own key as parent key.
//!
//! Strings are only ever transformed on a key match, while arrays and objects
//! are always descended into. That is what lets a single pattern find a
//! sensitive key at any depth without the caller spelling out paths.
//!
//! # Module invariants
//!
//! - Output has the same shape as input: same array lengths and order, same
//!   object key sets and order.
//! - Leaf-operation errors propagate unchanged; nothing is swallowed here.

pub mod matcher;

pub use matcher::{FieldMatchConfig, FieldPatterns};

use serde_json::{Map, Value};

use crate::crypto::{decrypt_field, encrypt_field, CodecError};

/// Operation applied to every matched string leaf.
pub trait StringTransform {
    /// Transform one string value.
    ///
    /// # Errors
    ///
    /// Returns a [`CodecError`] if the value cannot be transformed.
    fn apply(&self, value: &str) -> Result<String, CodecError>;
}

impl<F> StringTransform for F
where
    F: Fn(&str) -> Result<String, CodecError>,
{
    fn apply(&self, value: &str) -> Result<String, CodecError> {
        self(value)
    }
}

/// Rebuild `value` with `leaf_op` applied to every string under a matching key.
///
/// # Errors
///
/// Returns the first error produced by `leaf_op`.
pub fn transform<T>(
    value: &Value,
    config: &FieldMatchConfig,
    leaf_op: &T,
) -> Result<Value, CodecError>
where
    T: StringTransform + ?Sized,
{
    walk(value, None, config, leaf_op)
}

/// Encrypt every matched string leaf of `value`.
///
/// # Errors
///
/// Returns [`CodecError::EncryptionFailed`] if the cipher cannot be initialised.
pub fn encrypt_value(value: &Value, config: &FieldMatchConfig) -> Result<Value, CodecError> {
    let options = config.encrypt();
    transform(value, config, &|s: &str| encrypt_field(s, options))
}

/// Decrypt every matched string leaf of `value`.
///
/// # Errors
///
/// Returns [`CodecError::DecryptionFailed`] for the first matched leaf that is
/// not a valid ciphertext under the field's options.
pub fn decrypt_value(value: &Value, config: &FieldMatchConfig) -> Result<Value, CodecError> {
    let options = config.encrypt();
    transform(value, config, &|s: &str| decrypt_field(s, options))
}

fn walk<T>(
    value: &Value,
    parent_key: Option<&str>,
    config: &FieldMatchConfig,
    leaf_op: &T,
) -> Result<Value, CodecError>
where
    T: StringTransform + ?Sized,
{
    match value {
        Value::Null | Value::Bool(_) | Value::Number(_) => Ok(value.clone()),
        Value::String(s) if s.is_empty() => Ok(value.clone()),
        Value::String(s) => match parent_key {
            Some(key) if config.matches(key) => leaf_op.apply(s).map(Value::String),
            _ => Ok(value.clone()),
        },
        Value::Array(items) => items
            .iter()
            .map(|item| walk(item, parent_key, config, leaf_op))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (key, child) in map {
                out.insert(key.clone(), walk(child, Some(key.as_str()), config, leaf_op)?);
            }
            Ok(Value::Object(out))
        }
    }
}
