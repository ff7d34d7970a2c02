//! `jsoncrypt` — selective, key-driven encryption of string values inside JSON.
//!
//! A record's fields each hold serialized JSON. For every configured field the
//! document is walked, and string values under keys matching the field's
//! patterns are replaced by `base64(iv || aes-cbc(value))`. Decryption is the
//! exact mirror. Document shape, key names, and non-string values stay in the
//! clear.
//!
//! Layers, leaves first:
//!
//! - [`crypto`] — single-string AES-CBC codec and option validation.
//! - [`traversal`] — the recursive walk deciding which leaves to transform.
//! - [`record`] — applies field configurations to a whole record.
//! - [`registry`] — column declarations per record type, with loose matching.
//!
//! ```rust,ignore
//! use jsoncrypt::prelude::*;
//!
//! let options = EncryptionOptions::from_raw(&RawEncryptionOptions {
//!     key: hex_key,
//!     algorithm: "aes-256-cbc".into(),
//!     iv_length: 16,
//!     loose_matching: false,
//! })?;
//! let config = FieldMatchConfig::compile(&["secret"], options)?;
//! let stored = encrypt_document(r#"{"secret":"testing"}"#, &config)?;
//! ```

pub mod crypto;
pub mod record;
pub mod registry;
pub mod traversal;

pub mod prelude {
    //! Convenience re-exports for common use.
    pub use crate::crypto::{
        validate, CodecError, ConfigError, EncryptionOptions, RawEncryptionOptions,
    };
    pub use crate::record::{
        decrypt_document, decrypt_record, encrypt_document, encrypt_record, FieldConfigs, Record,
    };
    pub use crate::registry::ColumnRegistry;
    pub use crate::traversal::{decrypt_value, encrypt_value, transform, FieldMatchConfig};
}
