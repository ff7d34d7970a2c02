//! AES-CBC field encryption primitives and option validation.
//!
//! This module knows nothing about JSON documents or records. It provides the
//! low-level encrypt/decrypt of one string and the configuration-time checks
//! that gate which options may reach it.
//!
//! # Ciphertext format
//!
//! ```text
//! base64(iv || aes-cbc-pkcs7(plaintext))
//! ```

pub mod cipher;
pub mod options;

pub use cipher::{decrypt_field, encrypt_field, encrypt_field_with_iv, CodecError};
pub use options::{validate, Algorithm, ConfigError, EncryptionOptions, RawEncryptionOptions};
