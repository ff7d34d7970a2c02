//! Cipher options and their configuration-time validation.
//!
//! [`EncryptionOptions`] can only be built through [`EncryptionOptions::from_raw`],
//! which runs [`validate`]. Anything holding an `EncryptionOptions` therefore
//! holds a supported algorithm, a key of the right length, and a usable IV length.

use thiserror::Error;

/// Block size shared by every supported cipher (AES, 128-bit blocks).
pub const BLOCK_LEN: usize = 16;

/// Errors raised while validating cipher options or compiling field patterns.
///
/// Only produced at configuration time, never while encrypting a record.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The algorithm identifier is not a supported symmetric CBC cipher.
    #[error("invalid algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// The key is not hex, or has the wrong decoded length for the algorithm.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// The IV length does not match the cipher block size.
    #[error("invalid IV length: expected {BLOCK_LEN} bytes, got {0}")]
    InvalidIvLength(usize),

    /// A key-name pattern failed to compile.
    #[error("invalid matching pattern {pattern:?}: {source}")]
    InvalidPattern {
        /// The offending pattern text.
        pattern: String,
        /// Compiler error from the regex engine.
        #[source]
        source: regex::Error,
    },

    /// No key could be resolved for a column declaration.
    #[error("missing key: {0}")]
    MissingKey(String),
}

/// Supported symmetric ciphers, all AES in CBC mode with PKCS#7 padding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    /// AES-128-CBC, 16-byte key.
    Aes128Cbc,
    /// AES-192-CBC, 24-byte key.
    Aes192Cbc,
    /// AES-256-CBC, 32-byte key.
    Aes256Cbc,
}

impl Algorithm {
    /// Resolve an OpenSSL-style cipher identifier.
    ///
    /// Accepts the canonical names (`aes-256-cbc`) and the short aliases
    /// OpenSSL lists for them (`aes256`).
    pub fn from_identifier(identifier: &str) -> Option<Self> {
        match identifier {
            "aes-128-cbc" | "aes128" => Some(Self::Aes128Cbc),
            "aes-192-cbc" | "aes192" => Some(Self::Aes192Cbc),
            "aes-256-cbc" | "aes256" => Some(Self::Aes256Cbc),
            _ => None,
        }
    }

    /// Canonical identifier.
    pub fn identifier(self) -> &'static str {
        match self {
            Self::Aes128Cbc => "aes-128-cbc",
            Self::Aes192Cbc => "aes-192-cbc",
            Self::Aes256Cbc => "aes-256-cbc",
        }
    }

    /// Key length in bytes mandated by the cipher.
    pub fn key_len(self) -> usize {
        match self {
            Self::Aes128Cbc => 16,
            Self::Aes192Cbc => 24,
            Self::Aes256Cbc => 32,
        }
    }
}

/// Cipher options as supplied by the declaring code, before validation.
#[derive(Clone)]
pub struct RawEncryptionOptions {
    /// Hex-encoded key.
    pub key: String,
    /// Cipher identifier, e.g. `"aes-256-cbc"`.
    pub algorithm: String,
    /// IV length in bytes.
    pub iv_length: usize,
    /// Apply across every record type rather than only the declaring one.
    pub loose_matching: bool,
}

impl std::fmt::Debug for RawEncryptionOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawEncryptionOptions")
            .field("key", &"[REDACTED]")
            .field("algorithm", &self.algorithm)
            .field("iv_length", &self.iv_length)
            .field("loose_matching", &self.loose_matching)
            .finish()
    }
}

/// Check that `options` names a supported algorithm and carries a matching key.
///
/// # Errors
///
/// - [`ConfigError::UnsupportedAlgorithm`] for an unknown cipher identifier.
/// - [`ConfigError::InvalidKey`] if the key is not hex or decodes to the wrong length.
/// - [`ConfigError::InvalidIvLength`] if `iv_length` is not [`BLOCK_LEN`].
pub fn validate(options: &RawEncryptionOptions) -> Result<(), ConfigError> {
    check(options).map(|_| ())
}

fn check(options: &RawEncryptionOptions) -> Result<(Algorithm, Vec<u8>), ConfigError> {
    let algorithm = Algorithm::from_identifier(&options.algorithm)
        .ok_or_else(|| ConfigError::UnsupportedAlgorithm(options.algorithm.clone()))?;

    let key = hex::decode(&options.key)
        .map_err(|_| ConfigError::InvalidKey("key is not a valid hex string".into()))?;
    if key.len() != algorithm.key_len() {
        return Err(ConfigError::InvalidKey(format!(
            "{} requires a {}-byte key, got {} bytes",
            algorithm.identifier(),
            algorithm.key_len(),
            key.len()
        )));
    }

    if options.iv_length != BLOCK_LEN {
        return Err(ConfigError::InvalidIvLength(options.iv_length));
    }

    Ok((algorithm, key))
}

/// Decoded key bytes.
///
/// Zeroed on drop and never printed by `Debug`.
#[derive(Clone)]
pub struct KeyBytes(Box<[u8]>);

impl KeyBytes {
    /// Borrow the raw key bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl Drop for KeyBytes {
    fn drop(&mut self) {
        self.0.iter_mut().for_each(|b| *b = 0);
    }
}

impl std::fmt::Debug for KeyBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("KeyBytes([REDACTED])")
    }
}

/// Validated, immutable cipher options for one encrypted field.
#[derive(Debug, Clone)]
pub struct EncryptionOptions {
    key: KeyBytes,
    algorithm: Algorithm,
    iv_length: usize,
    loose_matching: bool,
}

impl EncryptionOptions {
    /// Validate `raw` and decode its key.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] reported by [`validate`].
    pub fn from_raw(raw: &RawEncryptionOptions) -> Result<Self, ConfigError> {
        let (algorithm, key) = check(raw)?;
        Ok(Self {
            key: KeyBytes(key.into_boxed_slice()),
            algorithm,
            iv_length: raw.iv_length,
            loose_matching: raw.loose_matching,
        })
    }

    /// Decoded key bytes.
    pub fn key(&self) -> &KeyBytes {
        &self.key
    }

    /// Cipher selected for this field.
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// IV length in bytes; always the block size.
    pub fn iv_length(&self) -> usize {
        self.iv_length
    }

    /// Whether the column also applies to other record types with the same field.
    pub fn loose_matching(&self) -> bool {
        self.loose_matching
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY_256: &str = "d85117047fd06d3afa79b6e44ee3a52eb426fc24c3a2e3667732e8da0342b4da";

    fn raw(key: &str, algorithm: &str) -> RawEncryptionOptions {
        RawEncryptionOptions {
            key: key.into(),
            algorithm: algorithm.into(),
            iv_length: BLOCK_LEN,
            loose_matching: false,
        }
    }

    #[test]
    fn aes_256_with_32_byte_key_passes() {
        assert!(validate(&raw(KEY_256, "aes-256-cbc")).is_ok());
    }

    #[test]
    fn short_non_hex_key_is_invalid() {
        let err = validate(&raw("foo", "aes-256-cbc")).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidKey(_)), "{err:?}");
    }

    #[test]
    fn misspelled_algorithm_is_unsupported() {
        let err = validate(&raw(KEY_256, "aes-256-bc")).unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedAlgorithm(ref a) if a == "aes-256-bc"));
        assert!(err.to_string().contains("invalid algorithm"));
    }

    #[test]
    fn algorithm_checked_before_key() {
        let err = validate(&raw("foo", "aes-256-bc")).unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedAlgorithm(_)));
    }

    #[test]
    fn key_length_must_match_algorithm() {
        // 32-byte key declared for a 128-bit cipher.
        let err = validate(&raw(KEY_256, "aes-128-cbc")).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidKey(_)));
        assert!(validate(&raw(&KEY_256[..32], "aes-128-cbc")).is_ok());
        assert!(validate(&raw(&KEY_256[..48], "aes-192-cbc")).is_ok());
    }

    #[test]
    fn short_aliases_resolve() {
        assert_eq!(Algorithm::from_identifier("aes256"), Some(Algorithm::Aes256Cbc));
        assert_eq!(Algorithm::from_identifier("aes128"), Some(Algorithm::Aes128Cbc));
        assert_eq!(Algorithm::from_identifier("aes-256-gcm"), None);
    }

    #[test]
    fn iv_length_must_be_block_size() {
        let mut options = raw(KEY_256, "aes-256-cbc");
        options.iv_length = 12;
        assert!(matches!(
            validate(&options).unwrap_err(),
            ConfigError::InvalidIvLength(12)
        ));
    }

    #[test]
    fn from_raw_keeps_flags() {
        let mut options = raw(KEY_256, "aes256");
        options.loose_matching = true;
        let validated = EncryptionOptions::from_raw(&options).unwrap();
        assert_eq!(validated.algorithm(), Algorithm::Aes256Cbc);
        assert_eq!(validated.iv_length(), BLOCK_LEN);
        assert_eq!(validated.key().as_bytes().len(), 32);
        assert!(validated.loose_matching());
    }

    #[test]
    fn key_never_printed() {
        let validated = EncryptionOptions::from_raw(&raw(KEY_256, "aes-256-cbc")).unwrap();
        let printed = format!("{validated:?}");
        assert!(printed.contains("REDACTED"));
        assert!(!printed.contains("d85117"));
        assert!(!format!("{:?}", raw(KEY_256, "aes-256-cbc")).contains("d85117"));
    }
}
