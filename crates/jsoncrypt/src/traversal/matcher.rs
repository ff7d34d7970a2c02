//! Key-name patterns and the per-field configuration that owns them.

use regex::Regex;

use crate::crypto::{ConfigError, EncryptionOptions};

/// Ordered set of compiled key-name patterns.
///
/// A key matches when any pattern finds a match anywhere in it, so `secret`
/// matches `"secret"`, `"secretValue"` and `"my_secret"`. Anchor the pattern
/// (`^secret$`) for an exact match.
#[derive(Debug, Clone, Default)]
pub struct FieldPatterns(Vec<Regex>);

impl FieldPatterns {
    /// Compile `patterns` in order.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidPattern`] for the first pattern that fails to compile.
    pub fn compile<S: AsRef<str>>(patterns: &[S]) -> Result<Self, ConfigError> {
        patterns
            .iter()
            .map(|p| {
                Regex::new(p.as_ref()).map_err(|source| ConfigError::InvalidPattern {
                    pattern: p.as_ref().to_owned(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }

    /// Returns `true` if `key` satisfies at least one pattern.
    pub fn matches(&self, key: &str) -> bool {
        self.0.iter().any(|re| re.is_match(key))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Everything needed to encrypt one field: which keys to match and how.
///
/// Built once at configuration time and shared read-only by every record.
#[derive(Debug, Clone)]
pub struct FieldMatchConfig {
    patterns: FieldPatterns,
    encrypt: EncryptionOptions,
}

impl FieldMatchConfig {
    /// Pair compiled patterns with validated options.
    pub fn new(patterns: FieldPatterns, encrypt: EncryptionOptions) -> Self {
        Self { patterns, encrypt }
    }

    /// Compile `patterns` and pair them with already-validated options.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidPattern`] if a pattern fails to compile.
    pub fn compile<S: AsRef<str>>(
        patterns: &[S],
        encrypt: EncryptionOptions,
    ) -> Result<Self, ConfigError> {
        Ok(Self::new(FieldPatterns::compile(patterns)?, encrypt))
    }

    /// The key-name patterns this field matches.
    pub fn patterns(&self) -> &FieldPatterns {
        &self.patterns
    }

    /// Cipher options applied to matched values.
    pub fn encrypt(&self) -> &EncryptionOptions {
        &self.encrypt
    }

    /// Returns `true` if string values under `key` should be transformed.
    pub fn matches(&self, key: &str) -> bool {
        self.patterns.matches(key)
    }
}
