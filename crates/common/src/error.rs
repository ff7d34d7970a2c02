//! Common error types shared across crates.

use thiserror::Error;

/// Top-level service error type.
///
/// Variants map to HTTP status codes returned to callers:
/// - [`ServiceError::BadRequest`] → 400
/// - [`ServiceError::Decryption`] → 422
/// - [`ServiceError::EncryptionFailure`] → 500
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The request was malformed — missing entity header or invalid body.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// A stored value could not be decrypted with the configured column options.
    #[error("decryption failed: {0}")]
    Decryption(String),

    /// Encryption failed due to a crypto-layer error.
    #[error("encryption failure: {0}")]
    EncryptionFailure(String),
}

impl ServiceError {
    /// Returns the HTTP status code that should be sent for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            ServiceError::BadRequest(_) => 400,
            ServiceError::Decryption(_) => 422,
            ServiceError::EncryptionFailure(_) => 500,
        }
    }

    /// Short machine-readable code used in the JSON error body.
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::BadRequest(_) => "bad_request",
            ServiceError::Decryption(_) => "decryption_failed",
            ServiceError::EncryptionFailure(_) => "encryption_failed",
        }
    }
}
