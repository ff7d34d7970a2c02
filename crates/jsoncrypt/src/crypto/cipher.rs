//! AES-CBC encryption and decryption of individual string fields.
//!
//! Every call to [`encrypt_field`] draws a fresh IV from the OS CSPRNG, so two
//! encryptions of the same plaintext never produce the same output.
//!
//! **The output layout is fixed.** Stored values are
//! `base64(iv || ciphertext)` with the standard padded alphabet; changing it
//! would make existing rows undecryptable.

use aes::{Aes128, Aes192, Aes256};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::{rngs::OsRng, RngCore};
use thiserror::Error;

use super::options::{Algorithm, EncryptionOptions, BLOCK_LEN};

/// Errors produced by the cipher layer.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The stored value is malformed, truncated, or was produced under a
    /// different key or algorithm.
    #[error("decryption failed: {0}")]
    DecryptionFailed(&'static str),

    /// The cipher could not be initialised from the validated options.
    #[error("encryption failed: cipher initialisation rejected key or IV")]
    EncryptionFailed,
}

/// Encrypt `plaintext` under `options` with a random IV.
///
/// # Errors
///
/// Returns [`CodecError::EncryptionFailed`] if the cipher rejects the key or
/// IV, which validated options rule out.
pub fn encrypt_field(plaintext: &str, options: &EncryptionOptions) -> Result<String, CodecError> {
    let mut iv = vec![0u8; options.iv_length()];
    OsRng.fill_bytes(&mut iv);
    encrypt_field_with_iv(plaintext, options, &iv)
}

/// Encrypt `plaintext` under `options` with a caller-supplied IV.
///
/// Deterministic; [`encrypt_field`] is this function with a random IV.
///
/// # Errors
///
/// Returns [`CodecError::EncryptionFailed`] if `iv` has the wrong length.
pub fn encrypt_field_with_iv(
    plaintext: &str,
    options: &EncryptionOptions,
    iv: &[u8],
) -> Result<String, CodecError> {
    let key = options.key().as_bytes();
    let data = plaintext.as_bytes();

    let ciphertext = match options.algorithm() {
        Algorithm::Aes128Cbc => cbc::Encryptor::<Aes128>::new_from_slices(key, iv)
            .map_err(|_| CodecError::EncryptionFailed)?
            .encrypt_padded_vec_mut::<Pkcs7>(data),
        Algorithm::Aes192Cbc => cbc::Encryptor::<Aes192>::new_from_slices(key, iv)
            .map_err(|_| CodecError::EncryptionFailed)?
            .encrypt_padded_vec_mut::<Pkcs7>(data),
        Algorithm::Aes256Cbc => cbc::Encryptor::<Aes256>::new_from_slices(key, iv)
            .map_err(|_| CodecError::EncryptionFailed)?
            .encrypt_padded_vec_mut::<Pkcs7>(data),
    };

    let mut out = Vec::with_capacity(iv.len() + ciphertext.len());
    out.extend_from_slice(iv);
    out.extend_from_slice(&ciphertext);
    Ok(STANDARD.encode(out))
}

/// Decrypt a value produced by [`encrypt_field`] back to its plaintext.
///
/// # Errors
///
/// Returns [`CodecError::DecryptionFailed`] if `encoded` is not base64, is
/// shorter than the IV, has a ciphertext that is empty or not a whole number
/// of blocks, fails padding validation, or does not decrypt to UTF-8.
pub fn decrypt_field(encoded: &str, options: &EncryptionOptions) -> Result<String, CodecError> {
    let raw = STANDARD
        .decode(encoded)
        .map_err(|_| CodecError::DecryptionFailed("value is not valid base64"))?;

    if raw.len() < options.iv_length() {
        return Err(CodecError::DecryptionFailed("value is shorter than the IV"));
    }
    let (iv, ciphertext) = raw.split_at(options.iv_length());
    if ciphertext.is_empty() || ciphertext.len() % BLOCK_LEN != 0 {
        return Err(CodecError::DecryptionFailed(
            "ciphertext is not a whole number of blocks",
        ));
    }

    let key = options.key().as_bytes();
    let plaintext = match options.algorithm() {
        Algorithm::Aes128Cbc => cbc::Decryptor::<Aes128>::new_from_slices(key, iv)
            .map_err(|_| CodecError::DecryptionFailed("cipher rejected key or IV"))?
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext),
        Algorithm::Aes192Cbc => cbc::Decryptor::<Aes192>::new_from_slices(key, iv)
            .map_err(|_| CodecError::DecryptionFailed("cipher rejected key or IV"))?
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext),
        Algorithm::Aes256Cbc => cbc::Decryptor::<Aes256>::new_from_slices(key, iv)
            .map_err(|_| CodecError::DecryptionFailed("cipher rejected key or IV"))?
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext),
    }
    .map_err(|_| CodecError::DecryptionFailed("bad padding"))?;

    String::from_utf8(plaintext)
        .map_err(|_| CodecError::DecryptionFailed("plaintext is not valid UTF-8"))
}
