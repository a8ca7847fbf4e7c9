//! Token encryption module using AES-256-GCM
//!
//! This module provides the credential vault used for access tokens stored in
//! the database. Secrets are sealed with AES-256-GCM under a single
//! process-wide key and serialized as a textual envelope of three
//! colon-delimited hex segments: `nonce:tag:ciphertext`.

use aes_gcm::{
    Aes256Gcm, Key, Nonce,
    aead::{Aead, AeadCore, KeyInit, OsRng},
};
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// Crypto error types
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("encryption failed: {0}")]
    EncryptionFailed(String),
    /// Envelope does not split into three non-empty hex segments.
    #[error("invalid envelope format")]
    InvalidFormat,
    /// Authentication tag did not verify; the envelope was tampered with or
    /// sealed under a different key.
    #[error("authentication failed")]
    AuthenticationFailed,
    #[error("decrypted payload is not valid UTF-8")]
    InvalidUtf8,
}

/// Secure wrapper for the encryption key with zeroization
#[derive(Debug, Clone, Zeroize, ZeroizeOnDrop)]
pub struct VaultKey(Vec<u8>);

impl VaultKey {
    /// Create a new vault key from raw bytes; must be exactly 32 bytes.
    pub fn new(bytes: Vec<u8>) -> Result<Self, CryptoError> {
        if bytes.len() != 32 {
            return Err(CryptoError::EncryptionFailed(
                "invalid key length: expected 32 bytes".to_string(),
            ));
        }
        Ok(VaultKey(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Encrypt a secret, producing a `nonce:tag:ciphertext` hex envelope.
///
/// A fresh random nonce is drawn per call, so encrypting the same plaintext
/// twice yields different envelopes that both decrypt correctly.
pub fn encrypt(key: &VaultKey, plaintext: &str) -> Result<String, CryptoError> {
    let cipher_key = Key::<Aes256Gcm>::from_slice(key.as_bytes());
    let cipher = Aes256Gcm::new(cipher_key);

    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

    // aes-gcm appends the 16-byte tag to the ciphertext; split it back out so
    // the envelope carries the tag as its own segment.
    let mut sealed = cipher
        .encrypt(&nonce, plaintext.as_bytes())
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;
    let tag = sealed.split_off(sealed.len() - TAG_LEN);

    Ok(format!(
        "{}:{}:{}",
        hex::encode(nonce),
        hex::encode(tag),
        hex::encode(sealed)
    ))
}

/// Decrypt a `nonce:tag:ciphertext` hex envelope produced by [`encrypt`].
pub fn decrypt(key: &VaultKey, envelope: &str) -> Result<String, CryptoError> {
    let segments: Vec<&str> = envelope.split(':').collect();
    let [nonce_hex, tag_hex, ct_hex] = segments.as_slice() else {
        return Err(CryptoError::InvalidFormat);
    };
    // The ciphertext segment is empty for an empty plaintext; nonce and tag
    // are always present.
    if nonce_hex.is_empty() || tag_hex.is_empty() {
        return Err(CryptoError::InvalidFormat);
    }

    let nonce_bytes = hex::decode(nonce_hex).map_err(|_| CryptoError::InvalidFormat)?;
    let tag = hex::decode(tag_hex).map_err(|_| CryptoError::InvalidFormat)?;
    let ciphertext = hex::decode(ct_hex).map_err(|_| CryptoError::InvalidFormat)?;

    if nonce_bytes.len() != NONCE_LEN || tag.len() != TAG_LEN {
        return Err(CryptoError::InvalidFormat);
    }

    let nonce = Nonce::from_slice(&nonce_bytes);

    // Reconstruct ciphertext || tag for the aead interface.
    let mut sealed = ciphertext;
    sealed.extend_from_slice(&tag);

    let cipher_key = Key::<Aes256Gcm>::from_slice(key.as_bytes());
    let cipher = Aes256Gcm::new(cipher_key);

    let plaintext = cipher
        .decrypt(nonce, sealed.as_ref())
        .map_err(|_| CryptoError::AuthenticationFailed)?;

    String::from_utf8(plaintext).map_err(|_| CryptoError::InvalidUtf8)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_key() -> VaultKey {
        VaultKey::new(vec![7u8; 32]).expect("valid test key")
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let key = test_key();
        for plaintext in ["secret token", "", "日本語のトークン🔑"] {
            let envelope = encrypt(&key, plaintext).expect("encryption succeeds");
            let decrypted = decrypt(&key, &envelope).expect("decryption succeeds");
            assert_eq!(decrypted, plaintext);
        }
    }

    #[test]
    fn test_envelope_shape() {
        let key = test_key();
        let envelope = encrypt(&key, "shape-check").expect("encryption succeeds");
        let segments: Vec<&str> = envelope.split(':').collect();

        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0].len(), NONCE_LEN * 2);
        assert_eq!(segments[1].len(), TAG_LEN * 2);
        assert!(segments.iter().all(|s| !s.is_empty()));
    }

    #[test]
    fn test_nonce_uniqueness() {
        let key = test_key();
        let first = encrypt(&key, "same plaintext").expect("encryption succeeds");
        let second = encrypt(&key, "same plaintext").expect("encryption succeeds");

        assert_ne!(first, second);
        assert_eq!(decrypt(&key, &first).unwrap(), "same plaintext");
        assert_eq!(decrypt(&key, &second).unwrap(), "same plaintext");
    }

    #[test]
    fn test_tampered_ciphertext_fails_authentication() {
        let key = test_key();
        let envelope = encrypt(&key, "tamper me").expect("encryption succeeds");

        let mut segments: Vec<String> = envelope.split(':').map(String::from).collect();
        let ct = &mut segments[2];
        let flipped = if ct.ends_with('0') { "1" } else { "0" };
        ct.replace_range(ct.len() - 1.., flipped);

        let result = decrypt(&key, &segments.join(":"));
        assert!(matches!(result, Err(CryptoError::AuthenticationFailed)));
    }

    #[test]
    fn test_tampered_tag_fails_authentication() {
        let key = test_key();
        let envelope = encrypt(&key, "tamper me").expect("encryption succeeds");

        let mut segments: Vec<String> = envelope.split(':').map(String::from).collect();
        let tag = &mut segments[1];
        let flipped = if tag.starts_with('a') { "b" } else { "a" };
        tag.replace_range(..1, flipped);

        let result = decrypt(&key, &segments.join(":"));
        assert!(matches!(result, Err(CryptoError::AuthenticationFailed)));
    }

    #[test]
    fn test_wrong_key_fails_authentication() {
        let envelope = encrypt(&test_key(), "cross-key").expect("encryption succeeds");
        let other = VaultKey::new(vec![9u8; 32]).unwrap();

        assert!(matches!(
            decrypt(&other, &envelope),
            Err(CryptoError::AuthenticationFailed)
        ));
    }

    #[test]
    fn test_malformed_envelope_is_format_error() {
        let key = test_key();
        for bad in [
            "",
            "onlyone",
            "two:segments",
            "a:b:c:d",
            "::",
            "zz:zz:zz",
            "deadbeef::cafe",
        ] {
            let result = decrypt(&key, bad);
            assert!(
                matches!(result, Err(CryptoError::InvalidFormat)),
                "expected format error for {:?}",
                bad
            );
        }
    }

    #[test]
    fn test_short_nonce_rejected() {
        let key = test_key();
        // Valid hex but wrong nonce length.
        let result = decrypt(&key, "dead:00112233445566778899aabbccddeeff:beef");
        assert!(matches!(result, Err(CryptoError::InvalidFormat)));
    }

    #[test]
    fn test_invalid_key_length_rejected() {
        assert!(VaultKey::new(vec![0u8; 16]).is_err());
        assert!(VaultKey::new(vec![0u8; 64]).is_err());
    }
}
