//! # Credential Vault
//!
//! Seals activation secrets (account passwords handed to clients) before
//! they are persisted.
//!
//! ## Envelope Format
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  "v1:" + base64( nonce[12] ‖ ciphertext[n] ‖ tag[16] )                 │
//! │                                                                         │
//! │  • AES-256-GCM, authenticated                                          │
//! │  • Fresh random 96-bit nonce per seal(), stored inside the envelope    │
//! │  • Any flipped byte → open() fails with DecryptionFailed               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Key Handling
//! The vault is constructed once at startup from a 32-byte key and injected
//! into whoever needs it. A missing or malformed key is a
//! [`CoreError::Configuration`] at construction time, never a per-call error.
//!
//! ```rust
//! use resale_core::vault::CredentialVault;
//! use secrecy::ExposeSecret;
//!
//! let vault = CredentialVault::from_key_bytes(&[7u8; 32]).unwrap();
//! let sealed = vault.seal("s3cret-pass").unwrap();
//! assert_ne!(sealed.as_envelope(), "s3cret-pass");
//!
//! let opened = vault.open(&sealed).unwrap();
//! assert_eq!(opened.expose_secret(), "s3cret-pass");
//! ```

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use rand::rngs::OsRng;
use rand::RngCore;
use secrecy::zeroize::Zeroize;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};

/// Required key length in bytes (AES-256).
pub const KEY_LEN: usize = 32;

const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;
const ENVELOPE_PREFIX: &str = "v1:";

// =============================================================================
// Sealed Secret
// =============================================================================

/// Ciphertext envelope produced by [`CredentialVault::seal`]. Safe to persist.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(transparent)]
#[ts(export)]
pub struct SealedSecret(String);

impl SealedSecret {
    /// Wraps an envelope read back from storage.
    pub fn from_envelope(envelope: impl Into<String>) -> Self {
        SealedSecret(envelope.into())
    }

    /// The persisted envelope text.
    pub fn as_envelope(&self) -> &str {
        &self.0
    }
}

/// Sealed values are never logged.
impl fmt::Debug for SealedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SealedSecret([SEALED])")
    }
}

// =============================================================================
// Vault
// =============================================================================

/// Symmetric authenticated encryption for activation secrets.
#[derive(Clone)]
pub struct CredentialVault {
    cipher: Aes256Gcm,
}

impl CredentialVault {
    /// Creates a vault from raw key bytes.
    ///
    /// ## Errors
    /// `CoreError::Configuration` unless the key is exactly 32 bytes.
    pub fn from_key_bytes(key: &[u8]) -> CoreResult<Self> {
        if key.len() != KEY_LEN {
            return Err(CoreError::Configuration(format!(
                "vault key must be {} bytes, got {}",
                KEY_LEN,
                key.len()
            )));
        }

        let cipher = Aes256Gcm::new_from_slice(key)
            .map_err(|_| CoreError::Configuration("vault key rejected by cipher".to_string()))?;

        Ok(CredentialVault { cipher })
    }

    /// Creates a vault from a base64-encoded key.
    pub fn from_base64_key(key: &SecretString) -> CoreResult<Self> {
        let mut bytes = STANDARD
            .decode(key.expose_secret().trim())
            .map_err(|_| CoreError::Configuration("vault key is not valid base64".to_string()))?;

        let vault = Self::from_key_bytes(&bytes);
        bytes.zeroize();
        vault
    }

    /// Encrypts `plaintext` under a fresh random nonce.
    pub fn seal(&self, plaintext: &str) -> CoreResult<SealedSecret> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|_| CoreError::EncryptionFailed)?;

        let mut payload = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        payload.extend_from_slice(&nonce_bytes);
        payload.extend_from_slice(&ciphertext);

        Ok(SealedSecret(format!(
            "{}{}",
            ENVELOPE_PREFIX,
            STANDARD.encode(payload)
        )))
    }

    /// Decrypts an envelope produced by [`seal`](Self::seal).
    ///
    /// ## Errors
    /// `CoreError::DecryptionFailed` when the envelope is malformed, was
    /// tampered with, or was sealed under another key. Never returns an
    /// empty or partial plaintext instead.
    pub fn open(&self, sealed: &SealedSecret) -> CoreResult<SecretString> {
        let encoded = sealed
            .0
            .strip_prefix(ENVELOPE_PREFIX)
            .ok_or_else(|| CoreError::decryption("unknown envelope version"))?;

        let payload = STANDARD
            .decode(encoded)
            .map_err(|_| CoreError::decryption("envelope is not valid base64"))?;

        if payload.len() < NONCE_LEN + TAG_LEN {
            return Err(CoreError::decryption("envelope too short"));
        }

        let (nonce_bytes, ciphertext) = payload.split_at(NONCE_LEN);
        let nonce = Nonce::from_slice(nonce_bytes);

        let mut plaintext = self
            .cipher
            .decrypt(nonce, ciphertext)
            .map_err(|_| CoreError::decryption("authentication failed"))?;

        match String::from_utf8(plaintext.clone()) {
            Ok(secret) => {
                plaintext.zeroize();
                Ok(SecretString::new(secret))
            }
            Err(_) => {
                plaintext.zeroize();
                Err(CoreError::decryption("plaintext is not UTF-8"))
            }
        }
    }
}

impl fmt::Debug for CredentialVault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialVault").finish_non_exhaustive()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn vault() -> CredentialVault {
        CredentialVault::from_key_bytes(&[42u8; KEY_LEN]).unwrap()
    }

    #[test]
    fn test_round_trip() {
        let vault = vault();
        for plaintext in ["", "p", "correct horse battery staple", "pässwörd-✓"] {
            let sealed = vault.seal(plaintext).unwrap();
            assert!(sealed.as_envelope().starts_with("v1:"));
            assert_eq!(vault.open(&sealed).unwrap().expose_secret(), plaintext);
        }
    }

    #[test]
    fn test_fresh_nonce_per_seal() {
        let vault = vault();
        let a = vault.seal("same-secret").unwrap();
        let b = vault.seal("same-secret").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_any_mutation_fails_to_open() {
        let vault = vault();
        // 12 + 8 + 16 = 36 bytes → 48 base64 chars, no padding
        let sealed = vault.seal("hunter22").unwrap();
        let envelope = sealed.as_envelope().to_string();

        for i in 0..envelope.len() {
            let mut bytes = envelope.clone().into_bytes();
            bytes[i] = if bytes[i] == b'A' { b'B' } else { b'A' };
            let tampered = SealedSecret::from_envelope(String::from_utf8(bytes).unwrap());

            let result = vault.open(&tampered);
            assert!(
                matches!(result, Err(CoreError::DecryptionFailed { .. })),
                "mutation at byte {} was not detected",
                i
            );
        }
    }

    #[test]
    fn test_malformed_envelopes() {
        let vault = vault();
        for envelope in ["", "hunter22", "v2:AAAA", "v1:!!!", "v1:AAAA"] {
            let result = vault.open(&SealedSecret::from_envelope(envelope));
            assert!(matches!(result, Err(CoreError::DecryptionFailed { .. })));
        }
    }

    #[test]
    fn test_wrong_key_fails() {
        let sealed = vault().seal("secret").unwrap();
        let other = CredentialVault::from_key_bytes(&[1u8; KEY_LEN]).unwrap();
        assert!(matches!(
            other.open(&sealed),
            Err(CoreError::DecryptionFailed { .. })
        ));
    }

    #[test]
    fn test_key_must_be_32_bytes() {
        assert!(matches!(
            CredentialVault::from_key_bytes(&[0u8; 16]),
            Err(CoreError::Configuration(_))
        ));
    }

    #[test]
    fn test_base64_key() {
        let key = SecretString::new(STANDARD.encode([9u8; KEY_LEN]));
        assert!(CredentialVault::from_base64_key(&key).is_ok());

        let bad = SecretString::new("not base64 at all!".to_string());
        assert!(matches!(
            CredentialVault::from_base64_key(&bad),
            Err(CoreError::Configuration(_))
        ));
    }

    #[test]
    fn test_debug_is_redacted() {
        let sealed = vault().seal("hunter22").unwrap();
        assert_eq!(format!("{:?}", sealed), "SealedSecret([SEALED])");
        assert!(!format!("{:?}", vault()).contains("42"));
    }
}
