//! Payload encryption for RPC requests.
//!
//! # Algorithms
//!
//! - **Key Derivation**: SHA-256 over a domain tag, the client id and the
//!   server-issued client secret key
//! - **Encryption**: ChaCha20-Poly1305 (authenticated encryption)
//!
//! # Wire format
//!
//! `base64(nonce || ciphertext || tag)`, standard alphabet with padding.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chacha20poly1305::{aead::Aead, ChaCha20Poly1305, Key, KeyInit, Nonce};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::types::{ClientError, Result};

// =============================================================================
// Constants
// =============================================================================

/// Domain separation tag mixed into every derived payload key
pub const KEY_DERIVATION_TAG: &[u8] = b"nats-connect/payload-key/v1";

/// Payload key length (32 bytes)
pub const KEY_LEN: usize = 32;

/// Nonce length for ChaCha20-Poly1305 (12 bytes)
pub const NONCE_LEN: usize = 12;

/// ChaCha20-Poly1305 auth tag length (16 bytes)
pub const AUTH_TAG_LEN: usize = 16;

// =============================================================================
// Capability
// =============================================================================

/// Authenticated encryption of request payloads.
///
/// Implementations must be safe to share across concurrent calls.
pub trait PayloadCipher: Send + Sync {
    /// Seal plaintext into an opaque string.
    fn encrypt(&self, plaintext: &[u8]) -> Result<String>;

    /// Open a string produced by [`PayloadCipher::encrypt`].
    fn decrypt(&self, sealed: &str) -> Result<Vec<u8>>;
}

// =============================================================================
// Key Derivation
// =============================================================================

/// A derived payload key. Zeroized when dropped.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct PayloadKey {
    bytes: [u8; KEY_LEN],
}

impl PayloadKey {
    /// Derive the per-client payload key.
    ///
    /// Fields are length-prefixed so that `("ab", "c")` and `("a", "bc")`
    /// never collide.
    pub fn derive(client_id: &str, secret_key: &str) -> Result<Self> {
        if client_id.is_empty() || secret_key.is_empty() {
            return Err(ClientError::Encryption(
                "key derivation requires a client id and a secret key".into(),
            ));
        }

        let mut hasher = Sha256::new();
        hasher.update(KEY_DERIVATION_TAG);
        hasher.update((client_id.len() as u64).to_be_bytes());
        hasher.update(client_id.as_bytes());
        hasher.update((secret_key.len() as u64).to_be_bytes());
        hasher.update(secret_key.as_bytes());

        let mut bytes = [0u8; KEY_LEN];
        bytes.copy_from_slice(&hasher.finalize());
        Ok(Self { bytes })
    }
}

impl std::fmt::Debug for PayloadKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PayloadKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

// =============================================================================
// Encryption / Decryption
// =============================================================================

/// ChaCha20-Poly1305 payload cipher keyed per client
#[derive(Debug, Clone)]
pub struct ChaChaPayloadCipher {
    key: PayloadKey,
}

impl ChaChaPayloadCipher {
    pub fn new(key: PayloadKey) -> Self {
        Self { key }
    }

    /// Derive the key from the client credentials and build the cipher.
    pub fn derive(client_id: &str, secret_key: &str) -> Result<Self> {
        Ok(Self::new(PayloadKey::derive(client_id, secret_key)?))
    }

    fn cipher(&self) -> ChaCha20Poly1305 {
        ChaCha20Poly1305::new(Key::from_slice(&self.key.bytes))
    }
}

impl PayloadCipher for ChaChaPayloadCipher {
    fn encrypt(&self, plaintext: &[u8]) -> Result<String> {
        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);

        let ciphertext = self
            .cipher()
            .encrypt(Nonce::from_slice(&nonce), plaintext)
            .map_err(|e| ClientError::Encryption(format!("Encryption failed: {e}")))?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        sealed.extend_from_slice(&nonce);
        sealed.extend_from_slice(&ciphertext);
        Ok(STANDARD.encode(sealed))
    }

    fn decrypt(&self, sealed: &str) -> Result<Vec<u8>> {
        let raw = STANDARD
            .decode(sealed.trim())
            .map_err(|e| ClientError::Encryption(format!("Invalid payload encoding: {e}")))?;

        if raw.len() < NONCE_LEN + AUTH_TAG_LEN {
            return Err(ClientError::Encryption(format!(
                "Sealed payload too short: {} bytes",
                raw.len()
            )));
        }

        let (nonce, ciphertext) = raw.split_at(NONCE_LEN);
        self.cipher()
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| ClientError::Encryption("Failed to decrypt payload (wrong key?)".into()))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_derivation_is_deterministic() {
        let a = ChaChaPayloadCipher::derive("c1", "s1").unwrap();
        let b = ChaChaPayloadCipher::derive("c1", "s1").unwrap();

        let sealed = a.encrypt(b"hello").unwrap();
        assert_eq!(b.decrypt(&sealed).unwrap(), b"hello");
    }

    #[test]
    fn test_key_derivation_separates_fields() {
        let a = ChaChaPayloadCipher::derive("ab", "c").unwrap();
        let b = ChaChaPayloadCipher::derive("a", "bc").unwrap();

        let sealed = a.encrypt(b"payload").unwrap();
        assert!(b.decrypt(&sealed).is_err());
    }

    #[test]
    fn test_key_derivation_requires_inputs() {
        assert!(matches!(
            PayloadKey::derive("", "s1"),
            Err(ClientError::Encryption(_))
        ));
        assert!(matches!(
            PayloadKey::derive("c1", ""),
            Err(ClientError::Encryption(_))
        ));
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let cipher = ChaChaPayloadCipher::derive("client", "secret").unwrap();
        let plaintext = br#"{"saas_key":"k","base_url":"https://example.com"}"#;

        let sealed = cipher.encrypt(plaintext).unwrap();
        let raw = STANDARD.decode(&sealed).unwrap();

        // nonce + ciphertext + tag
        assert_eq!(raw.len(), NONCE_LEN + plaintext.len() + AUTH_TAG_LEN);
        assert_eq!(cipher.decrypt(&sealed).unwrap(), plaintext);
    }

    #[test]
    fn test_fresh_nonce_per_message() {
        let cipher = ChaChaPayloadCipher::derive("client", "secret").unwrap();
        assert_ne!(cipher.encrypt(b"same").unwrap(), cipher.encrypt(b"same").unwrap());
    }

    #[test]
    fn test_tampered_payload_fails() {
        let cipher = ChaChaPayloadCipher::derive("client", "secret").unwrap();
        let mut raw = STANDARD.decode(cipher.encrypt(b"payload").unwrap()).unwrap();
        let last = raw.len() - 1;
        raw[last] ^= 0x01;

        assert!(cipher.decrypt(&STANDARD.encode(raw)).is_err());
    }

    #[test]
    fn test_short_payload_rejected() {
        let cipher = ChaChaPayloadCipher::derive("client", "secret").unwrap();
        let result = cipher.decrypt(&STANDARD.encode([0u8; 8]));
        assert!(matches!(result, Err(ClientError::Encryption(_))));
    }

    #[test]
    fn test_debug_redacts_key() {
        let cipher = ChaChaPayloadCipher::derive("client", "secret").unwrap();
        assert!(format!("{cipher:?}").contains("[REDACTED]"));
    }
}
