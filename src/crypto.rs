//! Envelope encryption for gateway-issued payment-source identifiers.
//!
//! Uses HKDF to derive a per-owner data encryption key (DEK) from a
//! process-wide token key, then encrypts with AES-256-GCM.
//!
//! Binary format: MAGIC (4 bytes) || nonce (12 bytes) || ciphertext.
//! The stored/transported form is the base64 encoding of that blob, so
//! tokens fit TEXT columns and JSON payloads.
//!
//! A payment-source id leaves this module decrypted only at the point it
//! is sent back to the gateway.

use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit},
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use hkdf::Hkdf;
use sha2::Sha256;

use crate::error::{AppError, Result};

/// Nonce size for AES-GCM (96 bits)
const NONCE_SIZE: usize = 12;

/// Token key size (256 bits for AES-256)
const TOKEN_KEY_SIZE: usize = 32;

/// Magic bytes identifying an encrypted token
const TOKEN_MAGIC: &[u8] = b"TOK1";

/// Holds the process-wide key used to envelope-encrypt payment-source ids.
/// Per-owner DEKs are derived from it via HKDF.
#[derive(Clone)]
pub struct TokenCipher {
    key: [u8; TOKEN_KEY_SIZE],
}

impl TokenCipher {
    /// Create a TokenCipher from a base64-encoded string.
    /// The decoded key must be exactly 32 bytes.
    pub fn from_base64(encoded: &str) -> Result<Self> {
        let decoded = BASE64
            .decode(encoded.trim())
            .map_err(|e| AppError::Crypto(format!("invalid token key encoding: {}", e)))?;

        if decoded.len() != TOKEN_KEY_SIZE {
            return Err(AppError::Crypto(format!(
                "token key must be {} bytes, got {}",
                TOKEN_KEY_SIZE,
                decoded.len()
            )));
        }

        let mut key = [0u8; TOKEN_KEY_SIZE];
        key.copy_from_slice(&decoded);
        Ok(Self { key })
    }

    /// Generate a new random token key (for initial setup).
    /// Returns the key as a base64-encoded string.
    pub fn generate() -> String {
        use rand::RngCore;
        use rand::rngs::OsRng;
        let mut key = [0u8; TOKEN_KEY_SIZE];
        OsRng.fill_bytes(&mut key);
        BASE64.encode(key)
    }

    /// Create a TokenCipher from raw bytes.
    /// Note: for production, prefer `from_base64` with a securely stored key.
    pub fn from_bytes(key: [u8; 32]) -> Self {
        Self { key }
    }

    /// Derive a per-owner data encryption key using HKDF.
    fn derive_dek(&self, owner_id: &str) -> [u8; 32] {
        let hk = Hkdf::<Sha256>::new(Some(b"caja-v1"), &self.key);
        let mut dek = [0u8; 32];
        // Using owner_id as the info parameter gives each owner a unique DEK
        hk.expand(owner_id.as_bytes(), &mut dek)
            .expect("HKDF expand should not fail with valid length");
        dek
    }

    /// Encrypt a gateway payment-source id for storage.
    /// Returns base64( MAGIC || nonce || ciphertext ).
    pub fn encrypt_source_id(&self, owner_id: &str, source_id: &str) -> Result<String> {
        use rand::RngCore;
        use rand::rngs::OsRng;

        let dek = self.derive_dek(owner_id);
        let cipher = Aes256Gcm::new_from_slice(&dek)
            .map_err(|e| AppError::Crypto(format!("failed to create cipher: {}", e)))?;

        // Random nonce from OS entropy
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, source_id.as_bytes())
            .map_err(|e| AppError::Crypto(format!("encryption failed: {}", e)))?;

        let mut blob = Vec::with_capacity(TOKEN_MAGIC.len() + NONCE_SIZE + ciphertext.len());
        blob.extend_from_slice(TOKEN_MAGIC);
        blob.extend_from_slice(&nonce_bytes);
        blob.extend_from_slice(&ciphertext);

        Ok(BASE64.encode(blob))
    }

    /// Decrypt a stored payment-source token back to the gateway id.
    /// Accepts base64( MAGIC || nonce || ciphertext ).
    pub fn decrypt_source_id(&self, owner_id: &str, token: &str) -> Result<String> {
        let blob = BASE64
            .decode(token.trim())
            .map_err(|e| AppError::Crypto(format!("invalid token encoding: {}", e)))?;

        if blob.len() < TOKEN_MAGIC.len() + NONCE_SIZE + 1 {
            return Err(AppError::Crypto("encrypted token too short".into()));
        }

        if &blob[..TOKEN_MAGIC.len()] != TOKEN_MAGIC {
            return Err(AppError::Crypto(
                "invalid token format (missing magic bytes)".into(),
            ));
        }

        let dek = self.derive_dek(owner_id);
        let cipher = Aes256Gcm::new_from_slice(&dek)
            .map_err(|e| AppError::Crypto(format!("failed to create cipher: {}", e)))?;

        let nonce_start = TOKEN_MAGIC.len();
        let nonce_end = nonce_start + NONCE_SIZE;
        let nonce = Nonce::from_slice(&blob[nonce_start..nonce_end]);
        let ciphertext = &blob[nonce_end..];

        // GCM authenticates, so tampering fails here rather than yielding garbage
        let plaintext = cipher
            .decrypt(nonce, ciphertext)
            .map_err(|_| AppError::Crypto("decryption failed (tampered or wrong key)".into()))?;

        String::from_utf8(plaintext)
            .map_err(|_| AppError::Crypto("decrypted token is not valid UTF-8".into()))
    }
}
