use aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use rand::RngCore;

use crate::error::{CResult, Error};

/// Length in bytes of an AES-256-GCM key.
pub const SYM_KEY_LEN: usize = 32;

const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// A 256-bit AES-GCM key, as described in spec.md §4.1: ciphertext layout is
/// `nonce (12B) || ciphertext || tag (16B)`.
#[derive(Clone)]
pub struct SymKey {
    raw: [u8; SYM_KEY_LEN],
}

impl SymKey {
    /// Generates a fresh random key.
    pub fn generate() -> Self {
        let mut raw = [0u8; SYM_KEY_LEN];
        rand::thread_rng().fill_bytes(&mut raw);
        Self { raw }
    }

    /// Loads a key from its raw 32-byte representation.
    pub fn load(raw: &[u8]) -> CResult<Self> {
        if raw.len() != SYM_KEY_LEN {
            return Err(Error::Integrity(format!(
                "expected a {}-byte symmetric key, got {}",
                SYM_KEY_LEN,
                raw.len()
            )));
        }
        let mut key = [0u8; SYM_KEY_LEN];
        key.copy_from_slice(raw);
        Ok(Self { raw: key })
    }

    /// Exports the raw key bytes, for embedding in a `BlockGroup` payload.
    pub fn as_bytes(&self) -> &[u8] {
        &self.raw
    }

    pub fn encrypt(&self, cleartext: &[u8]) -> CResult<Vec<u8>> {
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.raw));
        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);
        let mut ciphertext = cipher
            .encrypt(nonce, cleartext)
            .map_err(|e| Error::Integrity(format!("encryption failed: {}", e)))?;
        let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        out.extend_from_slice(&nonce_bytes);
        out.append(&mut ciphertext);
        Ok(out)
    }

    pub fn decrypt(&self, ciphertext: &[u8]) -> CResult<Vec<u8>> {
        if ciphertext.len() < NONCE_LEN + TAG_LEN {
            return Err(Error::Integrity("ciphertext too short".to_string()));
        }
        let (nonce_bytes, rest) = ciphertext.split_at(NONCE_LEN);
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.raw));
        let nonce = Nonce::from_slice(nonce_bytes);
        cipher
            .decrypt(nonce, rest)
            .map_err(|_| Error::Integrity("AES-GCM tag mismatch".to_string()))
    }
}
