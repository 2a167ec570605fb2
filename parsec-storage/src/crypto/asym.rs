//! RSA primitives for the identity layer (spec.md §4.1). Nothing else in
//! this crate calls into these types; they exist so a future identity
//! subsystem has somewhere to land, matching `RSAPrivateKey`/`RSAPublicKey`
//! in the original `parsec/crypto.py`.

use std::fmt;

use rand::rngs::OsRng;
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey};
use rsa::signature::{RandomizedSigner, SignatureEncoding, Verifier};
use rsa::{Oaep, RsaPrivateKey as Inner, RsaPublicKey as InnerPub};
use sha2::Sha256;

use crate::crypto::SymKey;

const MIN_KEY_BITS: usize = 1024;

#[derive(Debug, Clone, PartialEq)]
pub enum AsymKeyError {
    KeyTooSmall,
    InvalidKey(String),
    InvalidSignature,
    Crypto(String),
}

impl fmt::Display for AsymKeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AsymKeyError::KeyTooSmall => write!(f, "minimal key size is 1024 bits"),
            AsymKeyError::InvalidKey(msg) => write!(f, "invalid key: {}", msg),
            AsymKeyError::InvalidSignature => write!(f, "invalid signature"),
            AsymKeyError::Crypto(msg) => write!(f, "crypto error: {}", msg),
        }
    }
}

impl std::error::Error for AsymKeyError {}

pub struct RsaPrivateKey {
    inner: Inner,
}

pub struct RsaPublicKey {
    inner: InnerPub,
}

impl RsaPrivateKey {
    /// Generates a fresh key of at least `MIN_KEY_BITS` bits.
    pub fn generate(bits: usize) -> Result<Self, AsymKeyError> {
        if bits < MIN_KEY_BITS {
            return Err(AsymKeyError::KeyTooSmall);
        }
        let inner =
            Inner::new(&mut OsRng, bits).map_err(|e| AsymKeyError::Crypto(e.to_string()))?;
        Ok(Self { inner })
    }

    pub fn from_pkcs8_pem(pem: &str) -> Result<Self, AsymKeyError> {
        let inner =
            Inner::from_pkcs8_pem(pem).map_err(|e| AsymKeyError::InvalidKey(e.to_string()))?;
        if inner.size() * 8 < MIN_KEY_BITS {
            return Err(AsymKeyError::KeyTooSmall);
        }
        Ok(Self { inner })
    }

    /// PSS/SHA-256 signature, per spec.md §4.1.
    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>, AsymKeyError> {
        let signing_key = rsa::pss::SigningKey::<Sha256>::new(self.inner.clone());
        let signature = signing_key.sign_with_rng(&mut OsRng, message);
        Ok(signature.to_vec())
    }

    /// Reverses `RsaPublicKey::encrypt`: unwrap the symmetric key with
    /// RSA-OAEP/SHA-256, then AES-GCM decrypt the payload.
    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, AsymKeyError> {
        if ciphertext.len() < 4 {
            return Err(AsymKeyError::InvalidKey("truncated envelope".to_string()));
        }
        let (len_bytes, rest) = ciphertext.split_at(4);
        let wrapped_len = u32::from_be_bytes(len_bytes.try_into().unwrap()) as usize;
        if rest.len() < wrapped_len {
            return Err(AsymKeyError::InvalidKey("truncated wrapped key".to_string()));
        }
        let (wrapped_key, sym_ciphertext) = rest.split_at(wrapped_len);
        let raw_sym_key = self
            .inner
            .decrypt(Oaep::new::<Sha256>(), wrapped_key)
            .map_err(|e| AsymKeyError::Crypto(e.to_string()))?;
        let sym_key =
            SymKey::load(&raw_sym_key).map_err(|e| AsymKeyError::Crypto(e.to_string()))?;
        sym_key
            .decrypt(sym_ciphertext)
            .map_err(|e| AsymKeyError::Crypto(e.to_string()))
    }

    pub fn public_key(&self) -> RsaPublicKey {
        RsaPublicKey { inner: self.inner.to_public_key() }
    }
}

impl RsaPublicKey {
    pub fn from_pkcs8_pem(pem: &str) -> Result<Self, AsymKeyError> {
        let inner =
            InnerPub::from_public_key_pem(pem).map_err(|e| AsymKeyError::InvalidKey(e.to_string()))?;
        if inner.size() * 8 < MIN_KEY_BITS {
            return Err(AsymKeyError::KeyTooSmall);
        }
        Ok(Self { inner })
    }

    pub fn verify(&self, signature: &[u8], message: &[u8]) -> Result<(), AsymKeyError> {
        let verifying_key = rsa::pss::VerifyingKey::<Sha256>::new(self.inner.clone());
        let signature = rsa::pss::Signature::try_from(signature)
            .map_err(|_| AsymKeyError::InvalidSignature)?;
        verifying_key
            .verify(message, &signature)
            .map_err(|_| AsymKeyError::InvalidSignature)
    }

    /// Envelope-encrypts `message`: generate a fresh symmetric key, AES-GCM
    /// encrypt the payload with it, then RSA-OAEP/SHA-256 wrap the symmetric
    /// key. Layout: `u32_be(len(wrapped_key)) || wrapped_key || sym_ciphertext`
    /// (spec.md §4.1).
    pub fn encrypt(&self, message: &[u8]) -> Result<Vec<u8>, AsymKeyError> {
        let sym_key = SymKey::generate();
        let sym_ciphertext = sym_key
            .encrypt(message)
            .map_err(|e| AsymKeyError::Crypto(e.to_string()))?;
        let wrapped_key = self
            .inner
            .encrypt(&mut OsRng, Oaep::new::<Sha256>(), sym_key.as_bytes())
            .map_err(|e| AsymKeyError::Crypto(e.to_string()))?;
        let mut out = Vec::with_capacity(4 + wrapped_key.len() + sym_ciphertext.len());
        out.extend_from_slice(&(wrapped_key.len() as u32).to_be_bytes());
        out.extend_from_slice(&wrapped_key);
        out.extend_from_slice(&sym_ciphertext);
        Ok(out)
    }
}
