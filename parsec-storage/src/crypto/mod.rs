//! Symmetric and asymmetric key primitives (spec.md §4.1).
//!
//! Symmetric keys protect block and vlob ciphertext; asymmetric keys belong
//! to the identity layer and are kept here only for completeness, since
//! nothing else in this crate exercises them.

mod asym;
mod digest;
mod sym;

pub use asym::{AsymKeyError, RsaPrivateKey, RsaPublicKey};
pub use digest::{digest_hex, DIGEST_HEX_LEN};
pub use sym::{SymKey, SYM_KEY_LEN};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sym_roundtrip_is_authenticated() {
        let key = SymKey::generate();
        let ct = key.encrypt(b"hello world").unwrap();
        let pt = key.decrypt(&ct).unwrap();
        assert_eq!(pt, b"hello world");
    }

    #[test]
    fn digest_is_deterministic() {
        assert_eq!(digest_hex(b"hello"), digest_hex(b"hello"));
        assert_ne!(digest_hex(b"hello"), digest_hex(b"hellp"));
    }
}
