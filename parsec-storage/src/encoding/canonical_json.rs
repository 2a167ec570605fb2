//! Canonical JSON serialization for the vlob payload (spec.md §6).
//!
//! `serde_json`'s struct serializer already emits fields in declaration
//! order and doesn't insert whitespace with `to_vec`/`to_string`, so as long
//! as the payload types use plain structs (not `HashMap`) the output is
//! byte-identical across runs for identical input -- which is what
//! "future reencrypt-then-diff tooling" in spec.md §6 needs.

use serde::Serialize;

use crate::error::{CResult, Error};

/// Serializes `value` to the compact, stable-order JSON bytes stored
/// (encrypted) as a vlob blob.
pub fn to_canonical_bytes<T: Serialize>(value: &T) -> CResult<Vec<u8>> {
    serde_json::to_vec(value).map_err(Error::from)
}

/// Deserializes vlob blob bytes back into `T`.
pub fn from_canonical_bytes<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> CResult<T> {
    serde_json::from_slice(bytes).map_err(Error::from)
}
