//! Configuration (spec.md §6 "Chunk size"), in the shape of the teacher's
//! `ConfigLoad` (`kv-cli/src/config.rs`): a plain `serde`-derived struct with
//! a hand-written `Default`. This crate ships no CLI and therefore no file
//! loader (`confy`) -- embedding applications construct/override this
//! directly and pass it to `File::create`/`File::load`.
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynchronizerConfig {
    /// Cleartext bytes per block, before encryption (spec.md §6).
    pub chunk_size: usize,
}

impl Default for SynchronizerConfig {
    fn default() -> Self {
        Self { chunk_size: 4096 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_chunk_size_matches_spec() {
        assert_eq!(SynchronizerConfig::default().chunk_size, 4096);
    }
}
