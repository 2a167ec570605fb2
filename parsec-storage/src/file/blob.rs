//! Decrypted vlob payload schema (spec.md §3/§6): a JSON array of
//! `BlockGroup`, one per `build_file_blocks` call, in file order. Plain
//! structs (no `HashMap`) so `serde_json`'s declaration-order field
//! serialization keeps the encoding stable, per spec.md §6.

use serde::{Deserialize, Serialize};

use crate::block::BlockId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockMeta {
    pub block: BlockId,
    pub digest: String,
    pub size: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockGroup {
    pub key: String,
    pub blocks: Vec<BlockMeta>,
}

pub type Blob = Vec<BlockGroup>;
