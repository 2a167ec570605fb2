//! `find_matching_blocks`: classifies every block of the current vlob
//! version against a `[offset, offset + size)` window, grounded on
//! `_find_matching_blocks` in
//! `examples/original_source/parsec/core/file.py`. Used by both `read`
//! (window = the requested read range) and `flush` (window = the range a
//! pending write/truncate touches), so the block-group runs that fall
//! entirely outside the window can be copied across untouched while the
//! ones straddling its edges get split at the byte level.

use crate::file::blob::BlockMeta;

/// One contiguous run of blocks sharing the same per-run symmetric key,
/// i.e. one `BlockGroup` minus the key itself (carried alongside).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlockRun {
    pub key: String,
    pub blocks: Vec<BlockMeta>,
}

pub(crate) fn push_or_merge(runs: &mut Vec<BlockRun>, key: &str, block: BlockMeta) {
    if let Some(last) = runs.last_mut() {
        if last.key == key {
            last.blocks.push(block);
            return;
        }
    }
    runs.push(BlockRun { key: key.to_string(), blocks: vec![block] });
}

/// The five-bucket split of a vlob's blocks around a `[offset, offset +
/// size)` window, plus the partial cleartext extracted from the two blocks
/// straddling the window's edges.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchingBlocks {
    pub pre_excluded_blocks: Vec<BlockRun>,
    pub pre_excluded_data: Vec<u8>,
    pub pre_included_data: Vec<u8>,
    pub included_blocks: Vec<BlockRun>,
    pub post_included_data: Vec<u8>,
    pub post_excluded_data: Vec<u8>,
    pub post_excluded_blocks: Vec<BlockRun>,
}
