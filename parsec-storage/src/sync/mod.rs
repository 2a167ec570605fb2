//! Synchronizer (spec.md §4.5): the single choke point through which the
//! `File` engine reaches the block/vlob store clients. It doesn't keep a
//! write-back cache of its own -- `BlockStore`/`VlobStore` implementations
//! already buffer locally-created-but-undurable data and expose it via
//! `list()` (spec.md §4.2/§4.3) -- instead it owns the *ordering* guarantee:
//! within one `commit()`, every dirty block is pushed to the backend before
//! any dirty vlob, so a vlob can never reference a block id the backend
//! hasn't seen yet.

use crate::block::{BlockId, BlockStore};
use crate::error::CResult;
use crate::vlob::{SyncOutcome, TrustSeed, VlobHandle, VlobId, VlobRead, VlobStore};

/// Outcome of one `commit()`: which blocks and vlobs were actually pushed,
/// and what the backend said about each vlob (same identity, or rotated).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncReport {
    pub blocks_synchronized: Vec<BlockId>,
    pub vlobs_synchronized: Vec<(VlobId, SyncOutcome)>,
}

/// Wraps one `BlockStore` and one `VlobStore`, presenting the combined
/// surface `File` needs (spec.md §4.5). Generic over both store traits so
/// tests can swap in fakes, mirroring the teacher's `Arc<Mutex<E: Engine>>`
/// wrapping pattern in `mvcc/mvcc.rs`.
pub struct Synchronizer<B: BlockStore, V: VlobStore> {
    blocks: B,
    vlobs: V,
}

impl<B: BlockStore, V: VlobStore> Synchronizer<B, V> {
    pub fn new(blocks: B, vlobs: V) -> Self {
        Self { blocks, vlobs }
    }

    pub fn block_create(&mut self, content: Vec<u8>) -> CResult<BlockId> {
        self.blocks.create(content)
    }

    pub fn block_read(&mut self, id: &BlockId) -> CResult<Vec<u8>> {
        self.blocks.read(id)
    }

    pub fn block_delete(&mut self, id: &BlockId) -> CResult<()> {
        self.blocks.delete(id)
    }

    /// Ids of blocks created locally but not yet pushed -- `File::load`
    /// uses this (via the owning vlob's block list) to decide whether a
    /// just-created file is still entirely local (spec.md §9).
    pub fn dirty_block_ids(&self) -> Vec<BlockId> {
        self.blocks.list()
    }

    pub fn vlob_create(&mut self, blob: Vec<u8>) -> CResult<VlobHandle> {
        self.vlobs.create(blob)
    }

    pub fn vlob_read(&mut self, id: &VlobId, read_trust_seed: &TrustSeed, version: Option<u64>) -> CResult<VlobRead> {
        self.vlobs.read(id, read_trust_seed, version)
    }

    pub fn vlob_update(&mut self, id: &VlobId, write_trust_seed: &TrustSeed, version: u64, blob: Vec<u8>) -> CResult<()> {
        self.vlobs.update(id, write_trust_seed, version, blob)
    }

    pub fn vlob_delete(&mut self, id: &VlobId) -> CResult<()> {
        self.vlobs.delete(id)
    }

    /// Ids of vlobs created or updated locally but not yet pushed.
    pub fn dirty_vlob_ids(&self) -> Vec<VlobId> {
        self.vlobs.list()
    }

    /// Pushes one block, by id, to the backend. No-op if already durable.
    pub fn commit_block(&mut self, id: &BlockId) -> CResult<()> {
        self.blocks.synchronize(id)
    }

    /// Pushes one vlob, by id, to the backend.
    pub fn commit_vlob(&mut self, id: &VlobId) -> CResult<SyncOutcome> {
        self.vlobs.synchronize(id)
    }

    /// Pushes every currently-dirty block, then every currently-dirty vlob.
    /// A vlob is only ever handed to the backend after all the blocks it
    /// can reference are already durable (spec.md §4.5 ordering guarantee).
    pub fn commit(&mut self) -> CResult<SyncReport> {
        let mut report = SyncReport::default();

        for id in self.blocks.list() {
            self.blocks.synchronize(&id)?;
            report.blocks_synchronized.push(id);
        }

        for id in self.vlobs.list() {
            let outcome = self.vlobs.synchronize(&id)?;
            report.vlobs_synchronized.push((id, outcome));
        }

        Ok(report)
    }
}
