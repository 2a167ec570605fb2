//! Effect runtime glue (spec.md §5). The original implementation dispatches
//! every bit of I/O as an algebraic effect (`yield Effect(EBlockRead(...))`
//! in `examples/original_source/parsec/core/file.py`) so that a test
//! harness can intercept, replay or fail individual requests. Rust has no
//! equivalent of `effect2`'s coroutine-based effect handlers in the
//! teacher's dependency stack, so this crate collapses the same idea into
//! one closed enum plus one dispatch function: the `File` engine never
//! touches a `Synchronizer` directly, only `EffectRequest`/`dispatch`, which
//! keeps a single chokepoint a test can wrap to inject failures or count
//! calls.

use crate::block::{BlockId, BlockStore};
use crate::error::CResult;
use crate::sync::Synchronizer;
use crate::vlob::{SyncOutcome, TrustSeed, VlobHandle, VlobId, VlobRead, VlobStore};

/// One request per backend operation `file.py` yields, named after its
/// `E*` effect classes (`EBlockCreate`, `EVlobRead`, ...).
#[derive(Debug, Clone)]
pub enum EffectRequest {
    BlockCreate(Vec<u8>),
    BlockRead(BlockId),
    BlockDelete(BlockId),
    BlockSynchronize(BlockId),
    VlobCreate(Vec<u8>),
    VlobRead(VlobId, TrustSeed, Option<u64>),
    VlobUpdate(VlobId, TrustSeed, u64, Vec<u8>),
    VlobDelete(VlobId),
    VlobSynchronize(VlobId),
    /// Ids of locally-dirty (not-yet-synchronized) vlobs, used by
    /// `File::load` to detect a just-created, uncommitted vlob.
    VlobList,
}

/// The matching response variant for each `EffectRequest`.
#[derive(Debug, Clone)]
pub enum EffectResponse {
    Block(Vec<u8>),
    BlockId(BlockId),
    Unit,
    Vlob(VlobRead),
    VlobHandle(VlobHandle),
    SyncOutcome(SyncOutcome),
    VlobIds(Vec<VlobId>),
}

impl EffectResponse {
    pub fn into_block(self) -> Vec<u8> {
        match self {
            EffectResponse::Block(b) => b,
            other => unreachable!("expected EffectResponse::Block, got {other:?}"),
        }
    }

    pub fn into_block_id(self) -> BlockId {
        match self {
            EffectResponse::BlockId(id) => id,
            other => unreachable!("expected EffectResponse::BlockId, got {other:?}"),
        }
    }

    pub fn into_vlob(self) -> VlobRead {
        match self {
            EffectResponse::Vlob(v) => v,
            other => unreachable!("expected EffectResponse::Vlob, got {other:?}"),
        }
    }

    pub fn into_vlob_handle(self) -> VlobHandle {
        match self {
            EffectResponse::VlobHandle(h) => h,
            other => unreachable!("expected EffectResponse::VlobHandle, got {other:?}"),
        }
    }

    pub fn into_sync_outcome(self) -> SyncOutcome {
        match self {
            EffectResponse::SyncOutcome(o) => o,
            other => unreachable!("expected EffectResponse::SyncOutcome, got {other:?}"),
        }
    }

    pub fn into_vlob_ids(self) -> Vec<VlobId> {
        match self {
            EffectResponse::VlobIds(ids) => ids,
            other => unreachable!("expected EffectResponse::VlobIds, got {other:?}"),
        }
    }
}

/// Runs one `EffectRequest` against `sync`. The sole chokepoint between the
/// `File` engine and storage -- a test can wrap this function to count
/// calls or fail a specific request, the Rust analogue of intercepting an
/// `effect2` handler.
pub fn dispatch<B: BlockStore, V: VlobStore>(
    sync: &mut Synchronizer<B, V>,
    request: EffectRequest,
) -> CResult<EffectResponse> {
    use EffectRequest::*;

    Ok(match request {
        BlockCreate(content) => EffectResponse::BlockId(sync.block_create(content)?),
        BlockRead(id) => EffectResponse::Block(sync.block_read(&id)?),
        BlockDelete(id) => {
            sync.block_delete(&id)?;
            EffectResponse::Unit
        }
        BlockSynchronize(id) => {
            sync.commit_block(&id)?;
            EffectResponse::Unit
        }
        VlobCreate(blob) => EffectResponse::VlobHandle(sync.vlob_create(blob)?),
        VlobRead(id, read_trust_seed, version) => {
            EffectResponse::Vlob(sync.vlob_read(&id, &read_trust_seed, version)?)
        }
        VlobUpdate(id, write_trust_seed, version, blob) => {
            sync.vlob_update(&id, &write_trust_seed, version, blob)?;
            EffectResponse::Unit
        }
        VlobDelete(id) => {
            sync.vlob_delete(&id)?;
            EffectResponse::Unit
        }
        VlobSynchronize(id) => EffectResponse::SyncOutcome(sync.commit_vlob(&id)?),
        VlobList => EffectResponse::VlobIds(sync.dirty_vlob_ids()),
    })
}
