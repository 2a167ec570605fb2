use std::collections::{HashMap, HashSet};

use crate::block::{BlockId, BlockStore};
use crate::error::{CResult, Error};

/// In-memory `BlockStore`, the default/testable backend for this crate. A
/// real network transport is an external collaborator (spec.md §1); this
/// type plays the role `storage::memory::Memory` plays for `Engine` in the
/// teacher repo.
#[derive(Default)]
pub struct InMemoryBlockStore {
    blocks: HashMap<BlockId, Vec<u8>>,
    dirty: HashSet<BlockId>,
    next_id: u64,
}

impl InMemoryBlockStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BlockStore for InMemoryBlockStore {
    fn create(&mut self, content: Vec<u8>) -> CResult<BlockId> {
        self.next_id += 1;
        let id = format!("block-{}", self.next_id);
        self.blocks.insert(id.clone(), content);
        self.dirty.insert(id.clone());
        Ok(id)
    }

    fn read(&mut self, id: &BlockId) -> CResult<Vec<u8>> {
        self.blocks.get(id).cloned().ok_or_else(|| Error::BlockNotFound(id.clone()))
    }

    fn delete(&mut self, id: &BlockId) -> CResult<()> {
        if self.blocks.remove(id).is_none() {
            return Err(Error::BlockNotFound(id.clone()));
        }
        self.dirty.remove(id);
        Ok(())
    }

    fn synchronize(&mut self, id: &BlockId) -> CResult<()> {
        self.dirty.remove(id);
        Ok(())
    }

    fn list(&self) -> Vec<BlockId> {
        self.dirty.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::tests::test_block_store;

    test_block_store!(InMemoryBlockStore::new());
}
