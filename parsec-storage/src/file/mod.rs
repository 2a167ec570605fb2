//! The `File` engine (spec.md §4.4/§4.4bis): an in-memory handle over one
//! vlob's block-group history, queuing `write`/`truncate` calls and only
//! touching storage on `read`/`flush`/`commit`. Grounded line-for-line on
//! `File`/`ContentBuilder` in
//! `examples/original_source/parsec/core/file.py`.

pub mod blob;
pub mod content_builder;
pub mod matching;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};

use crate::block::{BlockId, BlockStore};
use crate::config::SynchronizerConfig;
use crate::crypto::{digest_hex, SymKey};
use crate::effects::{dispatch, EffectRequest};
use crate::encoding::canonical_json::{from_canonical_bytes, to_canonical_bytes};
use crate::encoding::{Base64Codec, DataCodec};
use crate::error::{CResult, Error};
use crate::sync::Synchronizer;
use crate::vlob::{SyncOutcome, TrustSeed, VlobId, VlobStore};

use self::blob::{Blob, BlockGroup, BlockMeta};
use self::content_builder::ContentBuilder;
use self::matching::{push_or_merge, BlockRun, MatchingBlocks};

/// Converts copied-over block runs into `BlockGroup`s, dropping any
/// zero-length block (e.g. the single empty block `build_file_blocks`
/// stamps on `File::create`) and the run entirely if that empties it, so a
/// since-superseded empty block never lingers in a freshly-written blob.
fn block_groups_from_runs(runs: Vec<BlockRun>) -> Vec<BlockGroup> {
    runs.into_iter()
        .filter_map(|run| {
            let blocks: Vec<BlockMeta> = run.blocks.into_iter().filter(|b| b.size > 0).collect();
            if blocks.is_empty() {
                None
            } else {
                Some(BlockGroup { key: run.key, blocks })
            }
        })
        .collect()
}

/// A locally-queued mutation, applied only once `flush`/`commit` runs.
#[derive(Debug, Clone)]
enum PendingOp {
    Write { data: Vec<u8>, offset: u64 },
    Truncate { length: u64 },
}

/// Enough to reopen a file elsewhere (spec.md §4.4bis `get_vlob`).
#[derive(Debug, Clone, PartialEq)]
pub struct VlobDescriptor {
    pub id: VlobId,
    pub read_trust_seed: TrustSeed,
    pub write_trust_seed: TrustSeed,
    pub key: String,
}

/// Result of `stat` (spec.md §4.4bis).
#[derive(Debug, Clone, PartialEq)]
pub struct FileStat {
    pub id: VlobId,
    pub size: u64,
    pub version: u64,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

fn encode_key(key: &SymKey) -> CResult<String> {
    Base64Codec::new().encode(key.as_bytes()).map_err(Error::from)
}

fn decode_key(encoded: &str) -> CResult<Vec<u8>> {
    Base64Codec::new().decode(encoded).map_err(Error::from)
}

pub struct File {
    pub id: VlobId,
    pub read_trust_seed: TrustSeed,
    pub write_trust_seed: TrustSeed,
    encryptor: SymKey,
    version: u64,
    dirty: bool,
    chunk_size: usize,
    modifications: Vec<PendingOp>,
    created: DateTime<Utc>,
    updated: DateTime<Utc>,
}

impl File {
    /// `version + 1` while a local modification is pending but not yet
    /// committed, else the last committed version -- used throughout
    /// `read`/`stat`/`restore`/`reencrypt`/`find_matching_blocks` to target
    /// the right vlob revision.
    fn get_version(&self) -> u64 {
        if self.dirty {
            self.version + 1
        } else {
            self.version
        }
    }

    pub fn version(&self) -> u64 {
        self.get_version()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn get_vlob(&self) -> CResult<VlobDescriptor> {
        Ok(VlobDescriptor {
            id: self.id.clone(),
            read_trust_seed: self.read_trust_seed.clone(),
            write_trust_seed: self.write_trust_seed.clone(),
            key: encode_key(&self.encryptor)?,
        })
    }

    /// Creates a brand new, empty file and registers it.
    pub fn create<B: BlockStore, V: VlobStore>(
        registry: &FileRegistry,
        sync: &mut Synchronizer<B, V>,
        config: &SynchronizerConfig,
    ) -> CResult<Arc<Mutex<File>>> {
        let now = Utc::now();
        let mut file = File {
            id: String::new(),
            read_trust_seed: String::new(),
            write_trust_seed: String::new(),
            encryptor: SymKey::generate(),
            version: 0,
            dirty: true,
            chunk_size: config.chunk_size,
            modifications: Vec::new(),
            created: now,
            updated: now,
        };
        let group = file.build_file_blocks(sync, b"")?;
        let blob: Blob = vec![group];
        let plaintext = to_canonical_bytes(&blob)?;
        let encrypted_blob = file.encryptor.encrypt(&plaintext)?;
        let handle = dispatch(sync, EffectRequest::VlobCreate(encrypted_blob))?.into_vlob_handle();
        file.id = handle.id;
        file.read_trust_seed = handle.read_trust_seed;
        file.write_trust_seed = handle.write_trust_seed;
        Ok(registry.insert(file))
    }

    /// Reopens an existing file, or returns the already-registered handle
    /// if another caller opened it first (spec.md §9 process-wide
    /// singleton).
    #[allow(clippy::too_many_arguments)]
    pub fn load<B: BlockStore, V: VlobStore>(
        registry: &FileRegistry,
        sync: &mut Synchronizer<B, V>,
        config: &SynchronizerConfig,
        id: VlobId,
        key: &[u8],
        read_trust_seed: TrustSeed,
        write_trust_seed: TrustSeed,
        version: Option<u64>,
    ) -> CResult<Arc<Mutex<File>>> {
        if let Some(existing) = registry.get(&id) {
            return Ok(existing);
        }
        let encryptor = SymKey::load(key)?;
        let vlob = dispatch(sync, EffectRequest::VlobRead(id.clone(), read_trust_seed.clone(), version))?.into_vlob();
        let mut file_version = vlob.version;
        let mut dirty = false;
        let dirty_vlob_ids = dispatch(sync, EffectRequest::VlobList)?.into_vlob_ids();
        if dirty_vlob_ids.contains(&vlob.id) {
            dirty = true;
            file_version -= 1;
        }
        // Neither `VlobStore::read` nor `VlobStore::list` reports when a
        // vlob's first version was durably created (spec.md leaves backend
        // history out of scope); a real backend would return it alongside
        // the blob and this would thread it through instead of
        // approximating with the load-time timestamp (see DESIGN.md).
        let now = Utc::now();
        let file = File {
            id,
            read_trust_seed,
            write_trust_seed,
            encryptor,
            version: file_version,
            dirty,
            chunk_size: config.chunk_size,
            modifications: Vec::new(),
            created: now,
            updated: now,
        };
        Ok(registry.insert(file))
    }

    /// Every block id the current version references, in file order.
    pub fn get_blocks<B: BlockStore, V: VlobStore>(&mut self, sync: &mut Synchronizer<B, V>) -> CResult<Vec<BlockId>> {
        let matching = self.find_matching_blocks(sync, None, 0)?;
        let mut ids = Vec::new();
        for run in matching.pre_excluded_blocks.into_iter().chain(matching.included_blocks) {
            for b in run.blocks {
                ids.push(b.block);
            }
        }
        Ok(ids)
    }

    pub fn read<B: BlockStore, V: VlobStore>(
        &mut self,
        sync: &mut Synchronizer<B, V>,
        size: Option<usize>,
        offset: u64,
    ) -> CResult<Vec<u8>> {
        self.flush(sync)?;
        let matching = self.find_matching_blocks(sync, size, offset)?;
        let mut data = matching.pre_included_data;
        for run in matching.included_blocks {
            let key_bytes = decode_key(&run.key)?;
            let encryptor = SymKey::load(&key_bytes)?;
            for block in run.blocks {
                let ciphertext = dispatch(sync, EffectRequest::BlockRead(block.block.clone()))?.into_block();
                let chunk = encryptor.decrypt(&ciphertext)?;
                if digest_hex(&chunk) != block.digest {
                    return Err(Error::Integrity(format!("block {} failed its digest check", block.block)));
                }
                if chunk.len() != block.size {
                    return Err(Error::Integrity(format!("block {} size mismatch", block.block)));
                }
                data.extend_from_slice(&chunk);
            }
        }
        data.extend_from_slice(&matching.post_included_data);
        Ok(data)
    }

    pub fn write(&mut self, data: Vec<u8>, offset: u64) {
        self.modifications.push(PendingOp::Write { data, offset });
    }

    pub fn truncate(&mut self, length: u64) {
        self.modifications.push(PendingOp::Truncate { length });
    }

    pub fn stat<B: BlockStore, V: VlobStore>(&mut self, sync: &mut Synchronizer<B, V>) -> CResult<FileStat> {
        let version = self.get_version();
        let vlob = dispatch(sync, EffectRequest::VlobRead(self.id.clone(), self.read_trust_seed.clone(), Some(version)))?
            .into_vlob();
        let blob: Blob = from_canonical_bytes(&self.encryptor.decrypt(&vlob.blob)?)?;
        let mut size: u64 = blob.iter().flat_map(|g| g.blocks.iter()).map(|b| b.size as u64).sum();
        for modification in &self.modifications {
            match modification {
                PendingOp::Write { data, offset } => {
                    let end = offset + data.len() as u64;
                    if size < end {
                        size = end;
                    }
                }
                PendingOp::Truncate { length } => {
                    if size > *length {
                        size = *length;
                    }
                }
            }
        }
        Ok(FileStat { id: self.id.clone(), size, version: vlob.version, created: self.created, updated: self.updated })
    }

    /// Flushes any queued modifications and rolls the file back to an
    /// earlier committed version by staging its blob as a new pending
    /// version (not by rewinding history -- `restore` is itself a
    /// recorded edit, same as any other write). Blocks are left untouched:
    /// the target version's blocks are still referenced by the vlob history
    /// `flush`'s garbage collection already protects (see DESIGN.md).
    pub fn restore<B: BlockStore, V: VlobStore>(&mut self, sync: &mut Synchronizer<B, V>, version: Option<u64>) -> CResult<()> {
        self.flush(sync)?;
        let current = self.get_version();
        let target = match version {
            Some(v) => v,
            None => current.saturating_sub(1),
        };
        if target < 1 || target >= current {
            return Err(Error::BadVersion(format!("{} is not a valid version to restore (current is {})", target, current)));
        }
        let vlob = dispatch(sync, EffectRequest::VlobRead(self.id.clone(), self.read_trust_seed.clone(), Some(target)))?
            .into_vlob();
        dispatch(
            sync,
            EffectRequest::VlobUpdate(self.id.clone(), self.write_trust_seed.clone(), self.version + 1, vlob.blob),
        )?;
        self.dirty = true;
        self.updated = Utc::now();
        Ok(())
    }

    /// Replaces the vlob's key by decrypting under the old one and
    /// re-encrypting (and recreating) under a fresh one. The old vlob is
    /// left behind for the backend to garbage-collect (see DESIGN.md).
    pub fn reencrypt<B: BlockStore, V: VlobStore>(&mut self, sync: &mut Synchronizer<B, V>, registry: &FileRegistry) -> CResult<()> {
        self.flush(sync)?;
        let version = self.get_version();
        let old_vlob = dispatch(sync, EffectRequest::VlobRead(self.id.clone(), self.read_trust_seed.clone(), Some(version)))?
            .into_vlob();
        let cleartext = self.encryptor.decrypt(&old_vlob.blob)?;
        self.encryptor = SymKey::generate();
        let new_encrypted_blob = self.encryptor.encrypt(&cleartext)?;
        let handle = dispatch(sync, EffectRequest::VlobCreate(new_encrypted_blob))?.into_vlob_handle();
        let old_id = self.id.clone();
        self.id = handle.id;
        self.read_trust_seed = handle.read_trust_seed;
        self.write_trust_seed = handle.write_trust_seed;
        registry.rekey(&old_id, self.id.clone());
        self.dirty = true;
        Ok(())
    }

    fn write_blob<B: BlockStore, V: VlobStore>(&mut self, sync: &mut Synchronizer<B, V>, blob: &Blob) -> CResult<()> {
        let plaintext = to_canonical_bytes(blob)?;
        let encrypted_blob = self.encryptor.encrypt(&plaintext)?;
        dispatch(
            sync,
            EffectRequest::VlobUpdate(self.id.clone(), self.write_trust_seed.clone(), self.version + 1, encrypted_blob),
        )?;
        self.dirty = true;
        Ok(())
    }

    /// Merges every queued write/truncate into the minimal set of new block
    /// groups, pushes the new vlob version(s), and garbage-collects blocks
    /// orphaned purely by this round of local edits.
    ///
    /// Once a version has been committed it stays the permanent historical
    /// record `restore` reads back, so its blocks must survive even after a
    /// later edit stops referencing them; only blocks that were themselves
    /// introduced by a not-yet-committed draft (i.e. `self.dirty` was
    /// already set when this flush began) are ever eligible for collection.
    pub fn flush<B: BlockStore, V: VlobStore>(&mut self, sync: &mut Synchronizer<B, V>) -> CResult<()> {
        if self.modifications.is_empty() {
            return Ok(());
        }
        self.updated = Utc::now();
        let gc_eligible = self.dirty;

        let mut builder = ContentBuilder::new();
        let mut shortest_truncate: Option<u64> = None;
        for modification in std::mem::take(&mut self.modifications) {
            match modification {
                PendingOp::Write { data, offset } => builder.write(&data, offset),
                PendingOp::Truncate { length } => {
                    builder.truncate(length);
                    shortest_truncate = Some(shortest_truncate.map_or(length, |s| s.min(length)));
                }
            }
        }

        let previous_block_ids = if gc_eligible { self.get_blocks(sync)? } else { Vec::new() };

        if let Some(length) = shortest_truncate {
            let matching = self.find_matching_blocks(sync, Some(length as usize), 0)?;
            let mut blob: Blob = block_groups_from_runs(matching.included_blocks);
            let new_group = self.build_file_blocks(sync, &matching.post_included_data)?;
            blob.push(new_group);
            self.write_blob(sync, &blob)?;
        }

        for (offset, content) in builder.contents() {
            let matching = self.find_matching_blocks(sync, Some(content.len()), *offset)?;
            let mut new_data = matching.pre_excluded_data;
            new_data.extend_from_slice(content);
            new_data.extend_from_slice(&matching.post_excluded_data);

            let mut blob: Blob = block_groups_from_runs(matching.pre_excluded_blocks);
            let new_group = self.build_file_blocks(sync, &new_data)?;
            blob.push(new_group);
            blob.extend(block_groups_from_runs(matching.post_excluded_blocks));
            self.write_blob(sync, &blob)?;
        }

        if gc_eligible {
            let current_block_ids = self.get_blocks(sync)?;
            for block_id in previous_block_ids {
                if !current_block_ids.contains(&block_id) {
                    log::debug!("garbage-collecting orphaned block {}", block_id);
                    if let Err(e) = dispatch(sync, EffectRequest::BlockDelete(block_id)) {
                        if !e.is_not_found() {
                            return Err(e);
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Pushes every locally-flushed block and vlob version to the backend.
    /// Returns the file's new identity if the backend rotated it (e.g. a
    /// reencrypt racing a concurrent commit), `None` otherwise.
    pub fn commit<B: BlockStore, V: VlobStore>(
        &mut self,
        sync: &mut Synchronizer<B, V>,
        registry: &FileRegistry,
    ) -> CResult<Option<VlobDescriptor>> {
        self.flush(sync)?;
        let block_ids = self.get_blocks(sync)?;
        for block_id in block_ids {
            dispatch(sync, EffectRequest::BlockSynchronize(block_id))?;
        }
        let outcome = dispatch(sync, EffectRequest::VlobSynchronize(self.id.clone()))?.into_sync_outcome();
        let result = match outcome {
            SyncOutcome::Nothing => None,
            SyncOutcome::Same => {
                self.version += 1;
                None
            }
            SyncOutcome::Rotated(handle) => {
                let old_id = self.id.clone();
                self.id = handle.id;
                self.read_trust_seed = handle.read_trust_seed;
                self.write_trust_seed = handle.write_trust_seed;
                registry.rekey(&old_id, self.id.clone());
                self.version += 1;
                log::info!("vlob {} rotated to {} on commit", old_id, self.id);
                Some(self.get_vlob()?)
            }
        };
        self.dirty = false;
        log::debug!("committed {} at version {}", self.id, self.version);
        Ok(result)
    }

    /// Drops every pending modification and deletes the file outright.
    /// Returns `false` if either the blocks or the vlob were already gone
    /// (i.e. a previous `discard`/`commit` already cleaned up).
    pub fn discard<B: BlockStore, V: VlobStore>(&mut self, sync: &mut Synchronizer<B, V>) -> CResult<bool> {
        let mut already_synchronized = false;
        self.modifications.clear();
        let block_ids = self.get_blocks(sync)?;
        for block_id in block_ids {
            match dispatch(sync, EffectRequest::BlockDelete(block_id)) {
                Ok(_) => {}
                Err(e) if e.is_not_found() => already_synchronized = true,
                Err(e) => return Err(e),
            }
        }
        match dispatch(sync, EffectRequest::VlobDelete(self.id.clone())) {
            Ok(_) => {}
            Err(e) if e.is_not_found() => already_synchronized = true,
            Err(e) => return Err(e),
        }
        self.dirty = false;
        log::info!("discarded {}", self.id);
        Ok(!already_synchronized)
    }

    /// Chunks `data` into `chunk_size`-sized cleartext pieces (forcing one
    /// empty chunk for empty data, so an empty file still owns one block),
    /// encrypts each under a fresh per-group key, and stores them.
    fn build_file_blocks<B: BlockStore, V: VlobStore>(&mut self, sync: &mut Synchronizer<B, V>, data: &[u8]) -> CResult<BlockGroup> {
        let chunk_size = self.chunk_size.max(1);
        let mut chunks: Vec<&[u8]> = data.chunks(chunk_size).collect();
        if chunks.is_empty() {
            chunks.push(&[]);
        }

        let encryptor = SymKey::generate();
        let mut blocks = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            let ciphertext = encryptor.encrypt(chunk)?;
            let block_id = dispatch(sync, EffectRequest::BlockCreate(ciphertext))?.into_block_id();
            blocks.push(BlockMeta { block: block_id, digest: digest_hex(chunk), size: chunk.len() });
        }

        self.dirty = true;
        Ok(BlockGroup { key: encode_key(&encryptor)?, blocks })
    }

    /// Classifies every block of the current version against `[offset,
    /// offset + size)`, reading and decrypting only the (at most two)
    /// blocks straddling the window's edges.
    fn find_matching_blocks<B: BlockStore, V: VlobStore>(
        &mut self,
        sync: &mut Synchronizer<B, V>,
        size: Option<usize>,
        offset: u64,
    ) -> CResult<MatchingBlocks> {
        let size = size.map(|s| s as u64).unwrap_or(u64::MAX);
        let window_end = offset.saturating_add(size);

        let version = self.get_version();
        let vlob = dispatch(sync, EffectRequest::VlobRead(self.id.clone(), self.read_trust_seed.clone(), Some(version)))?
            .into_vlob();
        let blob: Blob = from_canonical_bytes(&self.encryptor.decrypt(&vlob.blob)?)?;

        let mut result = MatchingBlocks::default();
        let mut cursor: u64 = 0;

        for group in blob {
            for block_properties in group.blocks {
                let block_size = block_properties.size as u64;
                cursor += block_size;

                if cursor <= offset {
                    push_or_merge(&mut result.pre_excluded_blocks, &group.key, block_properties);
                } else if cursor - block_size < offset {
                    // left straddle: the window starts partway through this block
                    let delta = cursor - offset;
                    let block_data = self.read_and_decrypt_block(sync, &group.key, &block_properties.block)?;
                    let split = (block_data.len() as u64 - delta) as usize;
                    let (head, tail) = block_data.split_at(split);
                    result.pre_excluded_data = head.to_vec();
                    let take = (size as usize).min(tail.len());
                    result.pre_included_data = tail[..take].to_vec();
                    if (size as usize) < tail.len() {
                        result.post_excluded_data = tail[take..].to_vec();
                    }
                } else if cursor <= window_end {
                    push_or_merge(&mut result.included_blocks, &group.key, block_properties);
                } else if cursor - block_size < window_end {
                    // right straddle: the window ends partway through this block
                    let delta = (window_end - (cursor - block_size)) as usize;
                    let block_data = self.read_and_decrypt_block(sync, &group.key, &block_properties.block)?;
                    let split = delta.min(block_data.len());
                    let (head, tail) = block_data.split_at(split);
                    result.post_included_data = head.to_vec();
                    result.post_excluded_data = tail.to_vec();
                } else {
                    push_or_merge(&mut result.post_excluded_blocks, &group.key, block_properties);
                }
            }
        }

        Ok(result)
    }

    fn read_and_decrypt_block<B: BlockStore, V: VlobStore>(
        &self,
        sync: &mut Synchronizer<B, V>,
        group_key: &str,
        block_id: &BlockId,
    ) -> CResult<Vec<u8>> {
        let ciphertext = dispatch(sync, EffectRequest::BlockRead(block_id.clone()))?.into_block();
        let key_bytes = decode_key(group_key)?;
        let encryptor = SymKey::load(&key_bytes)?;
        encryptor.decrypt(&ciphertext)
    }
}

/// Process-wide table of open files, the systems-rewrite of the Python
/// `File.files` class dict (spec.md §9): `File::load` consults it before
/// re-reading from storage, and `commit`/`reencrypt` rekey it in place when
/// the backend assigns a file a new identity.
#[derive(Default)]
pub struct FileRegistry {
    files: Mutex<HashMap<VlobId, Arc<Mutex<File>>>>,
}

impl FileRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &VlobId) -> Option<Arc<Mutex<File>>> {
        self.files.lock().expect("file registry mutex poisoned").get(id).cloned()
    }

    fn insert(&self, file: File) -> Arc<Mutex<File>> {
        let id = file.id.clone();
        let handle = Arc::new(Mutex::new(file));
        self.files.lock().expect("file registry mutex poisoned").insert(id, handle.clone());
        handle
    }

    fn rekey(&self, old_id: &VlobId, new_id: VlobId) {
        let mut files = self.files.lock().expect("file registry mutex poisoned");
        if let Some(handle) = files.remove(old_id) {
            files.insert(new_id, handle);
        }
    }

    pub fn remove(&self, id: &VlobId) {
        self.files.lock().expect("file registry mutex poisoned").remove(id);
    }

    pub fn len(&self) -> usize {
        self.files.lock().expect("file registry mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
