//! Per-file cooperative executor (spec.md §5).
//!
//! The `File` engine itself is synchronous -- every method takes the
//! `Synchronizer` it needs as a plain `&mut` parameter -- so nothing stops
//! two callers from racing a `flush` against a fresh `write` on the same
//! handle. `FileExecutor` is the "single-entry mailbox per file" spec.md
//! recommends: it pairs one `File` handle with the `Synchronizer` it
//! shares with its sibling files behind a `tokio::sync::Mutex`, so
//! `flush`/`commit`/`restore`/`reencrypt`/`discard` run as critical
//! sections and observe a total order equal to their submission order.
//! Built on `tokio`, already in the teacher's dependency stack, rather
//! than a bespoke scheduler.

use std::sync::{Arc, Mutex as SyncMutex};

use tokio::sync::Mutex as AsyncMutex;

use crate::block::BlockStore;
use crate::error::CResult;
use crate::file::{File, FileRegistry, FileStat, VlobDescriptor};
use crate::sync::Synchronizer;
use crate::vlob::VlobStore;

/// Serializes every operation against one `File` and the `Synchronizer`
/// backing it. `write`/`truncate` only ever touch the in-memory
/// modification queue, so they stay synchronous; everything that reaches
/// storage is awaited through the shared async mutex.
pub struct FileExecutor<B: BlockStore, V: VlobStore> {
    file: Arc<SyncMutex<File>>,
    sync: Arc<AsyncMutex<Synchronizer<B, V>>>,
}

impl<B: BlockStore, V: VlobStore> FileExecutor<B, V> {
    pub fn new(file: Arc<SyncMutex<File>>, sync: Arc<AsyncMutex<Synchronizer<B, V>>>) -> Self {
        Self { file, sync }
    }

    fn lock_file(&self) -> std::sync::MutexGuard<'_, File> {
        self.file.lock().expect("file mutex poisoned")
    }

    pub fn write(&self, data: Vec<u8>, offset: u64) {
        self.lock_file().write(data, offset);
    }

    pub fn truncate(&self, length: u64) {
        self.lock_file().truncate(length);
    }

    pub async fn read(&self, size: Option<usize>, offset: u64) -> CResult<Vec<u8>> {
        let mut sync = self.sync.lock().await;
        self.lock_file().read(&mut sync, size, offset)
    }

    pub async fn stat(&self) -> CResult<FileStat> {
        let mut sync = self.sync.lock().await;
        self.lock_file().stat(&mut sync)
    }

    pub async fn flush(&self) -> CResult<()> {
        let mut sync = self.sync.lock().await;
        self.lock_file().flush(&mut sync)
    }

    pub async fn commit(&self, registry: &FileRegistry) -> CResult<Option<VlobDescriptor>> {
        let mut sync = self.sync.lock().await;
        self.lock_file().commit(&mut sync, registry)
    }

    pub async fn restore(&self, version: Option<u64>) -> CResult<()> {
        let mut sync = self.sync.lock().await;
        self.lock_file().restore(&mut sync, version)
    }

    pub async fn reencrypt(&self, registry: &FileRegistry) -> CResult<()> {
        let mut sync = self.sync.lock().await;
        self.lock_file().reencrypt(&mut sync, registry)
    }

    pub async fn discard(&self) -> CResult<bool> {
        let mut sync = self.sync.lock().await;
        self.lock_file().discard(&mut sync)
    }
}
