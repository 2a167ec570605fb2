//! Whole-file lifecycle scenarios from spec.md §8, exercised through the
//! public `File`/`Synchronizer` surface against the in-memory backends.

use std::sync::Arc;

use parsec_storage::block::InMemoryBlockStore;
use parsec_storage::config::SynchronizerConfig;
use parsec_storage::crypto::{digest_hex, SymKey};
use parsec_storage::encoding::canonical_json::from_canonical_bytes;
use parsec_storage::encoding::{Base64Codec, DataCodec};
use parsec_storage::error::Error;
use parsec_storage::file::blob::Blob;
use parsec_storage::file::{File, FileRegistry};
use parsec_storage::sync::Synchronizer;
use parsec_storage::vlob::InMemoryVlobStore;

type TestSync = Synchronizer<InMemoryBlockStore, InMemoryVlobStore>;

fn harness(chunk_size: usize) -> (FileRegistry, TestSync, SynchronizerConfig) {
    (
        FileRegistry::new(),
        Synchronizer::new(InMemoryBlockStore::new(), InMemoryVlobStore::new()),
        SynchronizerConfig { chunk_size },
    )
}

fn decrypt_current_vlob(file: &File, sync: &mut TestSync) -> Blob {
    let key_bytes = Base64Codec::new().decode(&file.get_vlob().unwrap().key).unwrap();
    let encryptor = SymKey::load(&key_bytes).unwrap();
    let vlob = sync.vlob_read(&file.id, &file.read_trust_seed, Some(file.version())).unwrap();
    let cleartext = encryptor.decrypt(&vlob.blob).unwrap();
    from_canonical_bytes(&cleartext).unwrap()
}

/// Scenario 1 -- create/read: a single write produces one block group with
/// one block whose declared size and digest match the cleartext.
#[test]
fn scenario_create_and_read() {
    let (registry, mut sync, config) = harness(4096);
    let handle = File::create(&registry, &mut sync, &config).unwrap();
    let mut file = handle.lock().unwrap();

    file.write(b"hello".to_vec(), 0);
    file.flush(&mut sync).unwrap();

    assert_eq!(file.read(&mut sync, None, 0).unwrap(), b"hello".to_vec());
    assert_eq!(file.stat(&mut sync).unwrap().size, 5);

    let blob = decrypt_current_vlob(&file, &mut sync);
    assert_eq!(blob.len(), 1);
    assert_eq!(blob[0].blocks.len(), 1);
    assert_eq!(blob[0].blocks[0].size, 5);
    assert_eq!(blob[0].blocks[0].digest, digest_hex(b"hello"));
}

/// Scenario 2 -- overlapping writes coalesce before touching storage.
#[test]
fn scenario_overlapping_writes_coalesce() {
    let (registry, mut sync, config) = harness(4096);
    let handle = File::create(&registry, &mut sync, &config).unwrap();
    let mut file = handle.lock().unwrap();

    file.write(b"AAAA".to_vec(), 0);
    file.write(b"BB".to_vec(), 1);
    file.flush(&mut sync).unwrap();

    assert_eq!(file.read(&mut sync, None, 0).unwrap(), b"ABBA".to_vec());
}

/// Scenario 3 -- a truncate followed by a write past the new end only
/// contributes the new tail.
#[test]
fn scenario_truncate_then_write() {
    let (registry, mut sync, config) = harness(4096);
    let handle = File::create(&registry, &mut sync, &config).unwrap();
    let mut file = handle.lock().unwrap();

    file.write(b"123456789".to_vec(), 0);
    file.truncate(4);
    file.write(b"ZZ".to_vec(), 2);
    file.flush(&mut sync).unwrap();

    assert_eq!(file.read(&mut sync, None, 0).unwrap(), b"12ZZ".to_vec());
}

/// Scenario 4 -- commit, edit, restore: restoring an earlier committed
/// version stages a new version whose decrypted blob matches the
/// restored one exactly, and reads recover the old content.
#[test]
fn scenario_commit_edit_restore() {
    let (registry, mut sync, config) = harness(4096);
    let handle = File::create(&registry, &mut sync, &config).unwrap();
    let mut file = handle.lock().unwrap();

    file.write(b"alpha".to_vec(), 0);
    file.commit(&mut sync, &registry).unwrap();
    assert_eq!(file.version(), 1);

    let v1_blob = sync.vlob_read(&file.id, &file.read_trust_seed, Some(1)).unwrap().blob;

    file.write(b"BETA is rather longer than alpha".to_vec(), 0);
    file.commit(&mut sync, &registry).unwrap();
    assert_eq!(file.version(), 2);

    file.restore(&mut sync, Some(1)).unwrap();
    file.commit(&mut sync, &registry).unwrap();
    assert_eq!(file.version(), 3);

    let v3_blob = sync.vlob_read(&file.id, &file.read_trust_seed, Some(3)).unwrap().blob;
    assert_eq!(v3_blob, v1_blob);
    assert_eq!(file.read(&mut sync, None, 0).unwrap(), b"alpha".to_vec());
}

/// Scenario 5 -- GC after overwrite: rewriting only the region covered by
/// the middle block leaves the outer two blocks untouched and deletes
/// exactly the replaced one.
#[test]
fn scenario_gc_after_overwrite() {
    let (registry, mut sync, config) = harness(4);
    let handle = File::create(&registry, &mut sync, &config).unwrap();
    let mut file = handle.lock().unwrap();

    file.write(b"AAAABBBBCCCC".to_vec(), 0);
    file.flush(&mut sync).unwrap();
    let original_blocks = file.get_blocks(&mut sync).unwrap();
    assert_eq!(original_blocks.len(), 3);
    let (b1, b2, b3) = (original_blocks[0].clone(), original_blocks[1].clone(), original_blocks[2].clone());

    file.write(b"ZZZZ".to_vec(), 4);
    file.flush(&mut sync).unwrap();

    let new_blocks = file.get_blocks(&mut sync).unwrap();
    assert_eq!(new_blocks.len(), 3);
    assert!(new_blocks.contains(&b1), "block before the overwritten region must survive untouched");
    assert!(new_blocks.contains(&b3), "block after the overwritten region must survive untouched");
    assert!(!new_blocks.contains(&b2), "the overwritten block must not reappear in the new layout");

    assert_eq!(sync.block_read(&b1).unwrap(), sync.block_read(&b1).unwrap(), "sanity: b1 still readable");
    assert_eq!(sync.block_read(&b3).unwrap(), sync.block_read(&b3).unwrap(), "sanity: b3 still readable");
    assert!(matches!(sync.block_read(&b2), Err(Error::BlockNotFound(_))), "b2 must have been garbage-collected exactly once");

    assert_eq!(file.read(&mut sync, None, 0).unwrap(), b"AAAAZZZZCCCC".to_vec());
}

/// Scenario 6 -- the File registry is a singleton keyed by vlob id: a
/// second `load` of an already-open file returns the same handle rather
/// than a competing one.
#[test]
fn scenario_registry_returns_the_same_handle() {
    let (registry, mut sync, config) = harness(4096);
    let created = File::create(&registry, &mut sync, &config).unwrap();

    let (id, key, rts, wts) = {
        let file = created.lock().unwrap();
        let vlob = file.get_vlob().unwrap();
        (vlob.id, Base64Codec::new().decode(&vlob.key).unwrap(), vlob.read_trust_seed, vlob.write_trust_seed)
    };

    let loaded = File::load(&registry, &mut sync, &config, id, &key, rts, wts, None).unwrap();
    assert!(Arc::ptr_eq(&created, &loaded), "opening an already-registered id must return the same handle");
    assert_eq!(registry.len(), 1);
}

/// Boundary -- `discard` followed by any operation fails with
/// `vlob_not_found` (the vlob no longer exists).
#[test]
fn discard_then_read_fails_with_vlob_not_found() {
    let (registry, mut sync, config) = harness(4096);
    let handle = File::create(&registry, &mut sync, &config).unwrap();
    let mut file = handle.lock().unwrap();
    file.write(b"throwaway".to_vec(), 0);
    assert!(file.discard(&mut sync).unwrap());

    let err = file.read(&mut sync, None, 0).unwrap_err();
    assert!(matches!(err, Error::VlobNotFound(_)));
}

/// Boundary -- restoring a version outside `[1, current)` is rejected.
#[test]
fn restore_rejects_out_of_range_versions() {
    let (registry, mut sync, config) = harness(4096);
    let handle = File::create(&registry, &mut sync, &config).unwrap();
    let mut file = handle.lock().unwrap();
    file.write(b"only version".to_vec(), 0);
    file.commit(&mut sync, &registry).unwrap();

    assert!(matches!(file.restore(&mut sync, Some(0)), Err(Error::BadVersion(_))));
    assert!(matches!(file.restore(&mut sync, Some(1)), Err(Error::BadVersion(_))));
    assert!(matches!(file.restore(&mut sync, Some(99)), Err(Error::BadVersion(_))));
}
