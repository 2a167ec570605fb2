//! Vlob store client (spec.md §4.3): versioned encrypted blobs with
//! trust-seed authorization.

mod memory;

pub use memory::InMemoryVlobStore;

use crate::error::CResult;

pub type VlobId = String;
pub type TrustSeed = String;

/// A freshly created vlob's identity and trust seeds, returned only at
/// creation time (spec.md §3).
#[derive(Debug, Clone, PartialEq)]
pub struct VlobHandle {
    pub id: VlobId,
    pub read_trust_seed: TrustSeed,
    pub write_trust_seed: TrustSeed,
}

/// A read result: the blob at the returned version.
#[derive(Debug, Clone, PartialEq)]
pub struct VlobRead {
    pub id: VlobId,
    pub blob: Vec<u8>,
    pub version: u64,
}

/// Either the same vlob identity was promoted (`Same`), or the server
/// substituted a fresh identity -- e.g. after a reencrypt/rotation
/// (`Rotated`) -- per spec.md §4.3 `synchronize`.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    Nothing,
    Same,
    Rotated(VlobHandle),
}

pub trait VlobStore {
    /// Creates a vlob with `blob` staged as its pending (not yet
    /// synchronized) version 1, returning server-chosen id and seeds.
    /// `read` can see this version immediately; it isn't durable until
    /// `synchronize`.
    fn create(&mut self, blob: Vec<u8>) -> CResult<VlobHandle>;

    /// Returns the requested version, or the current one (durable count
    /// plus one if a version is pending) if `version` is `None`. The
    /// largest version `<=` the requested one is returned (spec.md §3) --
    /// in practice this backend only ever creates exact versions so
    /// "largest <= requested" degenerates to an exact match.
    fn read(&mut self, id: &VlobId, read_trust_seed: &TrustSeed, version: Option<u64>) -> CResult<VlobRead>;

    /// Stages `blob` as the pending version, replacing whatever was
    /// previously staged. Fails with `Error::VersionConflict` if `version
    /// != durable_count + 1` -- i.e. every call before the next
    /// `synchronize` must keep targeting the same version number, so a
    /// caller can revise a not-yet-pushed draft by calling `update`
    /// repeatedly (spec.md §4.4 "flush reuses version+1 for every
    /// sub-update"). Fails with `Error::VlobNotFound` if `id` is unknown,
    /// `Error::TrustSeedError` on seed mismatch.
    fn update(&mut self, id: &VlobId, write_trust_seed: &TrustSeed, version: u64, blob: Vec<u8>) -> CResult<()>;

    /// Removes all versions. Fails with `Error::VlobNotFound` if unknown.
    fn delete(&mut self, id: &VlobId) -> CResult<()>;

    /// Promotes the pending version to durable. No-op (`SyncOutcome::
    /// Nothing`) if nothing is pending.
    fn synchronize(&mut self, id: &VlobId) -> CResult<SyncOutcome>;

    /// Ids with a not-yet-synchronized pending version.
    fn list(&self) -> Vec<VlobId>;
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    macro_rules! test_vlob_store {
        ($setup:expr) => {
            #[test]
            fn create_then_read_returns_version_one() {
                let mut s = $setup;
                let handle = s.create(b"blob-v1".to_vec()).unwrap();
                let read = s.read(&handle.id, &handle.read_trust_seed, None).unwrap();
                assert_eq!(read.version, 1);
                assert_eq!(read.blob, b"blob-v1".to_vec());
            }

            #[test]
            fn update_before_synchronize_must_target_the_still_pending_version() {
                let mut s = $setup;
                let handle = s.create(b"v1".to_vec()).unwrap();
                let err = s
                    .update(&handle.id, &handle.write_trust_seed, 5, b"v5".to_vec())
                    .unwrap_err();
                assert!(matches!(err, crate::error::Error::VersionConflict { expected: 1, got: 5 }));
                s.update(&handle.id, &handle.write_trust_seed, 1, b"v1-edited".to_vec()).unwrap();
                let read = s.read(&handle.id, &handle.read_trust_seed, None).unwrap();
                assert_eq!(read.version, 1);
                assert_eq!(read.blob, b"v1-edited".to_vec());
            }

            #[test]
            fn read_of_historical_version() {
                let mut s = $setup;
                let handle = s.create(b"v1".to_vec()).unwrap();
                s.synchronize(&handle.id).unwrap();
                s.update(&handle.id, &handle.write_trust_seed, 2, b"v2".to_vec()).unwrap();
                s.synchronize(&handle.id).unwrap();
                let read = s.read(&handle.id, &handle.read_trust_seed, Some(1)).unwrap();
                assert_eq!(read.blob, b"v1".to_vec());
            }

            #[test]
            fn delete_then_read_is_not_found() {
                let mut s = $setup;
                let handle = s.create(b"v1".to_vec()).unwrap();
                s.delete(&handle.id).unwrap();
                assert!(matches!(
                    s.read(&handle.id, &handle.read_trust_seed, None),
                    Err(crate::error::Error::VlobNotFound(_))
                ));
            }

            #[test]
            fn wrong_write_seed_is_rejected() {
                let mut s = $setup;
                let handle = s.create(b"v1".to_vec()).unwrap();
                let err = s
                    .update(&handle.id, &"wrong-seed".to_string(), 2, b"v2".to_vec())
                    .unwrap_err();
                assert!(matches!(err, crate::error::Error::TrustSeedError(_)));
            }
        };
    }

    pub(crate) use test_vlob_store;
}
