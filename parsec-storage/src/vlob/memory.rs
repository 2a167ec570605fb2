use std::collections::HashMap;

use rand::Rng;

use crate::error::{CResult, Error};
use crate::vlob::{SyncOutcome, TrustSeed, VlobHandle, VlobId, VlobRead, VlobStore};

/// `durable` holds every version the backend has actually accepted
/// (`synchronize`d); `pending` holds at most one not-yet-synchronized
/// version sitting on top of it. `create`/`update` only ever touch
/// `pending` -- this is what lets `File::flush` call `update` several
/// times in a row at the same version number and have each call replace
/// the previous local draft instead of conflicting with it (spec.md §4.4
/// "flush reuses version+1 for every sub-update").
struct VlobRecord {
    read_trust_seed: TrustSeed,
    write_trust_seed: TrustSeed,
    durable: Vec<Vec<u8>>,
    pending: Option<Vec<u8>>,
}

impl VlobRecord {
    fn total_versions(&self) -> u64 {
        self.durable.len() as u64 + if self.pending.is_some() { 1 } else { 0 }
    }

    fn version_at(&self, version: u64) -> Option<&Vec<u8>> {
        if version == 0 {
            return None;
        }
        let durable_len = self.durable.len() as u64;
        if version <= durable_len {
            self.durable.get((version - 1) as usize)
        } else if version == durable_len + 1 {
            self.pending.as_ref()
        } else {
            None
        }
    }
}

fn random_token(prefix: &str) -> String {
    let suffix: u64 = rand::thread_rng().gen();
    format!("{}-{:x}", prefix, suffix)
}

/// In-memory `VlobStore`, the default/testable backend for this crate.
#[derive(Default)]
pub struct InMemoryVlobStore {
    vlobs: HashMap<VlobId, VlobRecord>,
}

impl InMemoryVlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl VlobStore for InMemoryVlobStore {
    fn create(&mut self, blob: Vec<u8>) -> CResult<VlobHandle> {
        let id = random_token("vlob");
        let read_trust_seed = random_token("rts");
        let write_trust_seed = random_token("wts");
        self.vlobs.insert(
            id.clone(),
            VlobRecord {
                read_trust_seed: read_trust_seed.clone(),
                write_trust_seed: write_trust_seed.clone(),
                durable: Vec::new(),
                pending: Some(blob),
            },
        );
        Ok(VlobHandle { id, read_trust_seed, write_trust_seed })
    }

    fn read(&mut self, id: &VlobId, read_trust_seed: &TrustSeed, version: Option<u64>) -> CResult<VlobRead> {
        let record = self.vlobs.get(id).ok_or_else(|| Error::VlobNotFound(id.clone()))?;
        if &record.read_trust_seed != read_trust_seed {
            return Err(Error::TrustSeedError(format!("bad read trust seed for {}", id)));
        }
        let total = record.total_versions();
        let version = match version {
            Some(v) => v.min(total),
            None => total,
        };
        let blob = record.version_at(version).ok_or_else(|| Error::VlobNotFound(id.clone()))?.clone();
        Ok(VlobRead { id: id.clone(), blob, version })
    }

    fn update(&mut self, id: &VlobId, write_trust_seed: &TrustSeed, version: u64, blob: Vec<u8>) -> CResult<()> {
        let record = self.vlobs.get_mut(id).ok_or_else(|| Error::VlobNotFound(id.clone()))?;
        if &record.write_trust_seed != write_trust_seed {
            return Err(Error::TrustSeedError(format!("bad write trust seed for {}", id)));
        }
        let expected = record.durable.len() as u64 + 1;
        if version != expected {
            return Err(Error::VersionConflict { expected, got: version });
        }
        record.pending = Some(blob);
        Ok(())
    }

    fn delete(&mut self, id: &VlobId) -> CResult<()> {
        if self.vlobs.remove(id).is_none() {
            return Err(Error::VlobNotFound(id.clone()));
        }
        Ok(())
    }

    fn synchronize(&mut self, id: &VlobId) -> CResult<SyncOutcome> {
        let record = self.vlobs.get_mut(id).ok_or_else(|| Error::VlobNotFound(id.clone()))?;
        match record.pending.take() {
            Some(blob) => {
                record.durable.push(blob);
                Ok(SyncOutcome::Same)
            }
            None => Ok(SyncOutcome::Nothing),
        }
    }

    fn list(&self) -> Vec<VlobId> {
        self.vlobs.iter().filter(|(_, r)| r.pending.is_some()).map(|(id, _)| id.clone()).collect()
    }
}
