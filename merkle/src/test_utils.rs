//! Test utilities: payloads, proof checks and a storage with injected
//! failures.

use std::cell::Cell;

use rand::{rngs::StdRng, Rng, SeedableRng};
use slotted_merkle_storage::{Error, MemoryStorage, Storage, StorageBatch, StorageContext};

use crate::{verify_proof, MerkleTree};

pub(crate) fn seeded_rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

/// 100 random bytes.
pub(crate) fn random_payload(rng: &mut StdRng) -> Vec<u8> {
    let mut payload = vec![0u8; 100];
    rng.fill(&mut payload[..]);
    payload
}

/// Fold the proof of `content` and compare it with the tree's root.
pub(crate) fn assert_proves<S: Storage>(tree: &MerkleTree<S>, content: &[u8]) {
    let root = tree.root().expect("tree should have a root");
    let slot = tree.slot_of(content).expect("content should have a slot");
    let leaf_digest = tree.leaf_digest(content).expect("leaf digest");
    let path = tree.get_proof(content).expect("proof");
    assert!(
        verify_proof(slot, &leaf_digest, &path, &root),
        "proof for slot {} does not verify against root {}",
        slot,
        hex::encode(root)
    );
}

fn injected() -> Error {
    Error::StorageError("injected failure".to_string())
}

/// In-memory storage whose reads or commits can be switched to fail.
#[derive(Default)]
pub(crate) struct FailingStorage {
    inner: MemoryStorage,
    pub fail_reads: Cell<bool>,
    pub fail_commits: Cell<bool>,
}

impl StorageContext for FailingStorage {
    fn get<K: AsRef<[u8]>>(&self, key: K) -> Result<Option<Vec<u8>>, Error> {
        if self.fail_reads.get() {
            return Err(injected());
        }
        self.inner.get(key)
    }

    fn has<K: AsRef<[u8]>>(&self, key: K) -> Result<bool, Error> {
        if self.fail_reads.get() {
            return Err(injected());
        }
        self.inner.has(key)
    }

    fn put<K: AsRef<[u8]>>(&self, key: K, value: &[u8]) -> Result<(), Error> {
        self.inner.put(key, value)
    }

    fn delete<K: AsRef<[u8]>>(&self, key: K) -> Result<(), Error> {
        self.inner.delete(key)
    }
}

impl Storage for FailingStorage {
    fn commit_batch(&self, batch: StorageBatch) -> Result<(), Error> {
        if self.fail_commits.get() {
            return Err(injected());
        }
        self.inner.commit_batch(batch)
    }

    fn flush(&self) -> Result<(), Error> {
        Ok(())
    }
}
