//! In-memory storage backend.

use std::{cell::RefCell, collections::BTreeMap};

use crate::{BatchOperation, Error, Storage, StorageBatch, StorageContext};

/// In-memory storage backed by a `BTreeMap`.
///
/// Useful for tests and ephemeral trees. Never fails.
#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    data: RefCell<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryStorage {
    /// Create an empty storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.data.borrow().len()
    }

    /// Returns `true` if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.data.borrow().is_empty()
    }
}

impl StorageContext for MemoryStorage {
    fn get<K: AsRef<[u8]>>(&self, key: K) -> Result<Option<Vec<u8>>, Error> {
        Ok(self.data.borrow().get(key.as_ref()).cloned())
    }

    fn has<K: AsRef<[u8]>>(&self, key: K) -> Result<bool, Error> {
        Ok(self.data.borrow().contains_key(key.as_ref()))
    }

    fn put<K: AsRef<[u8]>>(&self, key: K, value: &[u8]) -> Result<(), Error> {
        self.data
            .borrow_mut()
            .insert(key.as_ref().to_vec(), value.to_vec());
        Ok(())
    }

    fn delete<K: AsRef<[u8]>>(&self, key: K) -> Result<(), Error> {
        self.data.borrow_mut().remove(key.as_ref());
        Ok(())
    }
}

impl Storage for MemoryStorage {
    fn commit_batch(&self, batch: StorageBatch) -> Result<(), Error> {
        let mut data = self.data.borrow_mut();
        for op in batch.into_operations() {
            match op {
                BatchOperation::Put { key, value } => {
                    data.insert(key, value);
                }
                BatchOperation::Delete { key } => {
                    data.remove(&key);
                }
            }
        }
        Ok(())
    }

    fn flush(&self) -> Result<(), Error> {
        Ok(())
    }
}
