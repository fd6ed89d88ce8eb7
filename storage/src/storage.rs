// MIT LICENSE
//
// Copyright (c) 2021 Dash Core Group
//
// Permission is hereby granted, free of charge, to any
// person obtaining a copy of this software and associated
// documentation files (the "Software"), to deal in the
// Software without restriction, including without
// limitation the rights to use, copy, modify, merge,
// publish, distribute, sublicense, and/or sell copies of
// the Software, and to permit persons to whom the Software
// is furnished to do so, subject to the following
// conditions:
//
// The above copyright notice and this permission notice
// shall be included in all copies or substantial portions
// of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF
// ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED
// TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A
// PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT
// SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY
// CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION
// OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR
// IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER
// DEALINGS IN THE SOFTWARE.


//! Storage traits and the deferred batch

use std::{cell::RefCell, collections::BTreeMap};

use crate::Error;

/// Key/value operations expected from a storage backend.
///
/// Uses `&self` (interior mutability) so a backend can be shared by several
/// readers while a single writer stages its changes.
pub trait StorageContext {
    /// Get entry by `key`
    fn get<K: AsRef<[u8]>>(&self, key: K) -> Result<Option<Vec<u8>>, Error>;

    /// Check whether an entry with `key` exists
    fn has<K: AsRef<[u8]>>(&self, key: K) -> Result<bool, Error> {
        Ok(self.get(key)?.is_some())
    }

    /// Put `value` with `key`, overwriting any previous value
    fn put<K: AsRef<[u8]>>(&self, key: K, value: &[u8]) -> Result<(), Error>;

    /// Delete entry with `key`; deleting a missing key is a no-op
    fn delete<K: AsRef<[u8]>>(&self, key: K) -> Result<(), Error>;
}

/// Top-level storage abstraction.
/// Holds the storage connection and applies deferred batches atomically.
pub trait Storage: StorageContext {
    /// Consumes and applies a batch. Backends must apply either all of the
    /// batch operations or none of them.
    fn commit_batch(&self, batch: StorageBatch) -> Result<(), Error>;

    /// Forces data to be written
    fn flush(&self) -> Result<(), Error>;
}

impl<T: StorageContext> StorageContext for &T {
    fn get<K: AsRef<[u8]>>(&self, key: K) -> Result<Option<Vec<u8>>, Error> {
        (*self).get(key)
    }

    fn has<K: AsRef<[u8]>>(&self, key: K) -> Result<bool, Error> {
        (*self).has(key)
    }

    fn put<K: AsRef<[u8]>>(&self, key: K, value: &[u8]) -> Result<(), Error> {
        (*self).put(key, value)
    }

    fn delete<K: AsRef<[u8]>>(&self, key: K) -> Result<(), Error> {
        (*self).delete(key)
    }
}

impl<T: Storage> Storage for &T {
    fn commit_batch(&self, batch: StorageBatch) -> Result<(), Error> {
        (*self).commit_batch(batch)
    }

    fn flush(&self) -> Result<(), Error> {
        (*self).flush()
    }
}

/// Structure to hold deferred database operations.
///
/// Later operations on the same key replace earlier ones, so the batch
/// always holds the final state of every key it touched.
#[derive(Debug, Default)]
pub struct StorageBatch {
    operations: RefCell<BTreeMap<Vec<u8>, BatchOperation>>,
}

impl StorageBatch {
    /// Create empty batch.
    pub fn new() -> Self {
        StorageBatch {
            operations: RefCell::new(BTreeMap::new()),
        }
    }

    /// Get batch length
    pub fn len(&self) -> usize {
        self.operations.borrow().len()
    }

    /// Batch emptiness predicate
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Add deferred `put` operation
    pub fn put(&self, key: Vec<u8>, value: Vec<u8>) {
        self.operations
            .borrow_mut()
            .insert(key.clone(), BatchOperation::Put { key, value });
    }

    /// Add deferred `delete` operation
    pub fn delete(&self, key: Vec<u8>) {
        self.operations
            .borrow_mut()
            .insert(key.clone(), BatchOperation::Delete { key });
    }

    /// Look up the staged state of `key`.
    ///
    /// Returns `None` if the batch never touched `key`, `Some(None)` if it is
    /// staged for deletion and `Some(Some(value))` if it is staged for a put.
    pub fn staged(&self, key: &[u8]) -> Option<Option<Vec<u8>>> {
        self.operations.borrow().get(key).map(|op| match op {
            BatchOperation::Put { value, .. } => Some(value.clone()),
            BatchOperation::Delete { .. } => None,
        })
    }

    /// Consume the batch, yielding operations in key order.
    pub fn into_operations(self) -> impl Iterator<Item = BatchOperation> {
        self.operations.into_inner().into_values()
    }
}

/// Deferred storage operation not tied to any storage implementation.
#[allow(missing_docs)]
#[derive(strum::AsRefStr)]
pub enum BatchOperation {
    /// Deferred put operation
    Put { key: Vec<u8>, value: Vec<u8> },
    /// Deferred delete operation
    Delete { key: Vec<u8> },
}

impl std::fmt::Debug for BatchOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut fmt = f.debug_struct(self.as_ref());

        match self {
            BatchOperation::Put { key, value } => {
                fmt.field("key", &hex::encode(key))
                    .field("value", &hex::encode(value));
            }
            BatchOperation::Delete { key } => {
                fmt.field("key", &hex::encode(key));
            }
        }

        fmt.finish()
    }
}

/// Storage context that stages every write in a [`StorageBatch`].
///
/// Reads check the batch first (overlay semantics) and fall through to the
/// underlying storage, so a multi-step mutation observes its own writes
/// before anything reaches the backend. Nothing is written until the batch
/// is passed to [`Storage::commit_batch`].
pub struct BatchStorageContext<'db, S> {
    storage: &'db S,
    batch: StorageBatch,
}

impl<'db, S: Storage> BatchStorageContext<'db, S> {
    /// Create a new context over `storage` with an empty batch.
    pub fn new(storage: &'db S) -> Self {
        Self {
            storage,
            batch: StorageBatch::new(),
        }
    }

    /// Apply all staged operations to the underlying storage.
    pub fn commit(self) -> Result<(), Error> {
        if self.batch.is_empty() {
            return Ok(());
        }
        self.storage.commit_batch(self.batch)
    }
}

impl<S: Storage> StorageContext for BatchStorageContext<'_, S> {
    fn get<K: AsRef<[u8]>>(&self, key: K) -> Result<Option<Vec<u8>>, Error> {
        match self.batch.staged(key.as_ref()) {
            Some(staged) => Ok(staged),
            None => self.storage.get(key),
        }
    }

    fn has<K: AsRef<[u8]>>(&self, key: K) -> Result<bool, Error> {
        match self.batch.staged(key.as_ref()) {
            Some(staged) => Ok(staged.is_some()),
            None => self.storage.has(key),
        }
    }

    fn put<K: AsRef<[u8]>>(&self, key: K, value: &[u8]) -> Result<(), Error> {
        self.batch.put(key.as_ref().to_vec(), value.to_vec());
        Ok(())
    }

    fn delete<K: AsRef<[u8]>>(&self, key: K) -> Result<(), Error> {
        self.batch.delete(key.as_ref().to_vec());
        Ok(())
    }
}
