#![deny(missing_docs)]

//! Storage abstraction for the slotted Merkle tree.
//!
//! The tree only needs point lookups, existence checks, overwrites and
//! deletes over opaque byte strings. [`StorageContext`] describes exactly
//! that; [`Storage`] adds atomic application of a deferred [`StorageBatch`].

mod error;
mod memory_storage;
#[cfg(feature = "rocksdb_storage")]
pub mod rocksdb_storage;
mod storage;

pub use crate::{
    error::Error,
    memory_storage::MemoryStorage,
    storage::{BatchOperation, BatchStorageContext, Storage, StorageBatch, StorageContext},
};
