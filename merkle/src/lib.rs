//! Dynamically sized Merkle tree over durable key-value storage.
//!
//! Leaves occupy odd slots `1, 3, 5, ...` in insertion order; every node is
//! addressed by a `(coordinate, height)` pair whose storage key is
//! `coordinate << height`. Inserting, updating or deleting a leaf recomputes
//! the digests on its path to the root, vacated slots are reissued smallest
//! first, and deletions let the root descend past single-child spines.
//!
//! # Core types
//!
//! - [`MerkleTree`]: the engine (insert, update, delete, root, proofs).
//! - [`InclusionProof`]: a leaf-to-root proof (verify, encode, decode).
//! - [`address::Position`]: a node address and its arithmetic.
//!
//! Storage backends come from [`storage`]: an in-memory
//! [`MemoryStorage`](storage::MemoryStorage) and, with the `rocksdb_storage`
//! feature, a RocksDB backend.

#![warn(missing_docs)]

pub mod address;
mod error;
mod free_slots;
pub mod hash;
mod keys;
mod proof;
mod tree;

#[cfg(test)]
mod test_utils;

pub use error::{Error, Result};
pub use free_slots::FreeSlotPool;
pub use hash::{Digest, DIGEST_LENGTH};
pub use proof::{verify_proof, InclusionProof};
pub use slotted_merkle_storage as storage;
pub use tree::{MerkleTree, MAX_SIZE};
