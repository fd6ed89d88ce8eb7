//! Useful utilities for testing.

use std::ops::Deref;

use tempfile::TempDir;

use super::*;

/// RocksDb storage with self-cleanup
pub struct TempStorage {
    dir: TempDir,
    storage: RocksDbStorage,
}

impl TempStorage {
    /// Create new `TempStorage`
    pub fn new() -> Self {
        let dir = TempDir::new().expect("cannot create tempdir");
        let storage = RocksDbStorage::default_rocksdb_with_path(dir.path())
            .expect("cannot open RocksDB storage");
        TempStorage { dir, storage }
    }

    /// Close the database and open it again from the same directory,
    /// simulating a process restart.
    pub fn reopen(self) -> Self {
        let TempStorage { dir, storage } = self;
        drop(storage);
        let storage = RocksDbStorage::default_rocksdb_with_path(dir.path())
            .expect("cannot reopen RocksDB storage");
        TempStorage { dir, storage }
    }
}

impl Default for TempStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl Deref for TempStorage {
    type Target = RocksDbStorage;

    fn deref(&self) -> &Self::Target {
        &self.storage
    }
}
