//! Implementation for a storage abstraction over RocksDB.
use std::path::Path;

use lazy_static::lazy_static;
use rocksdb::{WriteBatch, DB};

use crate::{BatchOperation, Error, Storage, StorageBatch, StorageContext};

lazy_static! {
    static ref DEFAULT_OPTS: rocksdb::Options = {
        let mut opts = rocksdb::Options::default();
        opts.create_if_missing(true);
        opts.increase_parallelism(num_cpus::get() as i32);
        opts.set_allow_mmap_writes(true);
        opts.set_allow_mmap_reads(true);
        opts
    };
}

/// Storage which uses RocksDB as its backend.
///
/// Every [`StorageBatch`] is applied as a single RocksDB `WriteBatch`, so a
/// committed batch is either fully visible or not visible at all.
pub struct RocksDbStorage {
    db: DB,
}

impl RocksDbStorage {
    /// Open (creating if missing) a database at `path` with default options.
    pub fn default_rocksdb_with_path<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let db = DB::open(&DEFAULT_OPTS, &path)?;
        Ok(RocksDbStorage { db })
    }
}

impl StorageContext for RocksDbStorage {
    fn get<K: AsRef<[u8]>>(&self, key: K) -> Result<Option<Vec<u8>>, Error> {
        Ok(self.db.get(key)?)
    }

    fn has<K: AsRef<[u8]>>(&self, key: K) -> Result<bool, Error> {
        Ok(self.db.get_pinned(key)?.is_some())
    }

    fn put<K: AsRef<[u8]>>(&self, key: K, value: &[u8]) -> Result<(), Error> {
        Ok(self.db.put(key, value)?)
    }

    fn delete<K: AsRef<[u8]>>(&self, key: K) -> Result<(), Error> {
        Ok(self.db.delete(key)?)
    }
}

impl Storage for RocksDbStorage {
    fn commit_batch(&self, batch: StorageBatch) -> Result<(), Error> {
        let mut db_batch = WriteBatch::default();
        for op in batch.into_operations() {
            match op {
                BatchOperation::Put { key, value } => db_batch.put(key, value),
                BatchOperation::Delete { key } => db_batch.delete(key),
            }
        }
        Ok(self.db.write(db_batch)?)
    }

    fn flush(&self) -> Result<(), Error> {
        Ok(self.db.flush()?)
    }
}
