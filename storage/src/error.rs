//! Storage errors

/// Storage and underlying errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Rocks DB error
    #[cfg(feature = "rocksdb_storage")]
    #[error("rocksDB error: {0}")]
    RocksDBError(#[from] rocksdb::Error),
    /// Error reported by any other storage backend
    #[error("storage error: {0}")]
    StorageError(String),
}
