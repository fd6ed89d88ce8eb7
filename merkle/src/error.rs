/// Alias for `core::result::Result<T, Error>`.
pub type Result<T> = core::result::Result<T, Error>;

/// Errors from slotted Merkle tree operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Content, slot or root lookup found nothing.
    #[error("not found: {0}")]
    NotFound(String),
    /// An error propagated unchanged from the storage adapter.
    #[error("storage error: {0}")]
    StorageError(#[from] slotted_merkle_storage::Error),
    /// A node or record the address algebra requires is missing or
    /// malformed. Signals corruption; the operation is aborted.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
    /// Every slot addressable with 32-bit storage keys is allocated.
    #[error("tree is full (capacity {capacity})")]
    TreeFull {
        /// Maximum slot count.
        capacity: u64,
    },
    /// A proof failed to decode or verify.
    #[error("invalid proof: {0}")]
    InvalidProof(String),
}

impl Error {
    /// Build an [`Error::InvariantViolation`], logging it as corruption.
    pub(crate) fn invariant(message: String) -> Self {
        tracing::error!(%message, "merkle tree invariant violated");
        Error::InvariantViolation(message)
    }
}
