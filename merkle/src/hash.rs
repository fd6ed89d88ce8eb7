//! Digest function.
//!
//! Every digest in the tree is a 32-byte Blake3 hash:
//!
//! - content digest: `H(content)`
//! - leaf digest: `H(H(content) || slot)`, slot as a big-endian `u32`
//! - internal node: `H(left || right)`, or `H(child || child)` when only one
//!   child exists

/// Width in bytes of every digest.
pub const DIGEST_LENGTH: usize = 32;

/// A fixed-width digest.
pub type Digest = [u8; DIGEST_LENGTH];

/// Hash an arbitrary byte string.
pub fn digest(bytes: &[u8]) -> Digest {
    *blake3::hash(bytes).as_bytes()
}

/// Hash the concatenation `left || right`.
pub fn combine(left: &Digest, right: &Digest) -> Digest {
    let mut hasher = blake3::Hasher::new();
    hasher.update(left);
    hasher.update(right);
    *hasher.finalize().as_bytes()
}

/// Digest of a leaf, binding the content digest to the slot it occupies.
pub(crate) fn leaf_hash(content_digest: &Digest, slot: u32) -> Digest {
    let mut hasher = blake3::Hasher::new();
    hasher.update(content_digest);
    hasher.update(&slot.to_be_bytes());
    *hasher.finalize().as_bytes()
}
