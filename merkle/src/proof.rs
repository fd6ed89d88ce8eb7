//! Inclusion proofs.
//!
//! A proof lists one digest per level from the leaf up to the root. At each
//! level the running digest is combined with the proof element, on the left
//! if the current node is a left child and on the right otherwise:
//!
//! ```text
//! acc = leaf_digest
//! acc = H(acc || p)   // left child
//! acc = H(p || acc)   // right child
//! ```
//!
//! When a node has no sibling the proof carries the node's own digest, which
//! reproduces the `H(child || child)` rule used for single-child parents.

use bincode::{Decode, Encode};

use crate::{
    address::Position,
    hash::{combine, digest, leaf_hash, Digest},
    Error, Result,
};

/// Longest path a tree with 32-bit storage keys can produce.
const MAX_PATH_LENGTH: usize = 32;

/// An inclusion proof for a single leaf.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct InclusionProof {
    /// Slot of the proved leaf.
    pub slot: u64,
    /// Digest of the proved leaf, `H(H(content) || slot)`.
    pub leaf_digest: Digest,
    /// Proof elements in climbing order.
    pub path: Vec<Digest>,
}

impl InclusionProof {
    /// Fold the path into the root digest it commits to.
    pub fn calculate_root(&self) -> Result<Digest> {
        self.validate()?;
        Ok(fold_path(self.slot, &self.leaf_digest, &self.path))
    }

    /// Verify the proof against an expected root digest.
    pub fn verify(&self, expected_root: &Digest) -> Result<()> {
        let computed_root = self.calculate_root()?;
        if &computed_root != expected_root {
            return Err(Error::InvalidProof(format!(
                "root hash mismatch: expected {}, got {}",
                hex::encode(expected_root),
                hex::encode(computed_root)
            )));
        }
        Ok(())
    }

    /// Verify that the proof covers `content` and commits to `expected_root`.
    pub fn verify_content(&self, content: &[u8], expected_root: &Digest) -> Result<()> {
        self.validate()?;
        if leaf_hash(&digest(content), self.slot as u32) != self.leaf_digest {
            return Err(Error::InvalidProof(format!(
                "leaf digest does not bind the content to slot {}",
                self.slot
            )));
        }
        self.verify(expected_root)
    }

    /// Encode to bytes using bincode.
    pub fn encode_to_vec(&self) -> Result<Vec<u8>> {
        let config = bincode::config::standard()
            .with_big_endian()
            .with_no_limit();
        bincode::encode_to_vec(self, config)
            .map_err(|e| Error::InvalidProof(format!("encode error: {}", e)))
    }

    /// Decode from bytes using bincode.
    pub fn decode_from_slice(bytes: &[u8]) -> Result<Self> {
        let config = bincode::config::standard()
            .with_big_endian()
            .with_limit::<{ 64 * 1024 }>();
        let (proof, _): (Self, _) = bincode::decode_from_slice(bytes, config)
            .map_err(|e| Error::InvalidProof(format!("decode error: {}", e)))?;
        proof.validate()?;
        Ok(proof)
    }

    fn validate(&self) -> Result<()> {
        if self.slot % 2 == 0 || self.slot > u32::MAX as u64 {
            return Err(Error::InvalidProof(format!(
                "slot {} is not an odd 32-bit leaf slot",
                self.slot
            )));
        }
        if self.path.len() > MAX_PATH_LENGTH {
            return Err(Error::InvalidProof(format!(
                "path of {} elements exceeds the maximum {}",
                self.path.len(),
                MAX_PATH_LENGTH
            )));
        }
        Ok(())
    }
}

/// Check that `path` proves the leaf `leaf_digest` at `slot` under `root`.
pub fn verify_proof(slot: u64, leaf_digest: &Digest, path: &[Digest], root: &Digest) -> bool {
    slot % 2 == 1 && fold_path(slot, leaf_digest, path) == *root
}

fn fold_path(slot: u64, leaf_digest: &Digest, path: &[Digest]) -> Digest {
    let mut position = Position::leaf(slot);
    let mut acc = *leaf_digest;
    for element in path {
        acc = if position.is_left_child() {
            combine(&acc, element)
        } else {
            combine(element, &acc)
        };
        position = position.parent();
    }
    acc
}
