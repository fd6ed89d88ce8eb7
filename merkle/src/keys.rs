//! Persisted key layout.
//!
//! Every key starts with a one-byte record tag so the namespaces below can
//! never collide. All integers are big-endian `u32`.
//!
//! | tag    | key                   | value             |
//! |--------|-----------------------|-------------------|
//! | `0x00` | `size` / `root`       | scalar            |
//! | `0x01` | node storage key      | node digest       |
//! | `0x02` | node digest           | node storage key  |
//! | `0x03` | content digest        | slot              |
//! | `0x04` | leaf digest           | content           |

use crate::{
    hash::{Digest, DIGEST_LENGTH},
    Error, Result,
};

const NODE_TAG: u8 = 0x01;
const NODE_DIGEST_TAG: u8 = 0x02;
const CONTENT_SLOT_TAG: u8 = 0x03;
const LEAF_CONTENT_TAG: u8 = 0x04;

/// Key of the persisted slot high-water mark.
pub(crate) const SIZE_KEY: &[u8] = b"\x00size";
/// Key of the persisted root storage key.
pub(crate) const ROOT_KEY: &[u8] = b"\x00root";

/// Narrow a slot or storage key to its 32-bit persisted form.
pub(crate) fn to_u32(value: u64) -> Result<u32> {
    u32::try_from(value)
        .map_err(|_| Error::invariant(format!("{} does not fit a 32-bit storage key", value)))
}

pub(crate) fn encode_u32(value: u64) -> Result<[u8; 4]> {
    Ok(to_u32(value)?.to_be_bytes())
}

pub(crate) fn decode_u32(bytes: &[u8]) -> Result<u64> {
    let bytes: [u8; 4] = bytes.try_into().map_err(|_| {
        Error::invariant(format!(
            "expected a 4 byte integer record, found {} bytes",
            bytes.len()
        ))
    })?;
    Ok(u32::from_be_bytes(bytes) as u64)
}

pub(crate) fn decode_digest(bytes: &[u8]) -> Result<Digest> {
    bytes.try_into().map_err(|_| {
        Error::invariant(format!(
            "expected a {} byte digest record, found {} bytes",
            DIGEST_LENGTH,
            bytes.len()
        ))
    })
}

/// `storage_key -> node digest`
pub(crate) fn node_key(storage_key: u64) -> Result<[u8; 5]> {
    let mut key = [NODE_TAG; 5];
    key[1..].copy_from_slice(&encode_u32(storage_key)?);
    Ok(key)
}

fn tagged_digest(tag: u8, digest: &Digest) -> [u8; DIGEST_LENGTH + 1] {
    let mut key = [tag; DIGEST_LENGTH + 1];
    key[1..].copy_from_slice(digest);
    key
}

/// `node digest -> storage_key`
pub(crate) fn node_digest_key(digest: &Digest) -> [u8; DIGEST_LENGTH + 1] {
    tagged_digest(NODE_DIGEST_TAG, digest)
}

/// `content digest -> slot`
pub(crate) fn content_slot_key(content_digest: &Digest) -> [u8; DIGEST_LENGTH + 1] {
    tagged_digest(CONTENT_SLOT_TAG, content_digest)
}

/// `leaf digest -> content`
pub(crate) fn leaf_content_key(leaf_digest: &Digest) -> [u8; DIGEST_LENGTH + 1] {
    tagged_digest(LEAF_CONTENT_TAG, leaf_digest)
}
