//! The Merkle engine.
//!
//! Leaves occupy odd slots in insertion order and every internal node is
//! addressed implicitly through [`crate::address`]. After each mutation the
//! digests on the path from the touched leaf to the root are recomputed
//! bottom-up; a node whose children are both gone is pruned, and after a
//! deletion the root walks down past any node left with a single child.
//!
//! All writes of one mutation are staged in a single
//! [`BatchStorageContext`] and committed atomically. The in-memory scalars
//! and the free-slot pool only change once the commit succeeded.

use slotted_merkle_storage::{BatchStorageContext, Storage, StorageContext};
use tracing::{debug, info, trace};

use crate::{
    address::{apex_for_size, lowest_set_bit_index, Position},
    free_slots::FreeSlotPool,
    hash::{combine, digest, leaf_hash, Digest},
    keys::{
        content_slot_key, decode_digest, decode_u32, encode_u32, leaf_content_key,
        node_digest_key, node_key, to_u32, ROOT_KEY, SIZE_KEY,
    },
    proof::InclusionProof,
    Error, Result,
};

/// Largest slot high-water mark. Keeps every slot and storage key within
/// `u32`.
pub const MAX_SIZE: u64 = 1 << 31;

/// A dynamically sized Merkle tree over a [`Storage`] backend.
///
/// `size` is the number of slots ever allocated (deletions never lower it)
/// and `root` is the storage key of the current apex, `0` for an empty tree.
/// Both are persisted; the free-slot pool is derived from the leaf records on
/// [`open`](MerkleTree::open).
///
/// The tree assumes exclusive access to its storage. Callers sharing it
/// across threads must serialise every operation themselves.
#[derive(Debug)]
pub struct MerkleTree<S> {
    storage: S,
    size: u64,
    root: u64,
    free_slots: FreeSlotPool,
}

impl<S> MerkleTree<S> {
    /// Number of slots ever allocated.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Storage key of the current apex node, `0` when the tree is empty.
    pub fn root_key(&self) -> u64 {
        self.root
    }

    /// Number of live leaves.
    pub fn len(&self) -> u64 {
        self.size - self.free_slots.len() as u64
    }

    /// Returns `true` if the tree holds no live leaf.
    pub fn is_empty(&self) -> bool {
        self.root == 0
    }

    /// Number of vacated slots waiting to be reused.
    pub fn free_slots(&self) -> usize {
        self.free_slots.len()
    }

    /// Return a reference to the underlying storage.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Consume the tree and return its storage.
    pub fn into_storage(self) -> S {
        self.storage
    }
}

impl<S: Storage> MerkleTree<S> {
    /// Create an empty tree, persisting `size = 0` and `root = 0`.
    ///
    /// The storage is expected to hold no previous tree; use
    /// [`open`](MerkleTree::open) to resume one.
    pub fn new(storage: S) -> Result<Self> {
        let context = BatchStorageContext::new(&storage);
        context.put(SIZE_KEY, &encode_u32(0)?)?;
        context.put(ROOT_KEY, &encode_u32(0)?)?;
        context.commit()?;
        debug!("created empty merkle tree");
        Ok(MerkleTree {
            storage,
            size: 0,
            root: 0,
            free_slots: FreeSlotPool::new(),
        })
    }

    /// Resume a tree from the persisted scalars.
    ///
    /// Missing scalars mean an empty tree. The free-slot pool is rebuilt by
    /// scanning every odd slot below the high-water mark for a leaf record.
    /// No deeper integrity check is performed.
    pub fn open(storage: S) -> Result<Self> {
        let size = match storage.get(SIZE_KEY)? {
            Some(bytes) => decode_u32(&bytes)?,
            None => 0,
        };
        let root = match storage.get(ROOT_KEY)? {
            Some(bytes) => decode_u32(&bytes)?,
            None => 0,
        };
        if size > MAX_SIZE {
            return Err(Error::invariant(format!(
                "persisted size {} exceeds the maximum {}",
                size, MAX_SIZE
            )));
        }

        let free_slots = (1..=size)
            .map(|i| 2 * i - 1)
            .filter_map(|slot| match node_key(slot).and_then(|key| Ok(storage.has(key)?)) {
                Ok(true) => None,
                Ok(false) => Some(Ok(slot)),
                Err(e) => Some(Err(e)),
            })
            .collect::<Result<FreeSlotPool>>()?;

        info!(
            size,
            root,
            free_slots = free_slots.len(),
            "opened merkle tree"
        );
        Ok(MerkleTree {
            storage,
            size,
            root,
            free_slots,
        })
    }

    /// Whether `content` currently occupies a slot.
    pub fn exists(&self, content: &[u8]) -> Result<bool> {
        Ok(self.storage.has(content_slot_key(&digest(content)))?)
    }

    /// Slot occupied by `content`.
    pub fn slot_of(&self, content: &[u8]) -> Result<u64> {
        find_slot(&self.storage, &digest(content))
    }

    /// Digest of the leaf holding `content`: `H(H(content) || slot)`.
    pub fn leaf_digest(&self, content: &[u8]) -> Result<Digest> {
        let content_digest = digest(content);
        let slot = find_slot(&self.storage, &content_digest)?;
        Ok(leaf_hash(&content_digest, to_u32(slot)?))
    }

    /// Look up the content bound to a leaf digest.
    pub fn get_content(&self, leaf_digest: &Digest) -> Result<Option<Vec<u8>>> {
        Ok(self.storage.get(leaf_content_key(leaf_digest))?)
    }

    /// Digest of the apex node.
    ///
    /// Returns [`Error::NotFound`] for an empty tree.
    pub fn root(&self) -> Result<Digest> {
        if self.root == 0 {
            return Err(Error::NotFound("tree is empty".to_string()));
        }
        require_node(&self.storage, self.root)
    }

    /// Inclusion proof for `content`: one digest per level, leaf to root.
    ///
    /// Each element is the sibling's digest, or the current node's own
    /// digest when the sibling does not exist.
    pub fn get_proof(&self, content: &[u8]) -> Result<Vec<Digest>> {
        Ok(self.prove(content)?.path)
    }

    /// Inclusion proof for `content` carrying its slot and leaf digest.
    pub fn prove(&self, content: &[u8]) -> Result<InclusionProof> {
        let content_digest = digest(content);
        let slot = find_slot(&self.storage, &content_digest)?;
        let leaf_digest = leaf_hash(&content_digest, to_u32(slot)?);
        check_leaf(&self.storage, slot, &leaf_digest)?;

        let root_height = root_height(self.root)?;
        let mut path = Vec::with_capacity(root_height as usize);
        let mut position = Position::leaf(slot);
        while position.key() != self.root {
            if position.height >= root_height {
                return Err(Error::invariant(format!(
                    "leaf {} is not below root {}",
                    slot, self.root
                )));
            }
            let element = match read_node(&self.storage, position.sibling().key())? {
                Some(sibling) => sibling,
                None => require_node(&self.storage, position.key())?,
            };
            path.push(element);
            position = position.parent();
        }

        Ok(InclusionProof {
            slot,
            leaf_digest,
            path,
        })
    }

    /// Insert `content` into a new leaf and return its slot.
    ///
    /// The smallest vacated slot is reused first; otherwise the tree grows by
    /// one slot and the root moves to the smallest power of two not below
    /// the new size. Duplicate content is not detected: check
    /// [`exists`](MerkleTree::exists) first if that matters.
    pub fn new_node(&mut self, content: &[u8]) -> Result<u64> {
        let (slot, size) = match self.free_slots.peek() {
            Some(slot) => (slot, self.size),
            None if self.size >= MAX_SIZE => {
                return Err(Error::TreeFull { capacity: MAX_SIZE });
            }
            None => (2 * self.size + 1, self.size + 1),
        };
        let grown = size != self.size;
        let root = if grown {
            apex_for_size(size)
        } else if self.root == 0 {
            slot
        } else if Position::from_key(self.root).covers(slot) {
            self.root
        } else {
            // the reused slot sits outside a contracted root
            apex_for_size(size)
        };

        let content_digest = digest(content);
        let leaf_digest = leaf_hash(&content_digest, to_u32(slot)?);

        let context = BatchStorageContext::new(&self.storage);
        if self.root != 0 && root != self.root {
            trace!(from = self.root, to = root, "raising root");
            recompute_ancestors(&context, Position::from_key(self.root), root)?;
        }
        context.put(content_slot_key(&content_digest), &encode_u32(slot)?)?;
        context.put(leaf_content_key(&leaf_digest), content)?;
        write_node(&context, slot, &leaf_digest)?;
        recompute_ancestors(&context, Position::leaf(slot), root)?;
        if grown {
            context.put(SIZE_KEY, &encode_u32(size)?)?;
        }
        if root != self.root {
            context.put(ROOT_KEY, &encode_u32(root)?)?;
        }
        context.commit()?;

        if !grown {
            self.free_slots.pop();
        }
        self.size = size;
        self.root = root;
        debug!(slot, size, root, "inserted node");
        Ok(slot)
    }

    /// Replace `old` with `new` in place and return the shared slot.
    ///
    /// The tree's size and shape do not change.
    pub fn update_node(&mut self, old: &[u8], new: &[u8]) -> Result<u64> {
        let context = BatchStorageContext::new(&self.storage);

        let old_digest = digest(old);
        let slot = find_slot(&context, &old_digest)?;
        let slot_u32 = to_u32(slot)?;
        let old_leaf = leaf_hash(&old_digest, slot_u32);
        check_leaf(&context, slot, &old_leaf)?;
        context.delete(content_slot_key(&old_digest))?;
        context.delete(leaf_content_key(&old_leaf))?;

        let new_digest = digest(new);
        let new_leaf = leaf_hash(&new_digest, slot_u32);
        context.put(content_slot_key(&new_digest), &encode_u32(slot)?)?;
        context.put(leaf_content_key(&new_leaf), new)?;
        write_node(&context, slot, &new_leaf)?;
        recompute_ancestors(&context, Position::leaf(slot), self.root)?;
        context.commit()?;

        debug!(slot, root = self.root, "updated node");
        Ok(slot)
    }

    /// Remove `content`, vacate its slot and return it.
    ///
    /// Ancestors are recomputed up to the pre-deletion root, then the root
    /// descends past every node left with a single child. Deleting the last
    /// live leaf leaves an empty tree.
    pub fn delete_node(&mut self, content: &[u8]) -> Result<u64> {
        let context = BatchStorageContext::new(&self.storage);

        let content_digest = digest(content);
        let slot = find_slot(&context, &content_digest)?;
        let leaf_digest = leaf_hash(&content_digest, to_u32(slot)?);
        check_leaf(&context, slot, &leaf_digest)?;
        context.delete(content_slot_key(&content_digest))?;
        context.delete(leaf_content_key(&leaf_digest))?;
        remove_node(&context, slot)?;

        recompute_ancestors(&context, Position::leaf(slot), self.root)?;
        let root = contract_root(&context, self.root)?;
        if root != self.root {
            context.put(ROOT_KEY, &encode_u32(root)?)?;
        }
        context.commit()?;

        self.free_slots.push(slot);
        if root != self.root {
            debug!(from = self.root, to = root, "contracted root");
        }
        self.root = root;
        debug!(slot, root, "deleted node");
        Ok(slot)
    }
}

fn root_height(root: u64) -> Result<u32> {
    if root == 0 {
        return Err(Error::invariant(
            "live leaf found in an empty tree".to_string(),
        ));
    }
    Ok(lowest_set_bit_index(root))
}

fn find_slot<C: StorageContext>(context: &C, content_digest: &Digest) -> Result<u64> {
    let bytes = context.get(content_slot_key(content_digest))?.ok_or_else(|| {
        Error::NotFound(format!(
            "no slot holds content with digest {}",
            hex::encode(content_digest)
        ))
    })?;
    let slot = decode_u32(&bytes)?;
    if slot % 2 == 0 {
        return Err(Error::invariant(format!(
            "content digest {} maps to even slot {}",
            hex::encode(content_digest),
            slot
        )));
    }
    Ok(slot)
}

fn read_node<C: StorageContext>(context: &C, key: u64) -> Result<Option<Digest>> {
    context
        .get(node_key(key)?)?
        .map(|bytes| decode_digest(&bytes))
        .transpose()
}

fn require_node<C: StorageContext>(context: &C, key: u64) -> Result<Digest> {
    read_node(context, key)?
        .ok_or_else(|| Error::invariant(format!("node {} is missing", key)))
}

/// The leaf at `slot` must carry the digest binding its content to the slot.
fn check_leaf<C: StorageContext>(context: &C, slot: u64, expected: &Digest) -> Result<()> {
    if require_node(context, slot)? != *expected {
        return Err(Error::invariant(format!(
            "leaf {} does not match the content mapped to it",
            slot
        )));
    }
    Ok(())
}

/// Overwrite the node record at `key` and its reverse digest mapping.
fn write_node<C: StorageContext>(context: &C, key: u64, node_digest: &Digest) -> Result<()> {
    if let Some(previous) = read_node(context, key)? {
        unlink_digest(context, &previous, key)?;
    }
    context.put(node_key(key)?, node_digest)?;
    context.put(node_digest_key(node_digest), &encode_u32(key)?)?;
    Ok(())
}

/// Delete the node record at `key` and its reverse digest mapping.
fn remove_node<C: StorageContext>(context: &C, key: u64) -> Result<()> {
    if let Some(previous) = read_node(context, key)? {
        context.delete(node_key(key)?)?;
        unlink_digest(context, &previous, key)?;
    }
    Ok(())
}

/// Drop `digest -> key` unless another node has claimed the digest since.
fn unlink_digest<C: StorageContext>(context: &C, node_digest: &Digest, key: u64) -> Result<()> {
    let mapping = node_digest_key(node_digest);
    if let Some(bytes) = context.get(mapping)? {
        if decode_u32(&bytes)? == key {
            context.delete(mapping)?;
        }
    }
    Ok(())
}

/// Recompute every ancestor of `from` up to and including `root`.
fn recompute_ancestors<C: StorageContext>(context: &C, from: Position, root: u64) -> Result<()> {
    let root_height = root_height(root)?;
    let mut position = from;
    while position.key() != root {
        if position.height >= root_height {
            return Err(Error::invariant(format!(
                "node {} is not below root {}",
                from.key(),
                root
            )));
        }
        position = position.parent();
        refresh_node(context, position)?;
    }
    Ok(())
}

/// Rehash an internal node from its children, pruning it if both are gone.
fn refresh_node<C: StorageContext>(context: &C, position: Position) -> Result<()> {
    let key = position.key();
    let left = read_node(context, position.left_child().key())?;
    let right = read_node(context, position.right_child().key())?;
    let node_digest = match (left, right) {
        (None, None) => {
            trace!(key, "pruning childless node");
            return remove_node(context, key);
        }
        (Some(left), Some(right)) => combine(&left, &right),
        (Some(child), None) | (None, Some(child)) => combine(&child, &child),
    };
    write_node(context, key, &node_digest)
}

/// Walk down from `root` past every node with a single child and return the
/// new root key, `0` if the whole tree was pruned.
fn contract_root<C: StorageContext>(context: &C, root: u64) -> Result<u64> {
    if !context.has(node_key(root)?)? {
        return Ok(0);
    }
    let mut position = Position::from_key(root);
    while position.height > 0 {
        let left = position.left_child();
        let right = position.right_child();
        let has_left = context.has(node_key(left.key())?)?;
        let has_right = context.has(node_key(right.key())?)?;
        let next = match (has_left, has_right) {
            (true, true) => break,
            (true, false) => left,
            (false, true) => right,
            (false, false) => {
                return Err(Error::invariant(format!(
                    "node {} survived without children",
                    position.key()
                )));
            }
        };
        trace!(from = position.key(), to = next.key(), "descending root");
        remove_node(context, position.key())?;
        position = next;
    }
    Ok(position.key())
}
