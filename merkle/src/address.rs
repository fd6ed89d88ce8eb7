//! Address algebra.
//!
//! Every node is a `(coordinate, height)` pair with height 0 at the leaves.
//! Leaf coordinates are the odd slots `1, 3, 5, ...`; the same arithmetic
//! maps a coordinate to its parent and children at every height:
//!
//! ```text
//!                    1@2 (key 4)
//!            /                     \
//!      1@1 (key 2)             3@1 (key 6)
//!       /      \                /      \
//!   1@0 (1)  3@0 (3)       5@0 (5)  7@0 (7)
//! ```
//!
//! Coordinates are always odd, so the storage key `coordinate << height`
//! is odd for leaves and even for internal nodes, and its trailing zero
//! count recovers the height.

/// Left child coordinate of the parent coordinate `p`.
pub fn left_child(p: u64) -> u64 {
    2 * p - 1
}

/// Right child coordinate of the parent coordinate `p`.
pub fn right_child(p: u64) -> u64 {
    2 * p + 1
}

/// Whether coordinate `x` is the left child of its parent.
pub fn is_left_child(x: u64) -> bool {
    ((x + 1) / 2) % 2 == 1
}

/// Parent coordinate of `x`, given `x` is a left child.
pub fn parent_of_left(x: u64) -> u64 {
    (x + 1) / 2
}

/// Parent coordinate of `x`, given `x` is a right child.
pub fn parent_of_right(x: u64) -> u64 {
    (x - 1) / 2
}

/// Parent coordinate of `x`.
pub fn parent(x: u64) -> u64 {
    if is_left_child(x) {
        parent_of_left(x)
    } else {
        parent_of_right(x)
    }
}

/// Bit length of `n` minus one. `n` must be non-zero.
pub fn log2_floor(n: u64) -> u32 {
    n.ilog2()
}

/// Index of the lowest set bit of `n`. `n` must be non-zero.
pub fn lowest_set_bit_index(n: u64) -> u32 {
    n.trailing_zeros()
}

/// Storage key of the apex for a tree that has allocated `size` slots: the
/// smallest power of two not below `size`.
pub fn apex_for_size(size: u64) -> u64 {
    let floor = 1 << log2_floor(size);
    if floor < size {
        floor << 1
    } else {
        floor
    }
}

/// A node address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    /// Odd coordinate within the node's level.
    pub coordinate: u64,
    /// Distance from the leaf level.
    pub height: u32,
}

impl Position {
    /// Position of the leaf occupying `slot`.
    pub fn leaf(slot: u64) -> Self {
        Position {
            coordinate: slot,
            height: 0,
        }
    }

    /// Position addressed by a non-zero storage key.
    pub fn from_key(key: u64) -> Self {
        let height = lowest_set_bit_index(key);
        Position {
            coordinate: key >> height,
            height,
        }
    }

    /// Flat storage key `coordinate << height`.
    pub fn key(&self) -> u64 {
        self.coordinate << self.height
    }

    /// Whether this node is its parent's left child.
    pub fn is_left_child(&self) -> bool {
        is_left_child(self.coordinate)
    }

    /// Parent node, one level up.
    pub fn parent(&self) -> Self {
        Position {
            coordinate: parent(self.coordinate),
            height: self.height + 1,
        }
    }

    /// Left child. Only meaningful above the leaf level.
    pub fn left_child(&self) -> Self {
        Position {
            coordinate: left_child(self.coordinate),
            height: self.height - 1,
        }
    }

    /// Right child. Only meaningful above the leaf level.
    pub fn right_child(&self) -> Self {
        Position {
            coordinate: right_child(self.coordinate),
            height: self.height - 1,
        }
    }

    /// The other child of this node's parent.
    pub fn sibling(&self) -> Self {
        let parent = self.parent();
        if self.is_left_child() {
            parent.right_child()
        } else {
            parent.left_child()
        }
    }

    /// Whether the leaf at `slot` lies in the subtree rooted here.
    pub fn covers(&self, slot: u64) -> bool {
        let mut leaf = Position::leaf(slot);
        while leaf.height < self.height {
            leaf = leaf.parent();
        }
        leaf == *self
    }
}
