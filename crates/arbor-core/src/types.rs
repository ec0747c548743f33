//! Core Row Types
//!
//! Identifiers and the nested-set row shape shared by every crate in the
//! workspace. A [`TreeNode`] is one row of the flat relation; its [`Bounds`]
//! carry the boundary pair, depth and group that encode the hierarchy.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a row in the tree relation.
///
/// Identities are allocated by the storage collaborator and never reused.
/// The zero value is reserved as the "no node" sentinel used by position
/// descriptors and the synthetic all-roots start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u64);

impl NodeId {
    /// Reserved "no node" identity
    pub const NONE: NodeId = NodeId(0);

    /// Whether this is the reserved zero identity
    pub fn is_none(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for NodeId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// Identifier partitioning one relation into independent trees.
///
/// Every node of a tree carries the group of its root. In multi-root mode each
/// root owns a distinct group; groups are ordered, and new roots are appended
/// after the highest existing group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(pub u64);

impl GroupId {
    /// Group used by the first tree of an empty relation
    pub const FIRST: GroupId = GroupId(1);

    /// The group following this one
    pub fn next(self) -> GroupId {
        GroupId(self.0 + 1)
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "group#{}", self.0)
    }
}

/// Nested-set position of a single row.
///
/// `[lft, rgt]` contains the interval of every descendant and is disjoint
/// from every non-descendant within the same `root` group. `level` is the
/// depth, with roots at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Bounds {
    /// Left boundary
    pub lft: i64,
    /// Right boundary
    pub rgt: i64,
    /// Depth, root = 1
    pub level: u32,
    /// Group the row belongs to
    pub root: GroupId,
}

impl Bounds {
    /// Bounds of a childless root in `root`
    pub fn new_root(root: GroupId) -> Self {
        Self {
            lft: 1,
            rgt: 2,
            level: 1,
            root,
        }
    }

    /// Number of boundary values the interval occupies
    pub fn width(&self) -> i64 {
        self.rgt - self.lft + 1
    }

    /// Number of descendants implied by the interval
    pub fn descendant_count(&self) -> i64 {
        (self.rgt - self.lft - 1) / 2
    }

    /// Whether this row is the root of its group
    pub fn is_root(&self) -> bool {
        self.lft == 1
    }

    /// Whether this row has no descendants
    pub fn is_leaf(&self) -> bool {
        self.rgt - self.lft == 1
    }

    /// Whether `other` lies strictly inside this interval
    pub fn strictly_contains(&self, other: &Bounds) -> bool {
        self.root == other.root && other.lft > self.lft && other.rgt < self.rgt
    }

    /// Whether `other` is this row or lies inside its interval
    pub fn encloses(&self, other: &Bounds) -> bool {
        self.root == other.root && other.lft >= self.lft && other.rgt <= self.rgt
    }
}

/// One row of the tree relation: identity, position and caller payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeNode<T> {
    /// Row identity
    pub id: NodeId,
    /// Nested-set position
    #[serde(flatten)]
    pub bounds: Bounds,
    /// Non-tree attributes owned by the caller
    pub data: T,
}

impl<T> TreeNode<T> {
    /// Create a row from its parts
    pub fn new(id: NodeId, bounds: Bounds, data: T) -> Self {
        Self { id, bounds, data }
    }

    /// Left boundary
    pub fn lft(&self) -> i64 {
        self.bounds.lft
    }

    /// Right boundary
    pub fn rgt(&self) -> i64 {
        self.bounds.rgt
    }

    /// Depth, root = 1
    pub fn level(&self) -> u32 {
        self.bounds.level
    }

    /// Group of the row
    pub fn group(&self) -> GroupId {
        self.bounds.root
    }

    /// Whether this row is the root of its group
    pub fn is_root(&self) -> bool {
        self.bounds.is_root()
    }

    /// Whether this row has no descendants
    pub fn is_leaf(&self) -> bool {
        self.bounds.is_leaf()
    }

    /// Whether this row lies strictly inside `ancestor`'s interval
    pub fn is_descendant_of<U>(&self, ancestor: &TreeNode<U>) -> bool {
        ancestor.bounds.strictly_contains(&self.bounds)
    }
}

/// Access to the human-readable label of a row payload.
///
/// Used by the materializer for `title` fields and option labels.
pub trait Titled {
    /// Display title of the row
    fn title(&self) -> &str;
}

impl Titled for String {
    fn title(&self) -> &str {
        self
    }
}

impl Titled for &str {
    fn title(&self) -> &str {
        self
    }
}
