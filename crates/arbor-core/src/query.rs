//! Row Queries
//!
//! Backend-neutral description of the row lookups the engine and the
//! materializer issue. A [`NodeQuery`] is a conjunction of [`Condition`]s plus
//! an ordering; [`NodeQuery::matches`] evaluates it against a row so that any
//! storage handler can execute it, and handlers backed by a query language can
//! translate the conditions instead.

use crate::types::{Bounds, GroupId, NodeId, TreeNode};
use std::fmt;
use std::sync::Arc;

/// Caller-supplied row predicate
pub type RowPredicate<T> = Arc<dyn Fn(&TreeNode<T>) -> bool + Send + Sync>;

/// One conjunct of a [`NodeQuery`]
pub enum Condition<T> {
    /// Row has this identity
    Id(NodeId),
    /// Row belongs to this group
    Group(GroupId),
    /// Row's left boundary equals this value
    Left(i64),
    /// Row's right boundary equals this value
    Right(i64),
    /// Row lies strictly inside `(lft, rgt)` of its group
    Inside {
        /// Exclusive lower bound for `lft`
        lft: i64,
        /// Exclusive upper bound for `rgt`
        rgt: i64,
    },
    /// Row's interval strictly contains `[lft, rgt]`
    Encloses {
        /// Left boundary that must lie inside the row
        lft: i64,
        /// Right boundary that must lie inside the row
        rgt: i64,
    },
    /// Row's level equals this value
    Level(u32),
    /// Row's level is at most this value
    LevelAtMost(u32),
    /// Row's level is at least this value
    LevelAtLeast(u32),
    /// Row has no descendants
    Leaf,
    /// Arbitrary caller predicate
    Matches(RowPredicate<T>),
}

impl<T> Condition<T> {
    /// Evaluate the condition against a row
    pub fn matches(&self, node: &TreeNode<T>) -> bool {
        let b = &node.bounds;
        match self {
            Condition::Id(id) => node.id == *id,
            Condition::Group(group) => b.root == *group,
            Condition::Left(lft) => b.lft == *lft,
            Condition::Right(rgt) => b.rgt == *rgt,
            Condition::Inside { lft, rgt } => b.lft > *lft && b.rgt < *rgt,
            Condition::Encloses { lft, rgt } => b.lft < *lft && b.rgt > *rgt,
            Condition::Level(level) => b.level == *level,
            Condition::LevelAtMost(level) => b.level <= *level,
            Condition::LevelAtLeast(level) => b.level >= *level,
            Condition::Leaf => b.is_leaf(),
            Condition::Matches(predicate) => predicate(node),
        }
    }

    /// Whether the condition bounds the row's depth
    pub fn is_level_bound(&self) -> bool {
        matches!(
            self,
            Condition::Level(_) | Condition::LevelAtMost(_) | Condition::LevelAtLeast(_)
        )
    }
}

impl<T> Clone for Condition<T> {
    fn clone(&self) -> Self {
        match self {
            Condition::Id(id) => Condition::Id(*id),
            Condition::Group(group) => Condition::Group(*group),
            Condition::Left(lft) => Condition::Left(*lft),
            Condition::Right(rgt) => Condition::Right(*rgt),
            Condition::Inside { lft, rgt } => Condition::Inside {
                lft: *lft,
                rgt: *rgt,
            },
            Condition::Encloses { lft, rgt } => Condition::Encloses {
                lft: *lft,
                rgt: *rgt,
            },
            Condition::Level(level) => Condition::Level(*level),
            Condition::LevelAtMost(level) => Condition::LevelAtMost(*level),
            Condition::LevelAtLeast(level) => Condition::LevelAtLeast(*level),
            Condition::Leaf => Condition::Leaf,
            Condition::Matches(predicate) => Condition::Matches(Arc::clone(predicate)),
        }
    }
}

impl<T> fmt::Debug for Condition<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Id(id) => write!(f, "id = {id}"),
            Condition::Group(group) => write!(f, "root = {}", group.0),
            Condition::Left(lft) => write!(f, "lft = {lft}"),
            Condition::Right(rgt) => write!(f, "rgt = {rgt}"),
            Condition::Inside { lft, rgt } => write!(f, "lft > {lft} AND rgt < {rgt}"),
            Condition::Encloses { lft, rgt } => write!(f, "lft < {lft} AND rgt > {rgt}"),
            Condition::Level(level) => write!(f, "level = {level}"),
            Condition::LevelAtMost(level) => write!(f, "level <= {level}"),
            Condition::LevelAtLeast(level) => write!(f, "level >= {level}"),
            Condition::Leaf => write!(f, "rgt = lft + 1"),
            Condition::Matches(_) => write!(f, "<predicate>"),
        }
    }
}

/// Result ordering of a [`NodeQuery`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NodeOrder {
    /// Ascending left boundary (preorder within one group)
    #[default]
    Left,
    /// Ascending group, then ascending left boundary
    GroupThenLeft,
}

/// Conjunctive row query with ordering
pub struct NodeQuery<T> {
    conditions: Vec<Condition<T>>,
    order: NodeOrder,
}

impl<T> NodeQuery<T> {
    /// Query matching every row
    pub fn all() -> Self {
        Self {
            conditions: Vec::new(),
            order: NodeOrder::GroupThenLeft,
        }
    }

    /// Lookup by identity
    pub fn by_id(id: NodeId) -> Self {
        Self::all().and(Condition::Id(id))
    }

    /// Every row of one group, in preorder
    pub fn group(group: GroupId) -> Self {
        Self::all().and(Condition::Group(group)).ordered_by(NodeOrder::Left)
    }

    /// Root rows of every group
    pub fn roots() -> Self {
        Self::all()
            .and(Condition::Left(1))
            .ordered_by(NodeOrder::GroupThenLeft)
    }

    /// Rows strictly inside `bounds`, optionally at most `depth` levels below
    pub fn descendants_of(bounds: &Bounds, depth: Option<u32>) -> Self {
        let query = Self::all()
            .and(Condition::Group(bounds.root))
            .and(Condition::Inside {
                lft: bounds.lft,
                rgt: bounds.rgt,
            })
            .ordered_by(NodeOrder::Left);
        match depth {
            Some(depth) => query.and(Condition::LevelAtMost(bounds.level.saturating_add(depth))),
            None => query,
        }
    }

    /// Direct children of `bounds`
    pub fn children_of(bounds: &Bounds) -> Self {
        Self::descendants_of(bounds, Some(1))
    }

    /// Rows whose interval strictly contains `bounds`, optionally limited to
    /// the nearest `depth` ancestors
    pub fn ancestors_of(bounds: &Bounds, depth: Option<u32>) -> Self {
        let query = Self::all()
            .and(Condition::Group(bounds.root))
            .and(Condition::Encloses {
                lft: bounds.lft,
                rgt: bounds.rgt,
            })
            .ordered_by(NodeOrder::Left);
        match depth {
            Some(depth) => query.and(Condition::LevelAtLeast(bounds.level.saturating_sub(depth))),
            None => query,
        }
    }

    /// Add a conjunct
    pub fn and(mut self, condition: Condition<T>) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Add a caller predicate as a conjunct
    pub fn and_where<F>(self, predicate: F) -> Self
    where
        F: Fn(&TreeNode<T>) -> bool + Send + Sync + 'static,
    {
        self.and(Condition::Matches(Arc::new(predicate)))
    }

    /// Replace the ordering
    pub fn ordered_by(mut self, order: NodeOrder) -> Self {
        self.order = order;
        self
    }

    /// Keep only the conjuncts for which `keep` returns true
    pub fn retain<F>(mut self, keep: F) -> Self
    where
        F: FnMut(&Condition<T>) -> bool,
    {
        self.conditions.retain(keep);
        self
    }

    /// Conjuncts of the query
    pub fn conditions(&self) -> &[Condition<T>] {
        &self.conditions
    }

    /// Ordering of the query
    pub fn order(&self) -> NodeOrder {
        self.order
    }

    /// Whether a row satisfies every conjunct
    pub fn matches(&self, node: &TreeNode<T>) -> bool {
        self.conditions.iter().all(|c| c.matches(node))
    }

    /// Sort rows according to the query ordering
    pub fn sort(&self, rows: &mut [TreeNode<T>]) {
        match self.order {
            NodeOrder::Left => rows.sort_by_key(|n| (n.bounds.lft, n.bounds.root, n.id)),
            NodeOrder::GroupThenLeft => rows.sort_by_key(|n| (n.bounds.root, n.bounds.lft, n.id)),
        }
    }
}

impl<T> Clone for NodeQuery<T> {
    fn clone(&self) -> Self {
        Self {
            conditions: self.conditions.clone(),
            order: self.order,
        }
    }
}

impl<T> fmt::Debug for NodeQuery<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeQuery")
            .field("conditions", &self.conditions)
            .field("order", &self.order)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: u64, lft: i64, rgt: i64, level: u32) -> TreeNode<&'static str> {
        TreeNode::new(
            NodeId(id),
            Bounds {
                lft,
                rgt,
                level,
                root: GroupId::FIRST,
            },
            "n",
        )
    }

    #[test]
    fn test_children_query_excludes_grandchildren() {
        let root = node(1, 1, 8, 1);
        let child = node(2, 2, 5, 2);
        let grandchild = node(3, 3, 4, 3);
        let query = NodeQuery::children_of(&root.bounds);
        assert!(query.matches(&child));
        assert!(!query.matches(&grandchild));
        assert!(!query.matches(&root));
    }

    #[test]
    fn test_ancestors_query_with_depth() {
        let root = node(1, 1, 8, 1);
        let child = node(2, 2, 5, 2);
        let grandchild = node(3, 3, 4, 3);
        let nearest = NodeQuery::ancestors_of(&grandchild.bounds, Some(1));
        assert!(nearest.matches(&child));
        assert!(!nearest.matches(&root));
        let all = NodeQuery::ancestors_of(&grandchild.bounds, None);
        assert!(all.matches(&root));
    }

    #[test]
    fn test_retain_drops_level_bound() {
        let root = node(1, 1, 8, 1);
        let grandchild = node(3, 3, 4, 3);
        let widened = NodeQuery::children_of(&root.bounds).retain(|c| !c.is_level_bound());
        assert!(widened.matches(&grandchild));
    }

    #[test]
    fn test_predicate_conjunct() {
        let query = NodeQuery::all().and_where(|n: &TreeNode<&str>| n.id.0 % 2 == 0);
        assert!(query.matches(&node(2, 2, 3, 2)));
        assert!(!query.matches(&node(3, 4, 5, 2)));
    }
}
