//! Nested-Set Invariant Verification
//!
//! Checks the structural invariants of one group (or of a whole forest):
//! intervals nest or are disjoint, `rgt = lft + 2 * descendants + 1`, levels
//! increase by one per nesting step, and every group has exactly one root at
//! `lft = 1`. Used by the engine's post-mutation verification and by tests.

use crate::types::{Bounds, GroupId, NodeId, TreeNode};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// First invariant violation found in a group.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub enum InvariantViolation {
    /// Row listed under a group it does not carry
    #[error("node {node} carries {actual} but was verified as part of {expected}")]
    ForeignGroup {
        /// Offending row
        node: NodeId,
        /// Group being verified
        expected: GroupId,
        /// Group the row carries
        actual: GroupId,
    },

    /// Row whose left boundary is not below its right boundary
    #[error("node {node} has an empty interval [{lft}, {rgt}]")]
    EmptyInterval {
        /// Offending row
        node: NodeId,
        /// Left boundary
        lft: i64,
        /// Right boundary
        rgt: i64,
    },

    /// No row at `lft = 1, level = 1`
    #[error("{group} has no root at lft = 1")]
    MissingRoot {
        /// Group without a root
        group: GroupId,
    },

    /// A second top-level interval in one group
    #[error("{group} has a second top-level node {node}")]
    MultipleRoots {
        /// Group being verified
        group: GroupId,
        /// Second top-level row
        node: NodeId,
    },

    /// Boundary value used twice or skipped
    #[error("{group} boundary values are not a contiguous sequence (at {value})")]
    BoundaryGap {
        /// Group being verified
        group: GroupId,
        /// First boundary value out of sequence
        value: i64,
    },

    /// Two intervals overlapping without nesting
    #[error("node {node} partially overlaps node {other}")]
    PartialOverlap {
        /// Row crossing the right boundary of its enclosing row
        node: NodeId,
        /// Enclosing row
        other: NodeId,
    },

    /// Level not one below the enclosing node
    #[error("node {node} has level {actual}, expected {expected}")]
    LevelMismatch {
        /// Offending row
        node: NodeId,
        /// Level implied by the enclosing row
        expected: u32,
        /// Stored level
        actual: u32,
    },

    /// Right boundary inconsistent with the descendant count
    #[error("node {node} has rgt {actual}, expected {expected} from its descendants")]
    WidthMismatch {
        /// Offending row
        node: NodeId,
        /// Right boundary implied by the descendants
        expected: i64,
        /// Stored right boundary
        actual: i64,
    },
}

/// Verify the rows of a single group.
///
/// An empty row set is a valid (absent) group.
pub fn verify_group<I>(group: GroupId, rows: I) -> Result<(), InvariantViolation>
where
    I: IntoIterator<Item = (NodeId, Bounds)>,
{
    let mut rows: Vec<(NodeId, Bounds)> = rows.into_iter().collect();
    if rows.is_empty() {
        return Ok(());
    }

    for (node, bounds) in &rows {
        if bounds.root != group {
            return Err(InvariantViolation::ForeignGroup {
                node: *node,
                expected: group,
                actual: bounds.root,
            });
        }
        if bounds.lft >= bounds.rgt {
            return Err(InvariantViolation::EmptyInterval {
                node: *node,
                lft: bounds.lft,
                rgt: bounds.rgt,
            });
        }
    }

    rows.sort_by_key(|(_, b)| b.lft);
    verify_contiguous(group, &rows)?;

    let (root_id, root) = rows[0];
    if root.lft != 1 || root.level != 1 {
        return Err(InvariantViolation::MissingRoot { group });
    }

    // Preorder walk keeping the chain of open ancestors.
    let mut open: Vec<(NodeId, Bounds)> = vec![(root_id, root)];
    for &(node, bounds) in &rows[1..] {
        while open.last().is_some_and(|(_, parent)| parent.rgt < bounds.lft) {
            open.pop();
        }
        let Some(&(parent_id, parent)) = open.last() else {
            return Err(InvariantViolation::MultipleRoots { group, node });
        };
        if bounds.rgt > parent.rgt {
            return Err(InvariantViolation::PartialOverlap {
                node,
                other: parent_id,
            });
        }
        if bounds.level != parent.level + 1 {
            return Err(InvariantViolation::LevelMismatch {
                node,
                expected: parent.level + 1,
                actual: bounds.level,
            });
        }
        open.push((node, bounds));
    }

    let lefts: Vec<i64> = rows.iter().map(|(_, b)| b.lft).collect();
    for (index, (node, bounds)) in rows.iter().enumerate() {
        let end = lefts.partition_point(|lft| *lft < bounds.rgt);
        let descendants = (end - index - 1) as i64;
        let expected = bounds.lft + 2 * descendants + 1;
        if bounds.rgt != expected {
            return Err(InvariantViolation::WidthMismatch {
                node: *node,
                expected,
                actual: bounds.rgt,
            });
        }
    }

    Ok(())
}

fn verify_contiguous(group: GroupId, rows: &[(NodeId, Bounds)]) -> Result<(), InvariantViolation> {
    let values: BTreeSet<i64> = rows
        .iter()
        .flat_map(|(_, b)| [b.lft, b.rgt])
        .collect();
    let expected_len = rows.len() * 2;
    if values.len() != expected_len {
        // Some value appears twice; report the first repeated one.
        let mut seen = BTreeSet::new();
        for value in rows.iter().flat_map(|(_, b)| [b.lft, b.rgt]) {
            if !seen.insert(value) {
                return Err(InvariantViolation::BoundaryGap { group, value });
            }
        }
    }
    for (expected, value) in (1_i64..).zip(values.iter()) {
        if *value != expected {
            return Err(InvariantViolation::BoundaryGap {
                group,
                value: expected,
            });
        }
    }
    Ok(())
}

/// Verify every group present in `nodes`.
pub fn verify_forest<'a, T: 'a, I>(nodes: I) -> Result<(), InvariantViolation>
where
    I: IntoIterator<Item = &'a TreeNode<T>>,
{
    let mut groups: BTreeMap<GroupId, Vec<(NodeId, Bounds)>> = BTreeMap::new();
    for node in nodes {
        groups
            .entry(node.bounds.root)
            .or_default()
            .push((node.id, node.bounds));
    }
    for (group, rows) in groups {
        verify_group(group, rows)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const G: GroupId = GroupId::FIRST;

    fn row(id: u64, lft: i64, rgt: i64, level: u32) -> (NodeId, Bounds) {
        (
            NodeId(id),
            Bounds {
                lft,
                rgt,
                level,
                root: G,
            },
        )
    }

    #[test]
    fn test_valid_tree_passes() {
        let rows = vec![
            row(1, 1, 8, 1),
            row(2, 2, 5, 2),
            row(3, 3, 4, 3),
            row(4, 6, 7, 2),
        ];
        assert_eq!(verify_group(G, rows), Ok(()));
        assert_eq!(verify_group(G, Vec::new()), Ok(()));
    }

    #[test]
    fn test_partial_overlap_detected() {
        let rows = vec![row(1, 1, 8, 1), row(2, 2, 4, 2), row(3, 3, 6, 3), row(4, 5, 7, 2)];
        assert!(matches!(
            verify_group(G, rows),
            Err(InvariantViolation::PartialOverlap { .. })
        ));
    }

    #[test]
    fn test_level_mismatch_detected() {
        let rows = vec![row(1, 1, 4, 1), row(2, 2, 3, 3)];
        assert_eq!(
            verify_group(G, rows),
            Err(InvariantViolation::LevelMismatch {
                node: NodeId(2),
                expected: 2,
                actual: 3
            })
        );
    }

    #[test]
    fn test_gap_detected() {
        let rows = vec![row(1, 1, 6, 1), row(2, 2, 3, 2)];
        assert!(matches!(
            verify_group(G, rows),
            Err(InvariantViolation::BoundaryGap { .. })
        ));
    }

    #[test]
    fn test_second_root_detected() {
        let rows = vec![row(1, 1, 2, 1), row(2, 3, 4, 1)];
        assert_eq!(
            verify_group(G, rows),
            Err(InvariantViolation::MultipleRoots {
                group: G,
                node: NodeId(2)
            })
        );
    }

    #[test]
    fn test_missing_root_detected() {
        let rows = vec![row(1, 1, 2, 2)];
        assert_eq!(
            verify_group(G, rows),
            Err(InvariantViolation::MissingRoot { group: G })
        );
    }
}
