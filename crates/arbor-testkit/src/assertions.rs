//! Structural assertions
//!
//! [`check_tree`] runs the invariant verifier over every committed row and
//! compares the `lft` order of each group with a depth-first walk built from
//! child queries. [`assert_tree_valid!`](crate::assert_tree_valid) wraps it
//! for use in tests.

use arbor_core::effects::TreeReadEffects;
use arbor_core::{verify_forest, GroupId, NodeId, NodeQuery, TreeNode};
use arbor_effects::MemoryTreeStorage;

/// Assert that a storage holds a well-formed forest
#[macro_export]
macro_rules! assert_tree_valid {
    ($storage:expr) => {
        if let Err(reason) = $crate::assertions::check_tree($storage) {
            panic!("tree is not well formed: {}", reason);
        }
    };
}

/// Identities of a group in depth-first order, walking child queries
pub fn depth_first_order<T, S>(storage: &S, group: GroupId) -> Vec<NodeId>
where
    S: TreeReadEffects<T>,
{
    fn walk<T, S: TreeReadEffects<T>>(storage: &S, node: &TreeNode<T>, out: &mut Vec<NodeId>) {
        out.push(node.id);
        let children = storage
            .find_all(&NodeQuery::children_of(&node.bounds))
            .unwrap();
        for child in &children {
            walk(storage, child, out);
        }
    }

    let mut out = Vec::new();
    let root = storage
        .find_one(&NodeQuery::group(group).and(arbor_core::Condition::Left(1)))
        .unwrap();
    if let Some(root) = root {
        walk(storage, &root, &mut out);
    }
    out
}

/// Verify invariants and preorder equivalence of every group
pub fn check_tree<T>(storage: &MemoryTreeStorage<T>) -> Result<(), String>
where
    T: Clone + Send + Sync,
{
    let rows = storage.snapshot();
    verify_forest(&rows).map_err(|violation| violation.to_string())?;

    let mut groups: Vec<GroupId> = rows.iter().map(TreeNode::group).collect();
    groups.dedup();
    for group in groups {
        let by_lft: Vec<NodeId> = rows
            .iter()
            .filter(|row| row.group() == group)
            .map(|row| row.id)
            .collect();
        let walked = depth_first_order::<T, _>(storage, group);
        if walked != by_lft {
            return Err(format!(
                "{group}: lft order {by_lft:?} differs from depth-first order {walked:?}"
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TreeBuilder;
    use arbor_core::{Bounds, GroupId};

    #[test]
    fn test_built_tree_is_valid() {
        let storage = TreeBuilder::new()
            .root("R", |r| {
                r.child("A", |a| {
                    a.leaf("A1").leaf("A2");
                })
                .leaf("B");
            })
            .root("S", |s| {
                s.leaf("S1");
            })
            .build();
        assert_tree_valid!(&storage);
    }

    #[test]
    fn test_broken_tree_is_reported() {
        let rows = vec![
            TreeNode::new(NodeId(1), Bounds::new_root(GroupId::FIRST), "R".to_string()),
            TreeNode::new(
                NodeId(2),
                Bounds {
                    lft: 2,
                    rgt: 3,
                    level: 2,
                    root: GroupId::FIRST,
                },
                "orphan".to_string(),
            ),
        ];
        let storage = MemoryTreeStorage::from_rows(rows);
        assert!(check_tree(&storage).is_err());
    }
}
