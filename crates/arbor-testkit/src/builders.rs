//! Outline builder
//!
//! Describes a forest as nested closures and numbers it into nested-set rows:
//!
//! ```rust
//! use arbor_testkit::TreeBuilder;
//!
//! let storage = TreeBuilder::new()
//!     .root("R", |r| {
//!         r.child("A", |a| {
//!             a.leaf("A1");
//!         })
//!         .leaf("B");
//!     })
//!     .build();
//! assert_eq!(storage.len(), 4);
//! ```
//!
//! Identities are assigned in preorder across the whole forest starting at 1,
//! and each root gets the next group.

use crate::fixtures::Item;
use arbor_core::{Bounds, GroupId, NodeId, TreeNode};
use arbor_effects::MemoryTreeStorage;

/// One node of an outline
#[derive(Debug, Clone, Default)]
pub struct OutlineNode {
    title: String,
    children: Vec<OutlineNode>,
}

impl OutlineNode {
    fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            children: Vec::new(),
        }
    }

    /// Add a child with its own children
    pub fn child<F>(&mut self, title: &str, describe: F) -> &mut Self
    where
        F: FnOnce(&mut OutlineNode),
    {
        let mut child = OutlineNode::new(title);
        describe(&mut child);
        self.children.push(child);
        self
    }

    /// Add a childless child
    pub fn leaf(&mut self, title: &str) -> &mut Self {
        self.children.push(OutlineNode::new(title));
        self
    }
}

/// Builder for pre-populated storages
#[derive(Debug, Clone, Default)]
pub struct TreeBuilder {
    roots: Vec<OutlineNode>,
}

impl TreeBuilder {
    /// Empty forest
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tree
    pub fn root<F>(mut self, title: &str, describe: F) -> Self
    where
        F: FnOnce(&mut OutlineNode),
    {
        let mut root = OutlineNode::new(title);
        describe(&mut root);
        self.roots.push(root);
        self
    }

    /// Single tree where node `i` (titled `n{i}`) hangs under node
    /// `picks[i - 1] % i`; node 0 is the root
    pub fn from_parent_picks(picks: &[usize]) -> Self {
        let count = picks.len() + 1;
        let mut children: Vec<Vec<usize>> = vec![Vec::new(); count];
        for (offset, pick) in picks.iter().enumerate() {
            let node = offset + 1;
            children[pick % node].push(node);
        }

        fn assemble(index: usize, children: &[Vec<usize>]) -> OutlineNode {
            OutlineNode {
                title: format!("n{index}"),
                children: children[index]
                    .iter()
                    .map(|child| assemble(*child, children))
                    .collect(),
            }
        }

        Self {
            roots: vec![assemble(0, &children)],
        }
    }

    /// Number the outline into rows, mapping titles to payloads
    pub fn rows<T, F>(&self, payload: F) -> Vec<TreeNode<T>>
    where
        F: Fn(&str) -> T,
    {
        let mut rows = Vec::new();
        let mut next_id = 1;
        for (index, root) in self.roots.iter().enumerate() {
            let group = GroupId(index as u64 + 1);
            number(root, 1, 1, group, &mut next_id, &payload, &mut rows);
        }
        rows
    }

    /// Storage holding `String` payloads
    pub fn build(&self) -> MemoryTreeStorage<String> {
        MemoryTreeStorage::from_rows(self.rows(str::to_string))
    }

    /// Storage holding [`Item`] payloads
    pub fn build_items(&self) -> MemoryTreeStorage<Item> {
        MemoryTreeStorage::from_rows(self.rows(Item::new))
    }
}

/// Assign bounds in preorder; returns the right boundary of `node`
fn number<T, F>(
    node: &OutlineNode,
    lft: i64,
    level: u32,
    group: GroupId,
    next_id: &mut u64,
    payload: &F,
    rows: &mut Vec<TreeNode<T>>,
) -> i64
where
    F: Fn(&str) -> T,
{
    let id = NodeId(*next_id);
    *next_id += 1;
    let slot = rows.len();
    rows.push(TreeNode::new(
        id,
        Bounds {
            lft,
            rgt: lft + 1,
            level,
            root: group,
        },
        payload(&node.title),
    ));

    let mut cursor = lft + 1;
    for child in &node.children {
        cursor = number(child, cursor, level + 1, group, next_id, payload, rows) + 1;
    }
    rows[slot].bounds.rgt = cursor;
    cursor
}
