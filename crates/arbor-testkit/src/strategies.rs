//! Property test strategies
//!
//! Operations are generated against *indices* rather than identities: the
//! driver resolves `pick % live_rows` when the operation runs, so every
//! generated sequence is applicable to whatever forest the previous steps
//! produced.

use crate::builders::TreeBuilder;
use arbor_core::Placement;
use proptest::prelude::*;

// Re-export proptest for convenience
pub use proptest;

/// One generated tree operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeOp {
    /// Create a new root
    CreateRoot,
    /// Insert a new node relative to the picked row
    Insert {
        /// Index of the target among live rows
        target: usize,
        /// Placement against the target
        placement: Placement,
    },
    /// Move the picked subject relative to the picked target
    Move {
        /// Index of the subject among live rows
        subject: usize,
        /// Index of the target among live rows
        target: usize,
        /// Placement against the target
        placement: Placement,
    },
    /// Move the picked row into a new group
    MoveAsRoot {
        /// Index of the subject among live rows
        subject: usize,
    },
    /// Delete the picked row with its subtree
    Delete {
        /// Index of the subject among live rows
        subject: usize,
    },
}

/// Strategy for placements
pub fn arb_placement() -> impl Strategy<Value = Placement> {
    prop_oneof![
        Just(Placement::FirstChild),
        Just(Placement::LastChild),
        Just(Placement::Before),
        Just(Placement::After),
    ]
}

/// Strategy for a single operation, weighted towards growth
pub fn arb_tree_op() -> impl Strategy<Value = TreeOp> {
    let pick = 0usize..64;
    prop_oneof![
        1 => Just(TreeOp::CreateRoot),
        4 => (pick.clone(), arb_placement())
            .prop_map(|(target, placement)| TreeOp::Insert { target, placement }),
        4 => (pick.clone(), pick.clone(), arb_placement()).prop_map(|(subject, target, placement)| {
            TreeOp::Move {
                subject,
                target,
                placement,
            }
        }),
        1 => pick.clone().prop_map(|subject| TreeOp::MoveAsRoot { subject }),
        1 => pick.prop_map(|subject| TreeOp::Delete { subject }),
    ]
}

/// Strategy for operation sequences of up to `max_len` steps
pub fn arb_tree_ops(max_len: usize) -> impl Strategy<Value = Vec<TreeOp>> {
    prop::collection::vec(arb_tree_op(), 1..=max_len)
}

/// Strategy for single trees of up to `max_nodes` nodes
pub fn arb_outline(max_nodes: usize) -> impl Strategy<Value = TreeBuilder> {
    prop::collection::vec(any::<usize>(), 0..max_nodes)
        .prop_map(|picks| TreeBuilder::from_parent_picks(&picks))
}
