//! # Arbor View - Materialization
//!
//! **Purpose**: Read-only expansion of nested-set trees into the structures
//! front ends consume: a nested forest, a flat indented option list and a
//! tree-view node list with selection marks.
//!
//! # Architecture Constraints
//!
//! - YES queries through `arbor_core::TreeReadEffects` only
//! - YES caller query filters applied uniformly at every depth
//! - NO mutations (that's `arbor-tree`)

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Nested and option-list materialization
pub mod materializer;

/// Tree-view adapter
pub mod tree_view;

pub use materializer::{
    ChildrenTree, DepthLimit, MaterializedNode, OptionsSettings, QueryFilter, Start, TitleFn,
    TreeMaterializer,
};
pub use tree_view::{Selection, TreeViewNode, TreeViewState, MAIN_SELECTION, MAIN_TAG};
