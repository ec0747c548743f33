//! Tree-view adapter
//!
//! Converts the nested form into the node list consumed by bootstrap-style
//! tree views, marking externally selected nodes.

use crate::materializer::MaterializedNode;
use arbor_core::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Selection value marking the main entry
pub const MAIN_SELECTION: i64 = 1;

/// Tag attached to the main entry
pub const MAIN_TAG: &str = "Is main";

/// Selected identities with their selection value
pub type Selection = HashMap<NodeId, i64>;

/// Display state of a tree-view node
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeViewState {
    /// Set when the node is selected
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checked: Option<bool>,
}

/// One node of a tree view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeViewNode {
    /// Node identity
    pub href: NodeId,
    /// Node title
    pub text: String,
    /// Always false; selection is driven by the check state
    pub selectable: bool,
    /// Badges shown next to the title
    pub tags: Vec<String>,
    /// Check state
    pub state: TreeViewState,
    /// Children, present only for nodes that have some
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nodes: Option<Vec<TreeViewNode>>,
}

/// Convert nested nodes, preserving order
pub fn convert(nodes: &[MaterializedNode], selection: &Selection) -> Vec<TreeViewNode> {
    nodes
        .iter()
        .map(|node| {
            let mut view = TreeViewNode {
                href: node.key,
                text: node.title.clone(),
                selectable: false,
                tags: Vec::new(),
                state: TreeViewState::default(),
                nodes: None,
            };
            if let Some(value) = selection.get(&node.key) {
                view.state.checked = Some(true);
                if *value == MAIN_SELECTION {
                    view.tags.push(MAIN_TAG.to_string());
                }
            }
            if !node.children.is_empty() {
                view.nodes = Some(convert(&node.children, selection));
            }
            view
        })
        .collect()
}
