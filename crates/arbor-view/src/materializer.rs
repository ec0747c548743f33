//! Tree materializer
//!
//! Expands a starting point into nested [`MaterializedNode`]s (the fancytree
//! shape) or into a flat, indented option list. Both modes walk the tree
//! through child queries, so an optional query filter sees, and may reshape,
//! every query issued at every depth.
//!
//! Depth is a budget of levels to descend, spent one per step into children.
//! A node or id start keeps the full budget for itself, so `Some(0)` renders
//! it as a leaf and `Some(n)` adds `n` levels below it. Starting from all
//! roots steps down from the synthetic level above them: `Some(0)` renders
//! nothing and `Some(n)` renders `n` levels. A node reached with an exhausted
//! budget is rendered as a leaf without querying its children.

use crate::tree_view::{self, Selection, TreeViewNode};
use arbor_core::config::{DEFAULT_SPACER, DEFAULT_SPACER_ARROW};
use arbor_core::effects::TreeReadEffects;
use arbor_core::{NodeId, NodeQuery, Result, Titled, TreeConfig, TreeNode};
use indexmap::IndexMap;
use serde::Serialize;
use std::marker::PhantomData;
use tracing::debug;

/// Caller transformation applied to every query before it runs
pub type QueryFilter<'a, T> = &'a dyn Fn(NodeQuery<T>) -> NodeQuery<T>;

/// Caller-supplied option title
pub type TitleFn<'a, T> = &'a dyn Fn(&TreeNode<T>) -> String;

/// Where materialization starts
#[derive(Debug, Clone)]
pub enum Start<T> {
    /// Every root, in group order
    AllRoots,
    /// An already loaded node
    Node(TreeNode<T>),
    /// A node looked up by identity (the filter applies to the lookup)
    Id(NodeId),
}

impl<T> Start<T> {
    /// Start from a raw identity where `0` stands for all roots
    pub fn from_raw(id: u64) -> Self {
        if id == 0 {
            Start::AllRoots
        } else {
            Start::Id(NodeId(id))
        }
    }
}

impl<T> Default for Start<T> {
    fn default() -> Self {
        Start::AllRoots
    }
}

impl<T> From<NodeId> for Start<T> {
    fn from(id: NodeId) -> Self {
        Start::from_raw(id.0)
    }
}

impl<T> From<TreeNode<T>> for Start<T> {
    fn from(node: TreeNode<T>) -> Self {
        Start::Node(node)
    }
}

/// Remaining depth budget; `None` is unbounded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DepthLimit(pub Option<u32>);

impl DepthLimit {
    /// No bound
    pub const UNBOUNDED: DepthLimit = DepthLimit(None);

    /// At most `levels` levels
    pub fn levels(levels: u32) -> Self {
        DepthLimit(Some(levels))
    }

    /// Whether nothing more may be rendered
    pub fn is_exhausted(self) -> bool {
        self.0 == Some(0)
    }

    /// Budget one level further down
    pub fn descend(self) -> Self {
        DepthLimit(self.0.map(|levels| levels.saturating_sub(1)))
    }
}

/// One node of the nested form
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MaterializedNode {
    /// Node identity
    pub key: NodeId,
    /// Node title
    pub title: String,
    /// Whether the node has rendered children
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub folder: bool,
    /// Rendered children in tree order
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<MaterializedNode>,
}

impl MaterializedNode {
    fn leaf(key: NodeId, title: String) -> Self {
        Self {
            key,
            title,
            folder: false,
            children: Vec::new(),
        }
    }
}

/// Settings of [`TreeMaterializer::options`]
pub struct OptionsSettings<'a, T> {
    /// Starting point
    pub start: Start<T>,
    /// Depth budget
    pub depth: DepthLimit,
    /// Query filter
    pub filter: Option<QueryFilter<'a, T>>,
    /// Title override; [`Titled::title`] otherwise
    pub title_fn: Option<TitleFn<'a, T>>,
    /// Levels removed from the indentation
    pub subtract_level: u32,
    /// Indentation unit; the configured spacer otherwise
    pub spacer: Option<String>,
    /// Marker after the indentation of non-top nodes; the configured arrow otherwise
    pub spacer_arrow: Option<String>,
}

impl<T> Default for OptionsSettings<'_, T> {
    fn default() -> Self {
        Self {
            start: Start::AllRoots,
            depth: DepthLimit::UNBOUNDED,
            filter: None,
            title_fn: None,
            subtract_level: 0,
            spacer: None,
            spacer_arrow: None,
        }
    }
}

impl<'a, T> OptionsSettings<'a, T> {
    /// Start from `start`
    pub fn starting_at(start: impl Into<Start<T>>) -> Self {
        Self {
            start: start.into(),
            ..Self::default()
        }
    }

    /// Limit the depth
    pub fn depth(mut self, depth: DepthLimit) -> Self {
        self.depth = depth;
        self
    }

    /// Filter every query
    pub fn filter(mut self, filter: QueryFilter<'a, T>) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Override option titles
    pub fn title_fn(mut self, title_fn: TitleFn<'a, T>) -> Self {
        self.title_fn = Some(title_fn);
        self
    }

    /// Remove `levels` from the indentation
    pub fn subtract_level(mut self, levels: u32) -> Self {
        self.subtract_level = levels;
        self
    }

    /// Override spacer and arrow
    pub fn spacers(mut self, spacer: impl Into<String>, arrow: impl Into<String>) -> Self {
        self.spacer = Some(spacer.into());
        self.spacer_arrow = Some(arrow.into());
        self
    }
}

/// Result of [`TreeMaterializer::children_tree`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ChildrenTree {
    /// Nested form
    Nested(Vec<MaterializedNode>),
    /// Tree-view form
    TreeView(Vec<TreeViewNode>),
}

/// Read-only expansion of stored trees into view structures
pub struct TreeMaterializer<'s, T, S> {
    storage: &'s S,
    spacer: String,
    spacer_arrow: String,
    _payload: PhantomData<fn() -> T>,
}

struct Walk<'a, T> {
    filter: Option<QueryFilter<'a, T>>,
}

impl<T> Walk<'_, T> {
    fn apply(&self, query: NodeQuery<T>) -> NodeQuery<T> {
        match self.filter {
            Some(filter) => filter(query),
            None => query,
        }
    }
}

struct OptionStyle<'a, T> {
    title_fn: Option<TitleFn<'a, T>>,
    subtract_level: i64,
    spacer: &'a str,
    spacer_arrow: &'a str,
}

impl<'s, T, S> TreeMaterializer<'s, T, S>
where
    T: Titled + Clone + Send + Sync,
    S: TreeReadEffects<T>,
{
    /// Materializer with the default spacers
    pub fn new(storage: &'s S) -> Self {
        Self {
            storage,
            spacer: DEFAULT_SPACER.to_string(),
            spacer_arrow: DEFAULT_SPACER_ARROW.to_string(),
            _payload: PhantomData,
        }
    }

    /// Materializer with the spacers of `config`
    pub fn with_config(storage: &'s S, config: &TreeConfig) -> Self {
        Self {
            storage,
            spacer: config.spacer.clone(),
            spacer_arrow: config.spacer_arrow.clone(),
            _payload: PhantomData,
        }
    }

    /// Starting nodes with the budget each one is rendered with
    fn start_nodes(
        &self,
        start: Start<T>,
        depth: DepthLimit,
        walk: &Walk<'_, T>,
    ) -> Result<(Vec<TreeNode<T>>, DepthLimit)> {
        Ok(match start {
            Start::AllRoots if depth.is_exhausted() => (Vec::new(), depth),
            Start::AllRoots => (
                self.storage.find_all(&walk.apply(NodeQuery::roots()))?,
                depth.descend(),
            ),
            Start::Node(node) => (vec![node], depth),
            Start::Id(id) => (
                self.storage
                    .find_one(&walk.apply(NodeQuery::by_id(id)))?
                    .into_iter()
                    .collect(),
                depth,
            ),
        })
    }

    fn children_of(&self, node: &TreeNode<T>, walk: &Walk<'_, T>) -> Result<Vec<TreeNode<T>>> {
        Ok(self
            .storage
            .find_all(&walk.apply(NodeQuery::children_of(&node.bounds)))?)
    }

    /// Nested forest starting at `start`
    pub fn data_tree(
        &self,
        start: Start<T>,
        depth: DepthLimit,
        filter: Option<QueryFilter<'_, T>>,
    ) -> Result<Vec<MaterializedNode>> {
        debug!(?depth, filtered = filter.is_some(), "materializing nested tree");
        let walk = Walk { filter };
        let (nodes, remaining) = self.start_nodes(start, depth, &walk)?;
        let mut forest = IndexMap::new();
        for node in nodes {
            let key = node.id;
            let rendered = self.render(node, remaining, &walk)?;
            forest.entry(key).or_insert(rendered);
        }
        Ok(forest.into_values().collect())
    }

    fn render(
        &self,
        node: TreeNode<T>,
        remaining: DepthLimit,
        walk: &Walk<'_, T>,
    ) -> Result<MaterializedNode> {
        let mut rendered = MaterializedNode::leaf(node.id, node.data.title().to_string());
        if remaining.is_exhausted() {
            return Ok(rendered);
        }

        let mut children = IndexMap::new();
        for child in self.children_of(&node, walk)? {
            let key = child.id;
            let child = self.render(child, remaining.descend(), walk)?;
            children.entry(key).or_insert(child);
        }
        if !children.is_empty() {
            rendered.folder = true;
            rendered.children = children.into_values().collect();
        }
        Ok(rendered)
    }

    /// Flat, indented option list keyed by identity in tree order
    pub fn options(&self, settings: OptionsSettings<'_, T>) -> Result<IndexMap<NodeId, String>> {
        let OptionsSettings {
            start,
            depth,
            filter,
            title_fn,
            subtract_level,
            spacer,
            spacer_arrow,
        } = settings;
        debug!(?depth, subtract_level, "materializing options");

        let mut options = IndexMap::new();
        let walk = Walk { filter };
        let style = OptionStyle {
            title_fn,
            subtract_level: i64::from(subtract_level),
            spacer: spacer.as_deref().unwrap_or(self.spacer.as_str()),
            spacer_arrow: spacer_arrow
                .as_deref()
                .unwrap_or(self.spacer_arrow.as_str()),
        };
        let (nodes, remaining) = self.start_nodes(start, depth, &walk)?;
        for node in nodes {
            self.collect_option(&node, remaining, &walk, &style, &mut options)?;
        }
        Ok(options)
    }

    fn collect_option(
        &self,
        node: &TreeNode<T>,
        remaining: DepthLimit,
        walk: &Walk<'_, T>,
        style: &OptionStyle<'_, T>,
        options: &mut IndexMap<NodeId, String>,
    ) -> Result<()> {
        let level = i64::from(node.level()) - style.subtract_level;
        if let Ok(indent) = usize::try_from(level - 1) {
            let mut label = style.spacer.repeat(indent);
            if level > 1 {
                label.push_str(style.spacer_arrow);
            }
            match style.title_fn {
                Some(title_fn) => label.push_str(&title_fn(node)),
                None => label.push_str(node.data.title()),
            }
            options.entry(node.id).or_insert(label);
        }

        if remaining.is_exhausted() {
            return Ok(());
        }
        for child in self.children_of(node, walk)? {
            self.collect_option(&child, remaining.descend(), walk, style, options)?;
        }
        Ok(())
    }

    /// Children of the first root, nested or converted for a tree view
    pub fn children_tree(&self, as_nested: bool, selection: &Selection) -> Result<ChildrenTree> {
        let children = self
            .data_tree(Start::AllRoots, DepthLimit::UNBOUNDED, None)?
            .into_iter()
            .next()
            .map(|root| root.children)
            .unwrap_or_default();
        Ok(if as_nested {
            ChildrenTree::Nested(children)
        } else {
            ChildrenTree::TreeView(tree_view::convert(&children, selection))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_depth_limit_steps() {
        let limit = DepthLimit::levels(2);
        assert!(!limit.is_exhausted());
        assert!(limit.descend().descend().is_exhausted());
        assert_eq!(DepthLimit::UNBOUNDED.descend(), DepthLimit::UNBOUNDED);
        assert!(DepthLimit::levels(0).descend().is_exhausted());
    }

    #[test]
    fn test_raw_start() {
        assert!(matches!(Start::<String>::from_raw(0), Start::AllRoots));
        assert!(matches!(Start::<String>::from(NodeId(4)), Start::Id(NodeId(4))));
    }

    #[test]
    fn test_leaf_serialization_omits_folder_fields() {
        let leaf = MaterializedNode::leaf(NodeId(3), "Leaf".into());
        assert_eq!(
            serde_json::to_value(&leaf).unwrap(),
            serde_json::json!({"key": 3, "title": "Leaf"})
        );
    }
}
