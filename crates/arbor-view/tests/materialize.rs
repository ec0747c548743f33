//! Materialization over stored trees

use arbor_core::{NodeId, NodeQuery, TreeConfig, TreeNode};
use arbor_effects::MemoryTreeStorage;
use arbor_testkit::{arb_outline, find_by_title, Item, TreeBuilder};
use arbor_view::{
    ChildrenTree, DepthLimit, MaterializedNode, OptionsSettings, Selection, Start,
    TreeMaterializer, MAIN_SELECTION, MAIN_TAG,
};
use proptest::prelude::*;

/// R > (A > (A1, A2), B); S > (S1)
fn forest() -> MemoryTreeStorage<Item> {
    TreeBuilder::new()
        .root("R", |r| {
            r.child("A", |a| {
                a.leaf("A1").leaf("A2");
            })
            .leaf("B");
        })
        .root("S", |s| {
            s.leaf("S1");
        })
        .build_items()
}

fn titles(nodes: &[MaterializedNode]) -> Vec<&str> {
    nodes.iter().map(|n| n.title.as_str()).collect()
}

fn labels(options: &indexmap::IndexMap<NodeId, String>) -> Vec<&str> {
    options.values().map(String::as_str).collect()
}

fn nesting(nodes: &[MaterializedNode]) -> u32 {
    nodes
        .iter()
        .map(|n| 1 + nesting(&n.children))
        .max()
        .unwrap_or(0)
}

#[test]
fn data_tree_marks_folders() {
    let storage = forest();
    let view = TreeMaterializer::new(&storage);
    let tree = view
        .data_tree(Start::AllRoots, DepthLimit::UNBOUNDED, None)
        .unwrap();

    assert_eq!(titles(&tree), vec!["R", "S"]);
    assert!(tree[0].folder);
    assert_eq!(titles(&tree[0].children), vec!["A", "B"]);
    assert_eq!(titles(&tree[0].children[0].children), vec!["A1", "A2"]);
    let b = &tree[0].children[1];
    assert!(!b.folder && b.children.is_empty());

    let json = serde_json::to_value(&tree[1]).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "key": find_by_title(&storage, "S").id,
            "title": "S",
            "folder": true,
            "children": [{"key": find_by_title(&storage, "S1").id, "title": "S1"}]
        })
    );
}

#[test]
fn all_roots_depth_counts_the_root_level() {
    let storage = forest();
    let view = TreeMaterializer::new(&storage);

    assert!(view
        .data_tree(Start::AllRoots, DepthLimit::levels(0), None)
        .unwrap()
        .is_empty());

    let roots_only = view
        .data_tree(Start::AllRoots, DepthLimit::levels(1), None)
        .unwrap();
    assert_eq!(titles(&roots_only), vec!["R", "S"]);
    assert!(roots_only.iter().all(|n| !n.folder));

    let two = view
        .data_tree(Start::AllRoots, DepthLimit::levels(2), None)
        .unwrap();
    assert_eq!(titles(&two[0].children), vec!["A", "B"]);
    assert!(!two[0].children[0].folder);
}

#[test]
fn node_start_keeps_its_own_level() {
    let storage = forest();
    let view = TreeMaterializer::new(&storage);
    let a = find_by_title(&storage, "A").id;

    let leaf = view
        .data_tree(Start::Id(a), DepthLimit::levels(0), None)
        .unwrap();
    assert_eq!(titles(&leaf), vec!["A"]);
    assert!(!leaf[0].folder && leaf[0].children.is_empty());

    let one_below = view
        .data_tree(Start::Id(a), DepthLimit::levels(1), None)
        .unwrap();
    assert!(one_below[0].folder);
    assert_eq!(titles(&one_below[0].children), vec!["A1", "A2"]);

    let root = find_by_title(&storage, "R");
    let from_node = view
        .data_tree(Start::Node(root), DepthLimit::levels(1), None)
        .unwrap();
    assert_eq!(titles(&from_node[0].children), vec!["A", "B"]);
    assert!(from_node[0].children.iter().all(|n| !n.folder));

    let options = view
        .options(OptionsSettings::starting_at(a).depth(DepthLimit::levels(1)))
        .unwrap();
    assert_eq!(labels(&options), vec!["—›A", "——›A1", "——›A2"]);
    let only_a = view
        .options(OptionsSettings::starting_at(a).depth(DepthLimit::levels(0)))
        .unwrap();
    assert_eq!(labels(&only_a), vec!["—›A"]);
}

#[test]
fn filter_applies_at_every_depth_and_to_lookups() {
    let storage = MemoryTreeStorage::from_rows(
        TreeBuilder::new()
            .root("R", |r| {
                r.child("A", |a| {
                    a.leaf("A1").leaf("hidden A2");
                })
                .leaf("hidden B");
            })
            .rows(|title| {
                if title.starts_with("hidden") {
                    Item::inactive(title)
                } else {
                    Item::new(title)
                }
            }),
    );
    let view = TreeMaterializer::new(&storage);
    let active_only =
        |query: NodeQuery<Item>| query.and_where(|n: &TreeNode<Item>| n.data.active);

    let tree = view
        .data_tree(Start::AllRoots, DepthLimit::UNBOUNDED, Some(&active_only))
        .unwrap();
    assert_eq!(titles(&tree[0].children), vec!["A"]);
    assert_eq!(titles(&tree[0].children[0].children), vec!["A1"]);

    let hidden = find_by_title(&storage, "hidden B").id;
    assert!(view
        .data_tree(Start::Id(hidden), DepthLimit::UNBOUNDED, Some(&active_only))
        .unwrap()
        .is_empty());
}

#[test]
fn options_indent_by_level() {
    let storage = TreeBuilder::new()
        .root("R1", |r| {
            r.leaf("c1");
        })
        .root("R2", |r| {
            r.leaf("c2");
        })
        .build_items();
    let view = TreeMaterializer::new(&storage);

    let options = view
        .options(OptionsSettings::default().spacers("-", ">"))
        .unwrap();
    assert_eq!(labels(&options), vec!["R1", "->c1", "R2", "->c2"]);
    let keys: Vec<NodeId> = options.keys().copied().collect();
    assert_eq!(
        keys,
        vec![
            find_by_title(&storage, "R1").id,
            find_by_title(&storage, "c1").id,
            find_by_title(&storage, "R2").id,
            find_by_title(&storage, "c2").id,
        ]
    );
}

#[test]
fn options_use_configured_spacers() {
    let storage = forest();
    let config = TreeConfig {
        spacer: "..".into(),
        spacer_arrow: "|".into(),
        ..TreeConfig::default()
    };
    let view = TreeMaterializer::with_config(&storage, &config);
    let options = view
        .options(OptionsSettings::starting_at(find_by_title(&storage, "A")))
        .unwrap();
    assert_eq!(labels(&options), vec!["..|A", "....|A1", "....|A2"]);

    let defaults = TreeMaterializer::new(&storage)
        .options(OptionsSettings::starting_at(find_by_title(&storage, "A1").id))
        .unwrap();
    assert_eq!(labels(&defaults), vec!["——›A1"]);
}

#[test]
fn options_subtract_level_skips_negative_levels() {
    let storage = forest();
    let view = TreeMaterializer::new(&storage);
    let options = view
        .options(
            OptionsSettings::default()
                .spacers("-", ">")
                .subtract_level(1),
        )
        .unwrap();
    // Roots fall below zero and are omitted; their descendants remain.
    assert_eq!(labels(&options), vec!["A", "->A1", "->A2", "B", "S1"]);
}

#[test]
fn options_title_callback_and_depth() {
    let storage = forest();
    let view = TreeMaterializer::new(&storage);
    let shout = |node: &TreeNode<Item>| node.data.title.to_uppercase();
    let options = view
        .options(
            OptionsSettings::default()
                .spacers("-", ">")
                .depth(DepthLimit::levels(2))
                .title_fn(&shout),
        )
        .unwrap();
    assert_eq!(labels(&options), vec!["R", "->A", "->B", "S", "->S1"]);

    assert!(view
        .options(OptionsSettings::default().depth(DepthLimit::levels(0)))
        .unwrap()
        .is_empty());
}

#[test]
fn node_reached_twice_keeps_first_position() {
    let storage = forest();
    let view = TreeMaterializer::new(&storage);
    // Dropping the level bound turns every child query into a descendant query.
    let widen = |query: NodeQuery<Item>| query.retain(|c| !c.is_level_bound());

    let options = view
        .options(
            OptionsSettings::default()
                .spacers("-", ">")
                .filter(&widen),
        )
        .unwrap();
    assert_eq!(
        labels(&options),
        vec!["R", "->A", "-->A1", "-->A2", "->B", "S", "->S1"]
    );

    let tree = view
        .data_tree(Start::AllRoots, DepthLimit::UNBOUNDED, Some(&widen))
        .unwrap();
    assert_eq!(titles(&tree[0].children), vec!["A", "A1", "A2", "B"]);
    assert_eq!(titles(&tree[0].children[0].children), vec!["A1", "A2"]);
}

#[test]
fn children_tree_of_first_root() {
    let storage = forest();
    let view = TreeMaterializer::new(&storage);
    let a1 = find_by_title(&storage, "A1").id;
    let b = find_by_title(&storage, "B").id;
    let selection = Selection::from([(a1, MAIN_SELECTION), (b, 3)]);

    let ChildrenTree::Nested(nested) = view.children_tree(true, &selection).unwrap() else {
        panic!("expected the nested form");
    };
    assert_eq!(titles(&nested), vec!["A", "B"]);

    let ChildrenTree::TreeView(nodes) = view.children_tree(false, &selection).unwrap() else {
        panic!("expected the tree-view form");
    };
    assert_eq!(nodes.len(), 2);
    assert_eq!(nodes[0].text, "A");
    assert_eq!(nodes[0].state.checked, None);
    let a_children = nodes[0].nodes.as_ref().unwrap();
    assert_eq!(a_children[0].href, a1);
    assert_eq!(a_children[0].tags, vec![MAIN_TAG]);
    assert_eq!(nodes[1].state.checked, Some(true));
    assert!(nodes[1].tags.is_empty());
    assert!(nodes[1].nodes.is_none());
}

#[test]
fn children_tree_of_empty_storage() {
    let storage: MemoryTreeStorage<Item> = MemoryTreeStorage::new();
    let view = TreeMaterializer::new(&storage);
    assert_eq!(
        view.children_tree(true, &Selection::new()).unwrap(),
        ChildrenTree::Nested(Vec::new())
    );
}

proptest! {
    #[test]
    fn depth_bound_is_respected(outline in arb_outline(40), levels in 0u32..6) {
        let storage = outline.build_items();
        let view = TreeMaterializer::new(&storage);

        let bounded = view
            .data_tree(Start::AllRoots, DepthLimit::levels(levels), None)
            .unwrap();
        prop_assert!(nesting(&bounded) <= levels);

        let full = view
            .data_tree(Start::AllRoots, DepthLimit::UNBOUNDED, None)
            .unwrap();
        fn count(nodes: &[MaterializedNode]) -> usize {
            nodes.iter().map(|n| 1 + count(&n.children)).sum()
        }
        fn folders_consistent(nodes: &[MaterializedNode]) -> bool {
            nodes
                .iter()
                .all(|n| n.folder == !n.children.is_empty() && folders_consistent(&n.children))
        }
        prop_assert_eq!(count(&full), storage.len());
        prop_assert!(folders_consistent(&full));

        let options = view.options(OptionsSettings::default()).unwrap();
        prop_assert_eq!(options.len(), storage.len());
    }
}
