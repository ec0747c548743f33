//! Property tests: arbitrary operation sequences keep every group well formed

use arbor_core::{NodeQuery, TreeConfig, TreeError, TreeReadEffects};
use arbor_effects::MemoryTreeStorage;
use arbor_testkit::assertions::check_tree;
use arbor_testkit::{arb_tree_ops, Item, TreeOp};
use arbor_tree::TreeEngine;
use proptest::prelude::*;

type Engine<'s> = TreeEngine<'s, Item, MemoryTreeStorage<Item>>;

/// Apply one generated operation; `Ok(None)` when there was nothing to pick
fn run(engine: &Engine<'_>, op: TreeOp, step: usize) -> Result<Option<i64>, TreeError> {
    let live = engine.storage().snapshot();
    let pick = |index: usize| live[index % live.len()].id;
    let title = format!("n{step}");

    if live.is_empty() && !matches!(op, TreeOp::CreateRoot) {
        return Ok(None);
    }
    let delta = match op {
        TreeOp::CreateRoot => {
            engine.new_record(Item::new(&title)).create_root(true, None)?;
            1
        }
        TreeOp::Insert { target, placement } => {
            engine
                .new_record(Item::new(&title))
                .insert(pick(target), placement, true, None)?;
            1
        }
        TreeOp::Move {
            subject,
            target,
            placement,
        } => {
            engine.load(pick(subject))?.move_to(pick(target), placement)?;
            0
        }
        TreeOp::MoveAsRoot { subject } => {
            engine.load(pick(subject))?.move_as_root()?;
            0
        }
        TreeOp::Delete { subject } => -(engine.load(pick(subject))?.delete_node()? as i64),
    };
    Ok(Some(delta))
}

fn seeded(storage: &MemoryTreeStorage<Item>) {
    let engine = TreeEngine::new(storage, TreeConfig::default());
    let root = engine.new_record(Item::new("seed")).create_root(true, None).unwrap();
    engine
        .new_record(Item::new("seed child"))
        .append_to(root, true, None)
        .unwrap();
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn operation_sequences_preserve_invariants(ops in arb_tree_ops(24)) {
        let storage = MemoryTreeStorage::new();
        seeded(&storage);
        let engine = TreeEngine::new(&storage, TreeConfig::default().with_verification(true));

        for (step, op) in ops.into_iter().enumerate() {
            let before = storage.snapshot();
            match run(&engine, op, step) {
                Ok(Some(delta)) => {
                    prop_assert_eq!(storage.len() as i64, before.len() as i64 + delta);
                }
                Ok(None) => prop_assert!(before.is_empty()),
                Err(err) => {
                    prop_assert!(err.is_user_error(), "{:?} failed with {}", op, err);
                    prop_assert_eq!(storage.snapshot(), before);
                }
            }
            if let Err(reason) = check_tree(&storage) {
                prop_assert!(false, "after {:?}: {}", op, reason);
            }
        }
    }

    #[test]
    fn subtree_moves_keep_descendant_counts(ops in arb_tree_ops(16)) {
        let storage = MemoryTreeStorage::new();
        seeded(&storage);
        let engine = TreeEngine::new(&storage, TreeConfig::default().with_verification(true));

        for (step, op) in ops.into_iter().enumerate() {
            let TreeOp::Move { subject, .. } = op else {
                let _ = run(&engine, op, step);
                continue;
            };
            let live = storage.snapshot();
            if live.is_empty() {
                continue;
            }
            let id = live[subject % live.len()].id;
            let size_before = storage
                .find_one(&NodeQuery::by_id(id))
                .unwrap()
                .map(|n| n.bounds.descendant_count());
            if run(&engine, op, step).is_ok() {
                let size_after = storage
                    .find_one(&NodeQuery::by_id(id))
                    .unwrap()
                    .map(|n| n.bounds.descendant_count());
                prop_assert_eq!(size_before, size_after);
            }
        }
    }
}
