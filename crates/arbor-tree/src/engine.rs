//! Tree engine
//!
//! [`TreeEngine`] binds a storage handler to a [`TreeConfig`]. It answers the
//! navigation queries (roots, children, descendants, ancestors, siblings) and
//! hands out [`NestedSet`] capabilities through which records are inserted,
//! moved and deleted.
//!
//! Every mutation runs through [`TreeEngine::mutate`]: the body computes a
//! boundary plan from rows read inside the transaction, applies it, and
//! reports the groups it touched. With `verify_invariants` enabled those groups
//! are re-checked before the transaction commits, so a faulty plan rolls back
//! instead of persisting a corrupt tree.

use crate::nested_set::NestedSet;
use arbor_core::effects::{TreeStorageEffects, TreeTransaction};
use arbor_core::{
    verify_group, BoundaryPlan, Condition, GroupId, NodeId, NodeQuery, Remap, Result,
    StorageError, TreeConfig, TreeNode,
};
use std::marker::PhantomData;
use tracing::{debug, info, warn};

/// Outcome of a mutation body: its value plus the groups it touched
pub(crate) struct Mutation<R> {
    pub(crate) value: R,
    pub(crate) groups: Vec<GroupId>,
    pub(crate) rows: usize,
}

/// Rows written by one applied plan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Applied {
    pub(crate) updated: usize,
    pub(crate) removed: usize,
}

/// Nested-set engine over a storage handler
pub struct TreeEngine<'s, T, S> {
    storage: &'s S,
    config: TreeConfig,
    _payload: PhantomData<fn() -> T>,
}

impl<'s, T, S> TreeEngine<'s, T, S>
where
    T: Clone + Send + Sync,
    S: TreeStorageEffects<T>,
{
    /// Create an engine over `storage`
    pub fn new(storage: &'s S, config: TreeConfig) -> Self {
        Self {
            storage,
            config,
            _payload: PhantomData,
        }
    }

    /// Storage handler the engine operates on
    pub fn storage(&self) -> &'s S {
        self.storage
    }

    /// Engine configuration
    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    /// Capability for a record that has not been persisted yet
    pub fn new_record(&self, data: T) -> NestedSet<'_, 's, T, S> {
        NestedSet::new_record(self, data)
    }

    /// Capability for an existing record
    pub fn load(&self, id: NodeId) -> Result<NestedSet<'_, 's, T, S>> {
        let node = self
            .find(id)?
            .ok_or(StorageError::RowNotFound { id })?;
        Ok(NestedSet::existing(self, node))
    }

    /// Row by identity
    pub fn find(&self, id: NodeId) -> Result<Option<TreeNode<T>>> {
        Ok(self.storage.find_one(&NodeQuery::by_id(id))?)
    }

    /// Root rows of every group, in group order
    pub fn roots(&self) -> Result<Vec<TreeNode<T>>> {
        Ok(self.storage.find_all(&NodeQuery::roots())?)
    }

    /// Direct children of `node`, in preorder
    pub fn children(&self, node: &TreeNode<T>) -> Result<Vec<TreeNode<T>>> {
        Ok(self.storage.find_all(&NodeQuery::children_of(&node.bounds))?)
    }

    /// Descendants of `node`, optionally at most `depth` levels below it
    pub fn descendants(&self, node: &TreeNode<T>, depth: Option<u32>) -> Result<Vec<TreeNode<T>>> {
        Ok(self
            .storage
            .find_all(&NodeQuery::descendants_of(&node.bounds, depth))?)
    }

    /// Leaf descendants of `node`
    pub fn leaves(&self, node: &TreeNode<T>) -> Result<Vec<TreeNode<T>>> {
        let query = NodeQuery::descendants_of(&node.bounds, None).and(Condition::Leaf);
        Ok(self.storage.find_all(&query)?)
    }

    /// Ancestors of `node` from the root down, optionally only the nearest `depth`
    pub fn ancestors(&self, node: &TreeNode<T>, depth: Option<u32>) -> Result<Vec<TreeNode<T>>> {
        Ok(self
            .storage
            .find_all(&NodeQuery::ancestors_of(&node.bounds, depth))?)
    }

    /// Nearest ancestor of `node`
    pub fn parent(&self, node: &TreeNode<T>) -> Result<Option<TreeNode<T>>> {
        Ok(self.ancestors(node, Some(1))?.pop())
    }

    /// Sibling immediately preceding `node`
    pub fn prev_sibling(&self, node: &TreeNode<T>) -> Result<Option<TreeNode<T>>> {
        let query = NodeQuery::all()
            .and(Condition::Group(node.group()))
            .and(Condition::Right(node.lft() - 1));
        Ok(self.storage.find_one(&query)?)
    }

    /// Sibling immediately following `node`
    pub fn next_sibling(&self, node: &TreeNode<T>) -> Result<Option<TreeNode<T>>> {
        let query = NodeQuery::all()
            .and(Condition::Group(node.group()))
            .and(Condition::Left(node.rgt() + 1));
        Ok(self.storage.find_one(&query)?)
    }

    /// Run a mutation body in one transaction, verifying touched groups
    /// before commit when configured to
    pub(crate) fn mutate<R, F>(&self, op: &'static str, node: Option<NodeId>, body: F) -> Result<R>
    where
        F: FnOnce(&mut dyn TreeTransaction<T>) -> Result<Mutation<R>>,
    {
        let verify = self.config.verify_invariants;
        let outcome = self.storage.transaction(|tx| {
            let mutation = body(&mut *tx)?;
            if verify {
                for group in &mutation.groups {
                    let rows = tx.find_all(&NodeQuery::group(*group))?;
                    verify_group(*group, rows.iter().map(|row| (row.id, row.bounds)))?;
                }
            }
            Ok(mutation)
        });

        match outcome {
            Ok(mutation) => {
                info!(
                    op,
                    node = ?node,
                    groups = ?mutation.groups,
                    rows = mutation.rows,
                    "tree mutation committed"
                );
                Ok(mutation.value)
            }
            Err(err) => {
                warn!(op, node = ?node, error = %err, "tree mutation rolled back");
                Err(err)
            }
        }
    }
}

/// Remap every row of the plan's groups and write the changed ones.
///
/// All remaps are computed from pre-operation bounds before anything is
/// written, so each row is shifted exactly once.
pub(crate) fn apply_plan<T>(
    tx: &mut dyn TreeTransaction<T>,
    plan: &impl BoundaryPlan,
) -> Result<Applied> {
    let mut updates = Vec::new();
    let mut removals = Vec::new();
    for group in plan.groups() {
        for row in tx.find_all(&NodeQuery::group(group))? {
            match plan.remap(&row.bounds) {
                Remap::Unchanged => {}
                Remap::Moved(bounds) => updates.push((row.id, bounds)),
                Remap::Removed => removals.push(row.id),
            }
        }
    }

    let removed = if removals.is_empty() {
        0
    } else {
        tx.delete_rows(&removals)?
    };
    if !updates.is_empty() {
        tx.update_rows(&updates)?;
    }
    debug!(updated = updates.len(), removed, "boundary plan applied");
    Ok(Applied {
        updated: updates.len(),
        removed,
    })
}

/// Group following the highest one in use
pub(crate) fn next_group<T>(tx: &dyn TreeTransaction<T>) -> Result<GroupId> {
    Ok(tx.max_group()?.map_or(GroupId::FIRST, GroupId::next))
}
