//! Nested-set capability of one record
//!
//! A [`NestedSet`] pairs a record's payload with its tree position and the
//! engine that persists it. A *new* record has no identity yet and can only be
//! inserted (as a root or relative to a target); an *existing* record can be
//! moved, saved or deleted. Every mutation is one transaction: subject and
//! target rows are re-read inside it, so the plan is always computed from the
//! bounds being rewritten.

use crate::engine::{apply_plan, next_group, Mutation, TreeEngine};
use arbor_core::effects::TreeStorageEffects;
use arbor_core::{
    BoundaryPlan, Bounds, DeletePlan, InsertPlan, MovePlan, NodeId, NodeQuery, Placement, Result,
    TreeError, TreeNode, Validate,
};
use tracing::debug;

/// Tree-position capability of one record
pub struct NestedSet<'e, 's, T, S> {
    engine: &'e TreeEngine<'s, T, S>,
    id: Option<NodeId>,
    bounds: Option<Bounds>,
    data: T,
    deleted: bool,
}

impl<'e, 's, T, S> NestedSet<'e, 's, T, S>
where
    T: Clone + Send + Sync,
    S: TreeStorageEffects<T>,
{
    pub(crate) fn new_record(engine: &'e TreeEngine<'s, T, S>, data: T) -> Self {
        Self {
            engine,
            id: None,
            bounds: None,
            data,
            deleted: false,
        }
    }

    pub(crate) fn existing(engine: &'e TreeEngine<'s, T, S>, node: TreeNode<T>) -> Self {
        Self {
            engine,
            id: Some(node.id),
            bounds: Some(node.bounds),
            data: node.data,
            deleted: false,
        }
    }

    /// Identity, once persisted
    pub fn id(&self) -> Option<NodeId> {
        self.id
    }

    /// Bounds as of the last operation performed through this capability
    pub fn bounds(&self) -> Option<Bounds> {
        self.bounds
    }

    /// Payload
    pub fn data(&self) -> &T {
        &self.data
    }

    /// Mutable payload; changes persist on the next save
    pub fn data_mut(&mut self) -> &mut T {
        &mut self.data
    }

    /// Whether the record has not been persisted yet
    pub fn is_new(&self) -> bool {
        self.id.is_none()
    }

    /// Whether the record was deleted through this capability
    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    /// Row view of the record, if persisted
    pub fn node(&self) -> Option<TreeNode<T>> {
        match (self.id, self.bounds, self.deleted) {
            (Some(id), Some(bounds), false) => Some(TreeNode::new(id, bounds, self.data.clone())),
            _ => None,
        }
    }

    /// Engine the record belongs to
    pub fn engine(&self) -> &'e TreeEngine<'s, T, S> {
        self.engine
    }

    /// Reload the committed bounds and payload of the record
    pub fn refresh(&mut self) -> Result<()> {
        let id = self.require_existing()?;
        let node = self
            .engine
            .find(id)?
            .ok_or_else(|| TreeError::invalid_position("the node no longer exists"))?;
        self.bounds = Some(node.bounds);
        self.data = node.data;
        Ok(())
    }

    /// Direct children of the record
    pub fn children(&self) -> Result<Vec<TreeNode<T>>> {
        self.engine.children(&self.require_node()?)
    }

    /// Descendants of the record, optionally at most `depth` levels below it
    pub fn descendants(&self, depth: Option<u32>) -> Result<Vec<TreeNode<T>>> {
        self.engine.descendants(&self.require_node()?, depth)
    }

    /// Ancestors of the record from the root down
    pub fn ancestors(&self, depth: Option<u32>) -> Result<Vec<TreeNode<T>>> {
        self.engine.ancestors(&self.require_node()?, depth)
    }

    /// Parent of the record
    pub fn parent(&self) -> Result<Option<TreeNode<T>>> {
        self.engine.parent(&self.require_node()?)
    }

    fn require_new(&self) -> Result<()> {
        if self.deleted {
            return Err(TreeError::invalid_position("the record has been deleted"));
        }
        if self.id.is_some() {
            return Err(TreeError::invalid_position(
                "the record is already part of a tree",
            ));
        }
        Ok(())
    }

    fn require_existing(&self) -> Result<NodeId> {
        if self.deleted {
            return Err(TreeError::invalid_position("the record has been deleted"));
        }
        self.id
            .ok_or_else(|| TreeError::invalid_position("the record is not part of a tree yet"))
    }

    fn require_node(&self) -> Result<TreeNode<T>> {
        self.require_existing()?;
        self.node()
            .ok_or_else(|| TreeError::invalid_position("the record is not part of a tree yet"))
    }
}

impl<'e, 's, T, S> NestedSet<'e, 's, T, S>
where
    T: Clone + Send + Sync + Validate,
    S: TreeStorageEffects<T>,
{
    fn validated(&self, validate: bool, fields: Option<&[&str]>) -> Result<()> {
        if validate {
            self.data.validate(fields)?;
        }
        Ok(())
    }

    /// Insert the record as the root of a new tree
    ///
    /// With `validate`, `fields` restricts validation to the named attributes.
    pub fn create_root(&mut self, validate: bool, fields: Option<&[&str]>) -> Result<NodeId> {
        self.require_new()?;
        self.validated(validate, fields)?;

        let many_roots = self.engine.config().many_roots;
        let data = self.data.clone();
        let (id, bounds) = self.engine.mutate("create_root", None, move |tx| {
            if !many_roots && tx.find_one(&NodeQuery::roots())?.is_some() {
                return Err(TreeError::invalid_position(
                    "a root already exists and multiple roots are disabled",
                ));
            }
            let plan = InsertPlan::root(next_group(&*tx)?);
            let id = tx.insert(plan.node(), data)?;
            Ok(Mutation {
                value: (id, plan.node()),
                groups: plan.groups(),
                rows: 1,
            })
        })?;

        self.id = Some(id);
        self.bounds = Some(bounds);
        Ok(id)
    }

    /// Insert the record relative to `target`
    pub fn insert(
        &mut self,
        target: NodeId,
        placement: Placement,
        validate: bool,
        fields: Option<&[&str]>,
    ) -> Result<NodeId> {
        self.require_new()?;
        self.validated(validate, fields)?;

        let data = self.data.clone();
        let (id, bounds) = self.engine.mutate("insert", None, move |tx| {
            let target_row = tx
                .find_one(&NodeQuery::by_id(target))?
                .ok_or(TreeError::TargetNotFound { target })?;
            let plan = InsertPlan::relative_to(&target_row.bounds, placement)?;
            debug!(%target, ?placement, node = ?plan.node(), "insert planned");
            let applied = apply_plan(tx, &plan)?;
            let id = tx.insert(plan.node(), data)?;
            Ok(Mutation {
                value: (id, plan.node()),
                groups: plan.groups(),
                rows: applied.updated + 1,
            })
        })?;

        self.id = Some(id);
        self.bounds = Some(bounds);
        Ok(id)
    }

    /// Insert the record as the first child of `target`
    pub fn prepend_to(
        &mut self,
        target: NodeId,
        validate: bool,
        fields: Option<&[&str]>,
    ) -> Result<NodeId> {
        self.insert(target, Placement::FirstChild, validate, fields)
    }

    /// Insert the record as the last child of `target`
    pub fn append_to(
        &mut self,
        target: NodeId,
        validate: bool,
        fields: Option<&[&str]>,
    ) -> Result<NodeId> {
        self.insert(target, Placement::LastChild, validate, fields)
    }

    /// Insert the record as the sibling immediately before `target`
    pub fn insert_before(
        &mut self,
        target: NodeId,
        validate: bool,
        fields: Option<&[&str]>,
    ) -> Result<NodeId> {
        self.insert(target, Placement::Before, validate, fields)
    }

    /// Insert the record as the sibling immediately after `target`
    pub fn insert_after(
        &mut self,
        target: NodeId,
        validate: bool,
        fields: Option<&[&str]>,
    ) -> Result<NodeId> {
        self.insert(target, Placement::After, validate, fields)
    }

    /// Move the record with its subtree relative to `target`
    pub fn move_to(&mut self, target: NodeId, placement: Placement) -> Result<()> {
        let id = self.require_existing()?;
        let bounds = self.engine.mutate("move", Some(id), move |tx| {
            let subject = tx
                .find_one(&NodeQuery::by_id(id))?
                .ok_or_else(|| TreeError::invalid_position("the node no longer exists"))?;
            let target_row = tx
                .find_one(&NodeQuery::by_id(target))?
                .ok_or(TreeError::TargetNotFound { target })?;
            let plan = MovePlan::relative_to(&subject.bounds, &target_row.bounds, placement)?;
            if plan.is_noop() {
                debug!(node = %id, %target, ?placement, "move leaves the node in place");
                return Ok(Mutation {
                    value: subject.bounds,
                    groups: Vec::new(),
                    rows: 0,
                });
            }
            let applied = apply_plan(tx, &plan)?;
            Ok(Mutation {
                value: plan.subject_after(),
                groups: plan.groups(),
                rows: applied.updated,
            })
        })?;

        self.bounds = Some(bounds);
        Ok(())
    }

    /// Move the record to be the sibling immediately before `target`
    pub fn move_before(&mut self, target: NodeId) -> Result<()> {
        self.move_to(target, Placement::Before)
    }

    /// Move the record to be the sibling immediately after `target`
    pub fn move_after(&mut self, target: NodeId) -> Result<()> {
        self.move_to(target, Placement::After)
    }

    /// Move the record to be the first child of `target`
    pub fn move_as_first(&mut self, target: NodeId) -> Result<()> {
        self.move_to(target, Placement::FirstChild)
    }

    /// Move the record to be the last child of `target`
    pub fn move_as_last(&mut self, target: NodeId) -> Result<()> {
        self.move_to(target, Placement::LastChild)
    }

    /// Move the record with its subtree into a new group as its root
    pub fn move_as_root(&mut self) -> Result<()> {
        let id = self.require_existing()?;
        if !self.engine.config().many_roots {
            return Err(TreeError::invalid_position(
                "moving a node to the root requires multiple roots",
            ));
        }

        let bounds = self.engine.mutate("move_as_root", Some(id), move |tx| {
            let subject = tx
                .find_one(&NodeQuery::by_id(id))?
                .ok_or_else(|| TreeError::invalid_position("the node no longer exists"))?;
            let plan = MovePlan::to_root(&subject.bounds, next_group(&*tx)?)?;
            let applied = apply_plan(tx, &plan)?;
            Ok(Mutation {
                value: plan.subject_after(),
                groups: plan.groups(),
                rows: applied.updated,
            })
        })?;

        self.bounds = Some(bounds);
        Ok(())
    }

    /// Delete the record with its subtree, returning the number of rows removed
    pub fn delete_node(&mut self) -> Result<usize> {
        let id = self.require_existing()?;
        let removed = self.engine.mutate("delete", Some(id), move |tx| {
            let subject = tx
                .find_one(&NodeQuery::by_id(id))?
                .ok_or_else(|| TreeError::invalid_position("the node no longer exists"))?;
            let plan = DeletePlan::of(&subject.bounds);
            let applied = apply_plan(tx, &plan)?;
            Ok(Mutation {
                value: applied.removed,
                groups: plan.groups(),
                rows: applied.removed + applied.updated,
            })
        })?;

        self.deleted = true;
        self.bounds = None;
        Ok(removed)
    }

    /// Persist the payload without changing the tree position
    ///
    /// A new record is created as a root. With `validate`, a failing payload is
    /// reported before anything is written; `fields` restricts validation to
    /// the named attributes.
    pub fn save_node(&mut self, validate: bool, fields: Option<&[&str]>) -> Result<NodeId> {
        self.validated(validate, fields)?;
        if self.is_new() && !self.deleted {
            return self.create_root(false, None);
        }

        let id = self.require_existing()?;
        let data = self.data.clone();
        self.engine.mutate("save", Some(id), move |tx| {
            tx.update_data(id, data)?;
            Ok(Mutation {
                value: (),
                groups: Vec::new(),
                rows: 1,
            })
        })?;
        Ok(id)
    }
}

impl<T: std::fmt::Debug, S> std::fmt::Debug for NestedSet<'_, '_, T, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NestedSet")
            .field("id", &self.id)
            .field("bounds", &self.bounds)
            .field("data", &self.data)
            .field("deleted", &self.deleted)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_core::{GroupId, TreeConfig};
    use arbor_effects::MemoryTreeStorage;
    use arbor_testkit::{bounds_of, find_by_title, Item, TreeBuilder};

    fn engine_config() -> TreeConfig {
        TreeConfig::default().with_verification(true)
    }

    #[test]
    fn test_create_root_uses_next_group() {
        let storage = MemoryTreeStorage::new();
        let engine = TreeEngine::new(&storage, engine_config());
        let mut first = engine.new_record(Item::new("first"));
        first.create_root(true, None).unwrap();
        let mut second = engine.new_record(Item::new("second"));
        second.create_root(true, None).unwrap();

        assert_eq!(first.bounds().unwrap(), Bounds::new_root(GroupId(1)));
        assert_eq!(second.bounds().unwrap(), Bounds::new_root(GroupId(2)));
    }

    #[test]
    fn test_single_root_mode_rejects_second_root() {
        let storage = MemoryTreeStorage::new();
        let engine = TreeEngine::new(&storage, TreeConfig::single_root().with_verification(true));
        engine.new_record(Item::new("only")).create_root(false, None).unwrap();
        let err = engine
            .new_record(Item::new("extra"))
            .create_root(false, None)
            .unwrap_err();
        assert!(matches!(err, TreeError::InvalidPosition { .. }));
        assert_eq!(storage.len(), 1);
    }

    #[test]
    fn test_insert_requires_new_record() {
        let storage: MemoryTreeStorage<Item> = TreeBuilder::new()
            .root("R", |r| {
                r.leaf("A");
            })
            .build_items();
        let engine = TreeEngine::new(&storage, engine_config());
        let root = find_by_title(&storage, "R").id;
        let mut a = engine.load(find_by_title(&storage, "A").id).unwrap();
        assert!(matches!(
            a.append_to(root, false, None),
            Err(TreeError::InvalidPosition { .. })
        ));

        let mut fresh = engine.new_record(Item::new("fresh"));
        assert!(matches!(
            fresh.move_after(root),
            Err(TreeError::InvalidPosition { .. })
        ));
        assert!(matches!(
            fresh.delete_node(),
            Err(TreeError::InvalidPosition { .. })
        ));
    }

    #[test]
    fn test_validation_blocks_writes() {
        let storage = MemoryTreeStorage::new();
        let engine = TreeEngine::new(&storage, engine_config());
        let mut blank = engine.new_record(Item::new(""));
        let err = blank.create_root(true, None).unwrap_err();
        assert_eq!(err.field(), Some("title"));
        assert!(storage.is_empty());
        assert!(blank.is_new());
    }

    #[test]
    fn test_save_node_updates_payload_only() {
        let storage: MemoryTreeStorage<Item> = TreeBuilder::new()
            .root("R", |r| {
                r.leaf("A");
            })
            .build_items();
        let engine = TreeEngine::new(&storage, engine_config());
        let id = find_by_title(&storage, "A").id;
        let before = bounds_of(&storage, id);

        let mut a = engine.load(id).unwrap();
        a.data_mut().title = "renamed".into();
        a.save_node(true, Some(&["title"])).unwrap();

        let row = engine.find(id).unwrap().unwrap();
        assert_eq!(row.data.title, "renamed");
        assert_eq!(row.bounds, before);
    }

    #[test]
    fn test_deleted_record_rejects_further_operations() {
        let storage: MemoryTreeStorage<Item> = TreeBuilder::new()
            .root("R", |r| {
                r.leaf("A").leaf("B");
            })
            .build_items();
        let engine = TreeEngine::new(&storage, engine_config());
        let mut a = engine.load(find_by_title(&storage, "A").id).unwrap();
        assert_eq!(a.delete_node().unwrap(), 1);
        assert!(a.is_deleted());
        assert!(matches!(
            a.save_node(false, None),
            Err(TreeError::InvalidPosition { .. })
        ));
        assert!(a.node().is_none());
    }

    #[test]
    fn test_move_as_root_requires_many_roots() {
        let storage: MemoryTreeStorage<Item> = TreeBuilder::new()
            .root("R", |r| {
                r.leaf("A");
            })
            .build_items();
        let engine = TreeEngine::new(&storage, TreeConfig::single_root().with_verification(true));
        let mut a = engine.load(find_by_title(&storage, "A").id).unwrap();
        assert!(matches!(
            a.move_as_root(),
            Err(TreeError::InvalidPosition { .. })
        ));
    }
}
