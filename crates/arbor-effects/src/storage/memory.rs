//! In-memory tree storage handler
//!
//! Rows live in a `BTreeMap` behind a `parking_lot::RwLock`. A transaction
//! clones the committed table into a private working copy, runs the caller's
//! body against it, and publishes the copy under the write lock only when the
//! body succeeds. Readers therefore see either the state before or the state
//! after a transaction, never a partially shifted tree. A writer mutex
//! serializes transactions.

use arbor_core::effects::{TreeReadEffects, TreeStorageEffects, TreeTransaction};
use arbor_core::{Bounds, GroupId, NodeId, NodeQuery, StorageError, TreeError, TreeNode};
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
struct Table<T> {
    rows: BTreeMap<NodeId, TreeNode<T>>,
    next_id: u64,
}

impl<T: Clone> Table<T> {
    fn empty() -> Self {
        Self {
            rows: BTreeMap::new(),
            next_id: 1,
        }
    }

    fn select(&self, query: &NodeQuery<T>) -> Vec<TreeNode<T>> {
        let mut rows: Vec<TreeNode<T>> = self
            .rows
            .values()
            .filter(|node| query.matches(node))
            .cloned()
            .collect();
        query.sort(&mut rows);
        rows
    }

    fn max_group(&self) -> Option<GroupId> {
        self.rows.values().map(|node| node.bounds.root).max()
    }
}

/// In-memory storage handler, used for tests and embedding
pub struct MemoryTreeStorage<T> {
    table: RwLock<Table<T>>,
    writer: Mutex<()>,
    fail_after_writes: Mutex<Option<usize>>,
}

impl<T: Clone> MemoryTreeStorage<T> {
    /// Create an empty storage
    pub fn new() -> Self {
        Self {
            table: RwLock::new(Table::empty()),
            writer: Mutex::new(()),
            fail_after_writes: Mutex::new(None),
        }
    }

    /// Create a storage pre-populated with rows
    ///
    /// Rows keep their identities; new identities continue after the highest one.
    pub fn from_rows(rows: impl IntoIterator<Item = TreeNode<T>>) -> Self {
        let mut table = Table::empty();
        for row in rows {
            table.next_id = table.next_id.max(row.id.0 + 1);
            table.rows.insert(row.id, row);
        }
        Self {
            table: RwLock::new(table),
            writer: Mutex::new(()),
            fail_after_writes: Mutex::new(None),
        }
    }

    /// Every committed row, ordered by group then left boundary
    pub fn snapshot(&self) -> Vec<TreeNode<T>> {
        self.table.read().select(&NodeQuery::all())
    }

    /// Number of committed rows
    pub fn len(&self) -> usize {
        self.table.read().rows.len()
    }

    /// Whether no row is committed
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Make the write after the next `writes` successful ones fail with a
    /// backend error, once
    pub fn fail_after_writes(&self, writes: usize) {
        *self.fail_after_writes.lock() = Some(writes);
    }

    /// Remove a pending injected failure
    pub fn clear_faults(&self) {
        *self.fail_after_writes.lock() = None;
    }
}

impl<T: Clone> Default for MemoryTreeStorage<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for MemoryTreeStorage<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryTreeStorage")
            .field("rows", &self.table.read().rows.len())
            .finish()
    }
}

impl<T: Clone + Send + Sync> TreeReadEffects<T> for MemoryTreeStorage<T> {
    fn find_one(&self, query: &NodeQuery<T>) -> Result<Option<TreeNode<T>>, StorageError> {
        Ok(self.table.read().select(query).into_iter().next())
    }

    fn find_all(&self, query: &NodeQuery<T>) -> Result<Vec<TreeNode<T>>, StorageError> {
        Ok(self.table.read().select(query))
    }
}

impl<T: Clone + Send + Sync> TreeStorageEffects<T> for MemoryTreeStorage<T> {
    fn transaction<R, F>(&self, body: F) -> Result<R, TreeError>
    where
        F: FnOnce(&mut dyn TreeTransaction<T>) -> Result<R, TreeError>,
    {
        let _serialized = self.writer.lock();
        let working = self.table.read().clone();
        let mut tx = MemoryTransaction {
            table: working,
            writes: 0,
            faults: &self.fail_after_writes,
        };

        match body(&mut tx) {
            Ok(value) => {
                let writes = tx.writes;
                *self.table.write() = tx.table;
                tracing::debug!(writes, "memory transaction committed");
                Ok(value)
            }
            Err(err) => {
                tracing::warn!(writes = tx.writes, error = %err, "memory transaction rolled back");
                Err(err)
            }
        }
    }
}

struct MemoryTransaction<'a, T> {
    table: Table<T>,
    writes: usize,
    faults: &'a Mutex<Option<usize>>,
}

impl<T> MemoryTransaction<'_, T> {
    fn record_write(&mut self) -> Result<(), StorageError> {
        let mut pending = self.faults.lock();
        match pending.as_mut() {
            Some(0) => {
                *pending = None;
                Err(StorageError::backend("injected write failure"))
            }
            Some(remaining) => {
                *remaining -= 1;
                self.writes += 1;
                Ok(())
            }
            None => {
                self.writes += 1;
                Ok(())
            }
        }
    }
}

impl<T: Clone> TreeTransaction<T> for MemoryTransaction<'_, T> {
    fn find_one(&self, query: &NodeQuery<T>) -> Result<Option<TreeNode<T>>, StorageError> {
        Ok(self.table.select(query).into_iter().next())
    }

    fn find_all(&self, query: &NodeQuery<T>) -> Result<Vec<TreeNode<T>>, StorageError> {
        Ok(self.table.select(query))
    }

    fn max_group(&self) -> Result<Option<GroupId>, StorageError> {
        Ok(self.table.max_group())
    }

    fn insert(&mut self, bounds: Bounds, data: T) -> Result<NodeId, StorageError> {
        self.record_write()?;
        let id = NodeId(self.table.next_id);
        self.table.next_id += 1;
        self.table.rows.insert(id, TreeNode::new(id, bounds, data));
        Ok(id)
    }

    fn update_rows(&mut self, updates: &[(NodeId, Bounds)]) -> Result<(), StorageError> {
        self.record_write()?;
        for (id, bounds) in updates {
            let row = self
                .table
                .rows
                .get_mut(id)
                .ok_or(StorageError::RowNotFound { id: *id })?;
            row.bounds = *bounds;
        }
        Ok(())
    }

    fn update_data(&mut self, id: NodeId, data: T) -> Result<(), StorageError> {
        self.record_write()?;
        let row = self
            .table
            .rows
            .get_mut(&id)
            .ok_or(StorageError::RowNotFound { id })?;
        row.data = data;
        Ok(())
    }

    fn delete_rows(&mut self, ids: &[NodeId]) -> Result<usize, StorageError> {
        self.record_write()?;
        Ok(ids
            .iter()
            .filter(|id| self.table.rows.remove(id).is_some())
            .count())
    }
}
