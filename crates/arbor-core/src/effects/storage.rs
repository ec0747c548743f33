//! Tree Storage Effects
//!
//! The storage collaborator contract. The engine never talks to a concrete
//! backend; it consumes these traits and handlers implement them (see
//! `arbor-effects` for the in-memory handler).
//!
//! # Effect Classification
//!
//! - **Category**: Infrastructure Effect
//! - **Implementation**: `arbor-effects`
//! - **Usage**: row lookup, ordered iteration, transactional multi-row update
//!
//! ## Transaction contract
//!
//! [`TreeStorageEffects::transaction`] runs a closure against a
//! [`TreeTransaction`]. Every write performed through the transaction is
//! committed when the closure returns `Ok` and discarded when it returns
//! `Err`; no intermediate state is ever visible through
//! [`TreeReadEffects`]. Handlers must serialize transactions touching the same
//! group.

use crate::errors::{StorageError, TreeError};
use crate::query::NodeQuery;
use crate::types::{Bounds, GroupId, NodeId, TreeNode};

/// Read access to committed rows
pub trait TreeReadEffects<T>: Send + Sync {
    /// First row matching the query in query order
    fn find_one(&self, query: &NodeQuery<T>) -> Result<Option<TreeNode<T>>, StorageError>;

    /// Every row matching the query in query order
    fn find_all(&self, query: &NodeQuery<T>) -> Result<Vec<TreeNode<T>>, StorageError>;
}

/// Reads and writes inside one open transaction
pub trait TreeTransaction<T> {
    /// First row matching the query, including uncommitted writes
    fn find_one(&self, query: &NodeQuery<T>) -> Result<Option<TreeNode<T>>, StorageError>;

    /// Every row matching the query, including uncommitted writes
    fn find_all(&self, query: &NodeQuery<T>) -> Result<Vec<TreeNode<T>>, StorageError>;

    /// Highest group currently in use
    fn max_group(&self) -> Result<Option<GroupId>, StorageError>;

    /// Insert a row and return its new identity
    fn insert(&mut self, bounds: Bounds, data: T) -> Result<NodeId, StorageError>;

    /// Bulk boundary update
    fn update_rows(&mut self, updates: &[(NodeId, Bounds)]) -> Result<(), StorageError>;

    /// Replace a row's payload
    fn update_data(&mut self, id: NodeId, data: T) -> Result<(), StorageError>;

    /// Delete rows, returning how many existed
    fn delete_rows(&mut self, ids: &[NodeId]) -> Result<usize, StorageError>;
}

/// Transactional storage of tree rows
pub trait TreeStorageEffects<T>: TreeReadEffects<T> {
    /// Run `body` in a transaction, committing on `Ok` and rolling back on `Err`
    fn transaction<R, F>(&self, body: F) -> Result<R, TreeError>
    where
        F: FnOnce(&mut dyn TreeTransaction<T>) -> Result<R, TreeError>;
}
