//! # Arbor Core - Foundation
//!
//! **Purpose**: Row types, boundary arithmetic, invariants and the storage
//! contract of the nested-set tree engine.
//!
//! A tree is stored as a flat relation in which every row carries a
//! `[lft, rgt]` boundary pair, a `level` and a `root` group. An interval
//! contains the intervals of all descendants and is disjoint from every other
//! interval of its group, so ancestry, ordering and subtree size are all
//! answered by integer comparisons.
//!
//! # Architecture Constraints
//!
//! - YES pure boundary arithmetic ([`boundary`])
//! - YES invariant verification ([`invariants`])
//! - YES storage effect traits and the query model ([`effects`], [`query`])
//! - NO storage handler implementations (that's `arbor-effects`)
//! - NO mutation orchestration (that's `arbor-tree`)
//! - NO view models (that's `arbor-view`)

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Boundary codec: gap arithmetic and mutation plans
pub mod boundary;

/// Engine configuration
pub mod config;

/// Storage effect traits
pub mod effects;

/// Unified error types
pub mod errors;

/// Nested-set invariant verification
pub mod invariants;

/// Backend-neutral row queries
pub mod query;

/// Identifiers and row types
pub mod types;

/// Payload validation
pub mod validation;

pub use boundary::{
    BoundaryError, BoundaryPlan, DeletePlan, InsertPlan, MovePlan, Placement, Remap, LEAF_WIDTH,
};
pub use config::{ConfigError, TreeConfig};
pub use effects::{TreeReadEffects, TreeStorageEffects, TreeTransaction};
pub use errors::{RecordState, Result, StorageError, TreeError, POSITION_FIELD};
pub use invariants::{verify_forest, verify_group, InvariantViolation};
pub use query::{Condition, NodeOrder, NodeQuery};
pub use types::{Bounds, GroupId, NodeId, Titled, TreeNode};
pub use validation::{FieldError, Validate, ValidationErrors};
