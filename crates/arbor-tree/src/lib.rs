//! # Arbor Tree - Mutation Engine
//!
//! **Purpose**: Insert, move and delete nodes of nested-set trees stored
//! through the `arbor-core` storage effects, and dispatch declarative position
//! directives onto those operations.
//!
//! # Architecture Constraints
//!
//! - YES transactional orchestration of boundary plans ([`engine`])
//! - YES per-record tree capability ([`nested_set`])
//! - YES position directive parsing and dispatch ([`position`])
//! - NO boundary arithmetic (that's `arbor_core::boundary`)
//! - NO storage handlers (that's `arbor-effects`)
//! - NO view models (that's `arbor-view`)
//!
//! # Usage
//!
//! ```ignore
//! let engine = TreeEngine::new(&storage, TreeConfig::default());
//! let root = engine.new_record(item).create_root(true, None)?;
//! let mut child = engine.new_record(other);
//! child.append_to(root, true, None)?;
//! child.move_as_root()?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Tree engine and navigation queries
pub mod engine;

/// Record capability carrying the mutation operations
pub mod nested_set;

/// Declarative position directives
pub mod position;

pub use engine::TreeEngine;
pub use nested_set::NestedSet;
pub use position::{
    Action, ActionKind, PositionDescriptor, PositionDirective, PositionInput, RequestedAction,
    SaveOutcome,
};
