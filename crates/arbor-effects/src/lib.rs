//! # Arbor Effects - Handlers
//!
//! **Purpose**: Concrete implementations of the storage effect traits declared
//! in `arbor-core`.
//!
//! The engine consumes [`arbor_core::TreeStorageEffects`] through dependency
//! injection; this crate provides the handler used by tests and by embedders
//! that keep their trees in memory.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Storage handlers
pub mod storage;

pub use storage::MemoryTreeStorage;
