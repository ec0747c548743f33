//! Effect traits consumed by the tree engine

pub mod storage;

pub use storage::{TreeReadEffects, TreeStorageEffects, TreeTransaction};
