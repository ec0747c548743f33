//! Storage handlers

pub mod memory;

pub use memory::MemoryTreeStorage;
