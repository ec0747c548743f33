//! # Arbor Testkit
//!
//! Shared fixtures for the Arbor crates' tests:
//!
//! - [`builders`]: declarative outline builder producing consistent row sets
//! - [`assertions`]: structural assertions such as [`assert_tree_valid!`]
//! - [`fixtures`]: a validated payload type and lookup helpers
//! - [`strategies`]: proptest strategies for operation sequences
//!
//! Test crates call [`init_test_tracing`] to see engine logs under
//! `RUST_LOG`.

#![forbid(unsafe_code)]
#![allow(clippy::unwrap_used, clippy::expect_used)]

pub mod assertions;
pub mod builders;
pub mod fixtures;
pub mod strategies;

pub use assertions::{check_tree, depth_first_order};
pub use builders::{OutlineNode, TreeBuilder};
pub use fixtures::{bounds_of, find_by_title, shape, Item};
pub use strategies::{arb_outline, arb_placement, arb_tree_op, arb_tree_ops, TreeOp};

use tracing_subscriber::EnvFilter;

/// Install a test-friendly tracing subscriber once per process.
///
/// Honours `RUST_LOG`; defaults to `warn`.
pub fn init_test_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}
