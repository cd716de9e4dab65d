//! Dependency tree decoding.
//!
//! Trees are decoded from head score matrices as maximum spanning
//! arborescences, optionally with a single token attached to the root.

mod tree;
pub use tree::{DependencyTree, TreeDecoder, TreeError};

#[doc(hidden)]
pub mod mst;
