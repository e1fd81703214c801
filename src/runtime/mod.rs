//! The W^X executable-memory runtime (spec §5): maps finalized code into
//! read-execute pages, tracks it by strong reference count, and evicts
//! the least-recently-used mapping once a fixed-capacity cache fills up.

pub mod cache;
pub mod memory;

pub use cache::Runtime;
pub use memory::{JitFunction, MappedCode};
