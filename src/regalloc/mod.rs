//! Linear-scan register allocation over a [`crate::emit::builder::Builder`]
//! node list (spec §4.5): interval construction, greedy allocation with a
//! spill-latest-end heuristic, and spill materialization.

pub mod allocator;
pub mod interval;
pub mod spill;

pub use allocator::{allocate, Assignment};
pub use interval::{build_intervals, LiveInterval, VirtReg};
pub use spill::materialize;
