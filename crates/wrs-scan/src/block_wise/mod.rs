//! The three pass scan engine.
//!
//! 1. Each block reduces its elements and stores the reduction.
//! 2. A single cube scans the block reductions in place.
//! 3. Each block combines its exclusive prefix with its local results.
//!
//! The passes are separate dispatches with a barrier in between, so no cube ever waits on
//! another. The number of blocks is bounded by the top level capacity, since the second pass
//! runs in a single cube.

mod kernels;
mod reductions;

pub use kernels::*;
pub use reductions::*;
