//! The single pass scan engine.
//!
//! Every partition publishes its aggregate in a [state buffer](DecoupledStates), then walks
//! back over its predecessors until it finds a published prefix. The whole scan is a single
//! dispatch of one cube per partition.

mod kernel;
mod lookback;
mod state;

pub use kernel::*;
pub use lookback::*;
pub use state::*;
