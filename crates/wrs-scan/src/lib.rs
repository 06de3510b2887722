//! Parallel scans over contiguous partitions of an array.
//!
//! Two engines coordinate the partitions:
//!
//! - The [decoupled](decoupled) engine runs in a single dispatch. Each partition publishes its
//!   aggregate in a shared state buffer, then looks back at its predecessors to find its
//!   exclusive prefix.
//! - The [block-wise](block_wise) engine runs three dispatches separated by barriers: a local
//!   reduction, a scan of the block reductions, then a combine.
//!
//! The algorithms ([PrefixSum], [Partition], [PrefixPartition] and [Mean]) are instructions
//! executed by either engine, the engine being selected once at construction.

#[macro_use]
extern crate derive_new;

/// Block-wise engine.
pub mod block_wise;
/// Local scans within a partition.
pub mod block_scan;
/// Decoupled lookback engine.
pub mod decoupled;
/// Combine operations.
pub mod monoid;

mod config;
mod error;
mod instructions;
mod mean;
mod partition;
mod pipeline;
mod prefix_partition;
mod prefix_sum;
mod variant;

pub use config::*;
pub use error::*;
pub use mean::*;
pub use partition::*;
pub use pipeline::*;
pub use prefix_partition::*;
pub use prefix_sum::*;
pub use variant::*;

#[cfg(feature = "export_tests")]
pub mod test;
