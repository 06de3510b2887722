//! Parallel primitives for building weighted random sampling structures.
//!
//! - [runtime]: the compute client, buffers and worker pool.
//! - [scan]: prefix sums, partitions, prefix partitions and means, each run by either the
//!   decoupled lookback engine or the block-wise engine.

pub use wrs_runtime as runtime;
pub use wrs_scan as scan;

/// The types needed to run the algorithms.
pub mod prelude {
    pub use wrs_runtime::{
        Handle, LaunchError,
        client::{ClientOptions, ComputeClient},
        hazard::Barrier,
    };
    pub use wrs_scan::{
        AtomicMeanConfig, BlockScanVariant, BlockWiseConfig, ConfigError, DecoupledConfig, Mean,
        MeanBuffers, MeanPrefixPartition, MeanPrefixPartitionBuffers, MeanStrategy, Partition,
        PartitionBuffers, PartitionIdPolicy, PrefixPartition, PrefixPartitionBuffers, PrefixSum,
        PrefixSumBuffers, ScanStrategy, SummationMode,
    };
}
