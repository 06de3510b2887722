use wrs_runtime::{LaunchError, client::ComputeClient, element::Float, hazard::Barrier};

use crate::{
    ConfigError, Mean, MeanBuffers, MeanStrategy, PrefixPartition, PrefixPartitionBuffers,
    ScanStrategy,
};

/// The buffers of a [MeanPrefixPartition].
///
/// Both stages share the elements, and the mean written by the first stage is the pivot of
/// the second.
#[derive(Debug, Clone)]
pub struct MeanPrefixPartitionBuffers {
    pub mean: MeanBuffers,
    pub prefix_partition: PrefixPartitionBuffers,
}

impl MeanPrefixPartitionBuffers {
    pub fn allocate<F: Float>(
        client: &ComputeClient,
        mean_strategy: &MeanStrategy,
        scan_strategy: &ScanStrategy,
        n: usize,
        write_partition_elements: bool,
    ) -> Self {
        let mean = MeanBuffers::allocate::<F>(client, mean_strategy, n);
        let prefix_partition = PrefixPartitionBuffers::with_inputs::<F>(
            client,
            scan_strategy,
            mean.elements.clone(),
            mean.mean.clone(),
            n,
            write_partition_elements,
        );

        Self {
            mean,
            prefix_partition,
        }
    }

    /// Makes the results of the previous runs visible to the host.
    pub fn expect_host_access(&self, client: &ComputeClient) {
        self.mean.expect_host_access(client);
        self.prefix_partition.expect_host_access(client);
    }
}

/// Splits an array into the elements above its mean and the others, with the running sum of
/// each group.
///
/// This is the first step of building an alias table: heavy elements are those with more than
/// the average weight.
#[derive(Debug, Clone)]
pub struct MeanPrefixPartition<F: Float> {
    mean: Mean<F>,
    prefix_partition: PrefixPartition<F>,
}

impl<F: Float> MeanPrefixPartition<F> {
    pub fn new(
        mean_strategy: MeanStrategy,
        scan_strategy: ScanStrategy,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            mean: Mean::new(mean_strategy)?,
            prefix_partition: PrefixPartition::new(scan_strategy)?,
        })
    }

    pub fn max_element_count(&self) -> usize {
        self.mean
            .max_element_count()
            .min(self.prefix_partition.max_element_count())
    }

    pub fn name(&self) -> String {
        format!(
            "MeanPrefixPartition[{}, {}]",
            self.mean.name(),
            self.prefix_partition.name()
        )
    }

    /// Computes the mean of the first `n` elements, then partitions them around it.
    pub fn run(
        &self,
        client: &ComputeClient,
        buffers: &MeanPrefixPartitionBuffers,
        n: usize,
    ) -> Result<(), LaunchError> {
        debug_assert!(
            buffers
                .mean
                .mean
                .is_same(&buffers.prefix_partition.partition.pivot),
            "The pivot of the partition must be the mean"
        );

        self.mean.run(client, &buffers.mean, n)?;
        client.barrier(&[Barrier::compute_to_compute(&buffers.mean.mean)]);
        self.prefix_partition
            .run(client, &buffers.prefix_partition, n)
    }
}
