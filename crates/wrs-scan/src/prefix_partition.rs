use core::marker::PhantomData;

use wrs_runtime::{
    Handle, LaunchError,
    client::ComputeClient,
    element::Numeric,
    hazard::Barrier,
};

use crate::{
    ConfigError, PartitionBuffers, PartitionOutput, ScanInternals, ScanStrategy,
    instructions::{PartitionTargets, PrefixPartitionInstruction},
    monoid::HeavyLightSum,
    partition::read_placed,
    prefix_sum::run_scan,
};

/// The buffers of a [PrefixPartition].
#[derive(Debug, Clone)]
pub struct PrefixPartitionBuffers {
    /// The partition outputs. Its internals are sized for the prefix partition monoid.
    pub partition: PartitionBuffers,
    /// The running sum within the group of each placed element.
    pub partition_prefix: Handle,
}

impl PrefixPartitionBuffers {
    /// Allocates zeroed buffers to partition `n` elements.
    pub fn allocate<N: Numeric>(
        client: &ComputeClient,
        strategy: &ScanStrategy,
        n: usize,
        write_partition_elements: bool,
    ) -> Self {
        Self::with_inputs::<N>(
            client,
            strategy,
            client.empty_for::<N>(n),
            client.empty_for::<N>(1),
            n,
            write_partition_elements,
        )
    }

    /// Allocates the output buffers to partition existing elements around an existing pivot.
    pub fn with_inputs<N: Numeric>(
        client: &ComputeClient,
        strategy: &ScanStrategy,
        elements: Handle,
        pivot: Handle,
        n: usize,
        write_partition_elements: bool,
    ) -> Self {
        let internals = ScanInternals::allocate::<HeavyLightSum<N>>(client, strategy, n);
        let partition = PartitionBuffers::with_internals::<N>(
            client,
            elements,
            pivot,
            n,
            write_partition_elements,
            internals,
        );

        Self {
            partition,
            partition_prefix: client.empty_for::<N>(n),
        }
    }

    /// Makes the results of the previous runs visible to the host.
    pub fn expect_host_access(&self, client: &ComputeClient) {
        self.partition.expect_host_access(client);
        client.barrier(&[Barrier::device_to_host(&self.partition_prefix)]);
    }

    /// Reads the results of a prefix partition of `n` elements, with both groups in input
    /// order.
    pub fn download<N: Numeric>(
        &self,
        client: &ComputeClient,
        n: usize,
    ) -> PrefixPartitionOutput<N> {
        self.expect_host_access(client);

        let partition = self.partition.download::<N>(client, n);
        let prefix = read_placed(client, &self.partition_prefix, n, partition.heavy_count);

        PrefixPartitionOutput { partition, prefix }
    }
}

/// The groups of a prefix partition read back on the host.
#[derive(Debug, Clone, PartialEq)]
pub struct PrefixPartitionOutput<N> {
    pub partition: PartitionOutput<N>,
    /// Inclusive running sums within each group, in the order of the indices.
    pub prefix: Vec<N>,
}

impl<N> PrefixPartitionOutput<N> {
    pub fn heavy_prefix(&self) -> &[N] {
        &self.prefix[..self.partition.heavy_count]
    }

    pub fn light_prefix(&self) -> &[N] {
        &self.prefix[self.partition.heavy_count..]
    }
}

/// A [Partition](crate::Partition) that also computes the running sum of each group.
///
/// The running sum of a placed element is stored at its destination, so the heavy sums
/// increase from the start of the output and the light sums increase from its end.
#[derive(Debug, Clone)]
pub struct PrefixPartition<N: Numeric> {
    strategy: ScanStrategy,
    _n: PhantomData<N>,
}

impl<N: Numeric> PrefixPartition<N> {
    pub fn new(strategy: ScanStrategy) -> Result<Self, ConfigError> {
        Ok(Self {
            strategy: strategy.validate()?,
            _n: PhantomData,
        })
    }

    pub fn strategy(&self) -> &ScanStrategy {
        &self.strategy
    }

    pub fn max_element_count(&self) -> usize {
        self.strategy.max_element_count()
    }

    pub fn name(&self) -> String {
        format!("PrefixPartition-{}", self.strategy.name())
    }

    /// Partitions the first `n` elements around the pivot.
    pub fn run(
        &self,
        client: &ComputeClient,
        buffers: &PrefixPartitionBuffers,
        n: usize,
    ) -> Result<(), LaunchError> {
        let partition = &buffers.partition;
        debug_assert!(
            n <= self.max_element_count(),
            "{} supports at most {} elements, got {n}",
            self.name(),
            self.max_element_count()
        );
        debug_assert!(partition.elements.len_words() >= n, "Element buffer too small");
        debug_assert!(partition.pivot.len_words() >= 1, "Pivot buffer is empty");
        debug_assert!(
            buffers.partition_prefix.len_words() >= n,
            "Prefix buffer too small"
        );

        if n == 0 {
            return Ok(());
        }

        let targets = PartitionTargets::new(
            partition.heavy_count.clone(),
            partition.partition_indices.clone(),
            partition.partition_elements.clone(),
        );
        let instruction = PrefixPartitionInstruction::<N>::new(
            partition.elements.clone(),
            partition.pivot.clone(),
            targets,
            buffers.partition_prefix.clone(),
            n,
            self.strategy.variant(),
            self.strategy.geometry(),
        );

        run_scan(
            client,
            &self.strategy,
            &partition.internals,
            n,
            self.name(),
            instruction,
        )
    }
}
