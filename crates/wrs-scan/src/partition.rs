use core::marker::PhantomData;

use wrs_runtime::{
    Handle, LaunchError,
    client::ComputeClient,
    element::{Element, Numeric},
    hazard::Barrier,
};

use crate::{
    ConfigError, ScanInternals, ScanStrategy,
    instructions::{PartitionInstruction, PartitionTargets},
    monoid::Count,
    prefix_sum::run_scan,
};

/// The buffers of a [Partition].
#[derive(Debug, Clone)]
pub struct PartitionBuffers {
    /// The partitioned elements.
    pub elements: Handle,
    /// A single element, elements greater than the pivot are heavy.
    pub pivot: Handle,
    /// A single `u32`, the number of heavy elements.
    pub heavy_count: Handle,
    /// The input index of each placed element, as `u32`.
    pub partition_indices: Handle,
    /// The placed elements, if requested.
    pub partition_elements: Option<Handle>,
    pub internals: ScanInternals,
}

impl PartitionBuffers {
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
        let internals = ScanInternals::allocate::<Count>(client, strategy, n);
        Self::with_internals::<N>(client, elements, pivot, n, write_partition_elements, internals)
    }

    pub(crate) fn with_internals<N: Numeric>(
        client: &ComputeClient,
        elements: Handle,
        pivot: Handle,
        n: usize,
        write_partition_elements: bool,
        internals: ScanInternals,
    ) -> Self {
        Self {
            elements,
            pivot,
            heavy_count: client.empty_for::<u32>(1),
            partition_indices: client.empty_for::<u32>(n),
            partition_elements: write_partition_elements.then(|| client.empty_for::<N>(n)),
            internals,
        }
    }

    /// Makes the results of the previous runs visible to the host.
    pub fn expect_host_access(&self, client: &ComputeClient) {
        let mut barriers = vec![
            Barrier::device_to_host(&self.elements),
            Barrier::device_to_host(&self.pivot),
            Barrier::device_to_host(&self.heavy_count),
            Barrier::device_to_host(&self.partition_indices),
        ];
        barriers.extend(self.partition_elements.iter().map(Barrier::device_to_host));
        client.barrier(&barriers);
    }

    /// Reads the results of a partition of `n` elements, with both groups in input order.
    pub fn download<N: Numeric>(&self, client: &ComputeClient, n: usize) -> PartitionOutput<N> {
        self.expect_host_access(client);

        // A run without elements leaves the count of the previous run in place.
        let heavy_count = (client.read_scalar::<u32>(&self.heavy_count) as usize).min(n);
        let indices = read_placed(client, &self.partition_indices, n, heavy_count);
        let elements = self
            .partition_elements
            .as_ref()
            .map(|handle| read_placed(client, handle, n, heavy_count));

        PartitionOutput {
            heavy_count,
            indices,
            elements,
        }
    }
}

/// Reads placed values, restoring the input order of the light group.
pub(crate) fn read_placed<E: Element>(
    client: &ComputeClient,
    handle: &Handle,
    n: usize,
    heavy_count: usize,
) -> Vec<E> {
    let mut values = client.read::<E>(handle);
    values.truncate(n);
    values[heavy_count.min(n)..].reverse();
    values
}

/// The groups of a partition read back on the host.
#[derive(Debug, Clone, PartialEq)]
pub struct PartitionOutput<N> {
    pub heavy_count: usize,
    /// Input indices of the heavy group followed by the light group, each in input order.
    pub indices: Vec<u32>,
    /// Elements in the same order as the indices, if they were written.
    pub elements: Option<Vec<N>>,
}

impl<N> PartitionOutput<N> {
    pub fn heavy_indices(&self) -> &[u32] {
        &self.indices[..self.heavy_count]
    }

    pub fn light_indices(&self) -> &[u32] {
        &self.indices[self.heavy_count..]
    }

    pub fn heavy_elements(&self) -> Option<&[N]> {
        self.elements
            .as_deref()
            .map(|elements| &elements[..self.heavy_count])
    }

    pub fn light_elements(&self) -> Option<&[N]> {
        self.elements
            .as_deref()
            .map(|elements| &elements[self.heavy_count..])
    }
}

/// Stable partition of an array around a pivot.
///
/// Heavy elements, greater than the pivot, are placed at the start of the output in input
/// order. Light elements are placed from the end of the output, so they appear in reverse input
/// order after the heavy group. [PartitionBuffers::download] restores the input order of both.
#[derive(Debug, Clone)]
pub struct Partition<N: Numeric> {
    strategy: ScanStrategy,
    _n: PhantomData<N>,
}

impl<N: Numeric> Partition<N> {
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
        format!("Partition-{}", self.strategy.name())
    }

    /// Partitions the first `n` elements around the pivot.
    pub fn run(
        &self,
        client: &ComputeClient,
        buffers: &PartitionBuffers,
        n: usize,
    ) -> Result<(), LaunchError> {
        debug_assert!(
            n <= self.max_element_count(),
            "{} supports at most {} elements, got {n}",
            self.name(),
            self.max_element_count()
        );
        debug_assert!(buffers.elements.len_words() >= n, "Element buffer too small");
        debug_assert!(buffers.pivot.len_words() >= 1, "Pivot buffer is empty");
        debug_assert!(
            buffers.partition_indices.len_words() >= n,
            "Index buffer too small"
        );

        if n == 0 {
            return Ok(());
        }

        let targets = PartitionTargets::new(
            buffers.heavy_count.clone(),
            buffers.partition_indices.clone(),
            buffers.partition_elements.clone(),
        );
        let instruction = PartitionInstruction::<N>::new(
            buffers.elements.clone(),
            buffers.pivot.clone(),
            targets,
            n,
            self.strategy.variant(),
            self.strategy.geometry(),
        );

        run_scan(
            client,
            &self.strategy,
            &buffers.internals,
            n,
            self.name(),
            instruction,
        )
    }
}
