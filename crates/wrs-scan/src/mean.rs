use core::marker::PhantomData;

use wrs_runtime::{
    Handle, LaunchError,
    client::ComputeClient,
    element::Float,
    hazard::Barrier,
    kernel::CubeCount,
};

use crate::{
    AtomicMeanConfig, ConfigError, MeanStrategy,
    block_wise::{BlockReductions, launch_block_wise},
    decoupled::{DecoupledStates, launch_decoupled},
    instructions::{AtomicMeanKernel, MeanInstruction},
    monoid::Sum,
};

/// The engine specific buffers of a mean.
#[derive(Debug, Clone)]
pub enum MeanInternals {
    Decoupled { states: Handle },
    BlockWise { reductions: Handle },
    /// Partitions add to the mean directly.
    Atomic,
}

impl MeanInternals {
    pub fn allocate<F: Float>(client: &ComputeClient, strategy: &MeanStrategy, n: usize) -> Self {
        match strategy {
            MeanStrategy::Decoupled(config) => MeanInternals::Decoupled {
                states: DecoupledStates::<Sum<F>>::allocate(client, config.partition_count(n)),
            },
            MeanStrategy::BlockWise(config) => MeanInternals::BlockWise {
                reductions: BlockReductions::<Sum<F>>::allocate(client, config.block_count(n)),
            },
            MeanStrategy::Atomic(_) => MeanInternals::Atomic,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            MeanInternals::Decoupled { .. } => "decoupled",
            MeanInternals::BlockWise { .. } => "block-wise",
            MeanInternals::Atomic => "atomic",
        }
    }
}

/// The buffers of a [Mean].
#[derive(Debug, Clone)]
pub struct MeanBuffers {
    /// The averaged elements.
    pub elements: Handle,
    /// A single element, the mean.
    pub mean: Handle,
    pub internals: MeanInternals,
}

impl MeanBuffers {
    /// Allocates zeroed buffers to average `n` elements.
    pub fn allocate<F: Float>(client: &ComputeClient, strategy: &MeanStrategy, n: usize) -> Self {
        Self::with_elements::<F>(client, strategy, client.empty_for::<F>(n), n)
    }

    /// Allocates the buffers to average existing elements.
    pub fn with_elements<F: Float>(
        client: &ComputeClient,
        strategy: &MeanStrategy,
        elements: Handle,
        n: usize,
    ) -> Self {
        Self {
            elements,
            mean: client.empty_for::<F>(1),
            internals: MeanInternals::allocate::<F>(client, strategy, n),
        }
    }

    /// Makes the results of the previous runs visible to the host.
    pub fn expect_host_access(&self, client: &ComputeClient) {
        client.barrier(&[
            Barrier::device_to_host(&self.elements),
            Barrier::device_to_host(&self.mean),
        ]);
    }

    /// Reads the mean.
    pub fn download<F: Float>(&self, client: &ComputeClient) -> F {
        self.expect_host_access(client);
        client.read_scalar(&self.mean)
    }
}

/// The mean of an array.
///
/// The scan engines sum the array like a prefix sum and the last partition divides the total.
/// The atomic variant skips the lookback: every partition adds its share of the mean with an
/// atomic float addition, in any order.
#[derive(Debug, Clone)]
pub struct Mean<F: Float> {
    strategy: MeanStrategy,
    _f: PhantomData<F>,
}

impl<F: Float> Mean<F> {
    pub fn new(strategy: MeanStrategy) -> Result<Self, ConfigError> {
        Ok(Self {
            strategy: strategy.validate()?,
            _f: PhantomData,
        })
    }

    pub fn strategy(&self) -> &MeanStrategy {
        &self.strategy
    }

    pub fn max_element_count(&self) -> usize {
        self.strategy.max_element_count()
    }

    pub fn name(&self) -> String {
        format!("Mean-{}", self.strategy.name())
    }

    /// Averages the first `n` elements. The mean is left untouched when `n` is zero.
    pub fn run(
        &self,
        client: &ComputeClient,
        buffers: &MeanBuffers,
        n: usize,
    ) -> Result<(), LaunchError> {
        debug_assert!(
            n <= self.max_element_count(),
            "{} supports at most {} elements, got {n}",
            self.name(),
            self.max_element_count()
        );
        debug_assert!(buffers.elements.len_words() >= n, "Element buffer too small");
        debug_assert!(buffers.mean.len_words() >= 1, "Mean buffer is empty");

        if n == 0 {
            return Ok(());
        }

        let instruction =
            || MeanInstruction::<F>::new(buffers.elements.clone(), buffers.mean.clone(), n);

        match (&self.strategy, &buffers.internals) {
            (MeanStrategy::Decoupled(config), MeanInternals::Decoupled { states }) => {
                launch_decoupled(client, instruction(), states, config, n, self.name())
            }
            (MeanStrategy::BlockWise(config), MeanInternals::BlockWise { reductions }) => {
                launch_block_wise(client, instruction(), reductions, config, n, self.name())
            }
            (MeanStrategy::Atomic(config), MeanInternals::Atomic) => {
                self.run_atomic(client, buffers, config, n)
            }
            (strategy, internals) => panic!(
                "{} can't run with {} buffers",
                strategy.name(),
                internals.name()
            ),
        }
    }

    fn run_atomic(
        &self,
        client: &ComputeClient,
        buffers: &MeanBuffers,
        config: &AtomicMeanConfig,
        n: usize,
    ) -> Result<(), LaunchError> {
        let partition_count = n.div_ceil(config.partition_size());

        log::debug!("Running {} over {n} elements in {partition_count} partitions", self.name());

        client.fill(&buffers.mean, F::zero().to_word());
        client.barrier(&[Barrier::transfer_to_compute(&buffers.mean)]);

        let kernel = AtomicMeanKernel::<F>::new(
            buffers.elements.clone(),
            buffers.mean.clone(),
            n,
            config.partition_size(),
            self.name(),
        );
        client.launch(kernel, CubeCount::new(partition_count as u32))
    }
}
