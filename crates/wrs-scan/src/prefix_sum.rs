use core::marker::PhantomData;

use wrs_runtime::{
    Handle, LaunchError,
    client::ComputeClient,
    element::Numeric,
    hazard::Barrier,
};

use crate::{
    ConfigError, ScanStrategy,
    block_wise::{BlockReductions, BlockWiseInstruction, launch_block_wise},
    decoupled::{DecoupledInstruction, DecoupledStates, launch_decoupled},
    instructions::PrefixSumInstruction,
    monoid::{Monoid, Sum},
};

/// The engine specific buffers of a scan.
#[derive(Debug, Clone)]
pub enum ScanInternals {
    /// The partition counter and descriptors of the decoupled engine.
    Decoupled { states: Handle },
    /// The block reductions of the block-wise engine.
    BlockWise { reductions: Handle },
}

impl ScanInternals {
    /// Allocates the buffers needed by the strategy to scan `n` elements with the monoid.
    pub fn allocate<M: Monoid>(client: &ComputeClient, strategy: &ScanStrategy, n: usize) -> Self {
        match strategy {
            ScanStrategy::Decoupled(config) => ScanInternals::Decoupled {
                states: DecoupledStates::<M>::allocate(client, config.partition_count(n)),
            },
            ScanStrategy::BlockWise(config) => ScanInternals::BlockWise {
                reductions: BlockReductions::<M>::allocate(client, config.block_count(n)),
            },
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ScanInternals::Decoupled { .. } => "decoupled",
            ScanInternals::BlockWise { .. } => "block-wise",
        }
    }
}

/// Runs the instruction with the engine of the strategy.
///
/// # Panics
///
/// If the internals were allocated for the other engine.
pub(crate) fn run_scan<I: DecoupledInstruction + BlockWiseInstruction>(
    client: &ComputeClient,
    strategy: &ScanStrategy,
    internals: &ScanInternals,
    n: usize,
    name: String,
    instruction: I,
) -> Result<(), LaunchError> {
    match (strategy, internals) {
        (ScanStrategy::Decoupled(config), ScanInternals::Decoupled { states }) => {
            launch_decoupled(client, instruction, states, config, n, name)
        }
        (ScanStrategy::BlockWise(config), ScanInternals::BlockWise { reductions }) => {
            launch_block_wise(client, instruction, reductions, config, n, name)
        }
        (strategy, internals) => panic!(
            "{} can't run with {} buffers",
            strategy.name(),
            internals.name()
        ),
    }
}

/// The buffers of a [PrefixSum].
#[derive(Debug, Clone)]
pub struct PrefixSumBuffers {
    /// The scanned elements.
    pub elements: Handle,
    /// The running totals, one per element.
    pub prefix_sum: Handle,
    pub internals: ScanInternals,
}

impl PrefixSumBuffers {
    /// Allocates zeroed buffers to scan `n` elements.
    pub fn allocate<N: Numeric>(client: &ComputeClient, strategy: &ScanStrategy, n: usize) -> Self {
        Self {
            elements: client.empty_for::<N>(n),
            prefix_sum: client.empty_for::<N>(n),
            internals: ScanInternals::allocate::<Sum<N>>(client, strategy, n),
        }
    }

    /// Makes the results of the previous runs visible to the host.
    ///
    /// Must be called before reading the results or writing new elements.
    pub fn expect_host_access(&self, client: &ComputeClient) {
        client.barrier(&[
            Barrier::device_to_host(&self.elements),
            Barrier::device_to_host(&self.prefix_sum),
        ]);
    }
}

/// Running totals of an array.
///
/// The result is inclusive unless the variant of the strategy is
/// [EXCLUSIVE](crate::BlockScanVariant::EXCLUSIVE). In reverse memory order, the element at
/// index `i` holds the total of the elements from `i` to the end of the array.
#[derive(Debug, Clone)]
pub struct PrefixSum<N: Numeric> {
    strategy: ScanStrategy,
    reverse_memory_order: bool,
    _n: PhantomData<N>,
}

impl<N: Numeric> PrefixSum<N> {
    pub fn new(strategy: ScanStrategy) -> Result<Self, ConfigError> {
        Ok(Self {
            strategy: strategy.validate()?,
            reverse_memory_order: false,
            _n: PhantomData,
        })
    }

    /// A scan from the last element to the first, only supported by the decoupled engine.
    pub fn with_reverse_memory_order(strategy: ScanStrategy) -> Result<Self, ConfigError> {
        if let ScanStrategy::BlockWise(_) = strategy {
            return Err(ConfigError::ReverseMemoryOrderUnsupported);
        }

        Ok(Self {
            reverse_memory_order: true,
            ..Self::new(strategy)?
        })
    }

    pub fn strategy(&self) -> &ScanStrategy {
        &self.strategy
    }

    pub fn max_element_count(&self) -> usize {
        self.strategy.max_element_count()
    }

    pub fn name(&self) -> String {
        match self.reverse_memory_order {
            true => format!("PrefixSum-reverse-{}", self.strategy.name()),
            false => format!("PrefixSum-{}", self.strategy.name()),
        }
    }

    /// Scans the first `n` elements.
    pub fn run(
        &self,
        client: &ComputeClient,
        buffers: &PrefixSumBuffers,
        n: usize,
    ) -> Result<(), LaunchError> {
        debug_assert!(
            n <= self.max_element_count(),
            "{} supports at most {} elements, got {n}",
            self.name(),
            self.max_element_count()
        );
        debug_assert!(buffers.elements.len_words() >= n, "Element buffer too small");
        debug_assert!(buffers.prefix_sum.len_words() >= n, "Prefix sum buffer too small");

        if n == 0 {
            return Ok(());
        }

        let instruction = PrefixSumInstruction::<N>::new(
            buffers.elements.clone(),
            buffers.prefix_sum.clone(),
            n,
            self.strategy.variant(),
            self.strategy.geometry(),
            self.reverse_memory_order,
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
