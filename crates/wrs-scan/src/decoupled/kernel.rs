use core::ops::Range;

use wrs_runtime::{
    Handle, LaunchError,
    client::ComputeClient,
    hazard::{Access, Barrier},
    kernel::{CubeContext, CubeCount, CubeKernel, KernelBinding},
};

use super::{DecoupledStates, Lookback};
use crate::{DecoupledConfig, PartitionIdPolicy, monoid::Monoid};

/// The slice of the input processed by a single cube.
#[derive(new, Debug, Clone, PartialEq, Eq)]
pub struct PartitionContext {
    /// The partition id, which orders partitions in memory.
    pub id: usize,
    /// The element indices of the partition.
    pub range: Range<usize>,
    /// If this is the partition holding the last element.
    pub is_last: bool,
}

impl PartitionContext {
    /// The partition `id` of an array of `n` elements split in partitions of `partition_size`.
    pub fn of(id: usize, partition_size: usize, n: usize) -> Self {
        let start = id * partition_size;
        let end = (start + partition_size).min(n);
        Self::new(id, start..end, end == n)
    }
}

/// The value combined by an instruction.
pub type DecoupledValue<I> = <<I as DecoupledInstruction>::Monoid as Monoid>::Value;

/// The per-partition work of an algorithm run by the decoupled engine.
pub trait DecoupledInstruction: Send + Sync + 'static {
    /// The combine operation of the scan.
    type Monoid: Monoid;
    /// What the local phase hands over to the final phase, usually the local scan.
    type Local: Send;

    /// The buffers accessed by the instruction.
    fn bindings(&self) -> Vec<KernelBinding>;

    /// Processes the partition without any other partition, returning the local result and the
    /// partition aggregate.
    fn local(&self, partition: &PartitionContext) -> (Self::Local, DecoupledValue<Self>);

    /// Writes the results of the partition once its exclusive prefix is known.
    fn finalize(
        &self,
        partition: &PartitionContext,
        local: Self::Local,
        exclusive: DecoupledValue<Self>,
        inclusive: DecoupledValue<Self>,
    );
}

/// The kernel running a [DecoupledInstruction] with one cube per partition.
pub struct DecoupledKernel<I: DecoupledInstruction> {
    instruction: I,
    states: DecoupledStates<I::Monoid>,
    lookback: Lookback,
    id_policy: PartitionIdPolicy,
    partition_size: usize,
    n: usize,
    name: String,
}

impl<I: DecoupledInstruction> DecoupledKernel<I> {
    pub fn new(
        instruction: I,
        states: DecoupledStates<I::Monoid>,
        config: &DecoupledConfig,
        n: usize,
        name: String,
    ) -> Self {
        Self {
            instruction,
            states,
            lookback: Lookback::new(config.parallel_lookback_depth),
            id_policy: config.id_policy,
            partition_size: config.partition_size(),
            n,
            name,
        }
    }

    fn partition_id(&self, context: &CubeContext<'_>) -> usize {
        match self.id_policy {
            PartitionIdPolicy::Dynamic => self.states.acquire_partition_id(),
            PartitionIdPolicy::Static => context.cube_pos() as usize,
        }
    }
}

impl<I: DecoupledInstruction> CubeKernel for DecoupledKernel<I> {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn bindings(&self) -> Vec<KernelBinding> {
        let mut bindings = self.instruction.bindings();
        bindings.push(KernelBinding::new(
            self.states.handle().clone(),
            Access::ReadWrite,
        ));
        bindings
    }

    fn execute(&self, context: &CubeContext<'_>) {
        let id = self.partition_id(context);
        let partition = PartitionContext::of(id, self.partition_size, self.n);

        let (local, aggregate) = self.instruction.local(&partition);

        let exclusive = if id == 0 {
            self.states.publish_first(id, aggregate);
            <I::Monoid as Monoid>::identity()
        } else {
            self.states.publish_aggregate(id, aggregate);
            let Some(exclusive) = self.lookback.exclusive_prefix(&self.states, id, context) else {
                return;
            };
            self.states
                .publish_prefix(id, <I::Monoid as Monoid>::combine(exclusive, aggregate));
            exclusive
        };

        let inclusive = <I::Monoid as Monoid>::combine(exclusive, aggregate);
        self.instruction
            .finalize(&partition, local, exclusive, inclusive);
    }
}

/// Runs the instruction over `n` elements in a single dispatch.
///
/// The state buffer is zeroed before the dispatch, so it can be reused from run to run. It must
/// hold at least [DecoupledStates::size_words] words for the partition count of `n`.
pub fn launch_decoupled<I: DecoupledInstruction>(
    client: &ComputeClient,
    instruction: I,
    states: &Handle,
    config: &DecoupledConfig,
    n: usize,
    name: String,
) -> Result<(), LaunchError> {
    let partition_count = config.partition_count(n);
    if partition_count == 0 {
        return Ok(());
    }

    let states = DecoupledStates::<I::Monoid>::new(states.clone(), partition_count);

    // Partitions of the previous run may still be reading the states.
    client.barrier(&[Barrier::compute_to_transfer(states.handle())]);
    client.fill(states.handle(), 0);
    client.barrier(&[Barrier::transfer_to_compute(states.handle())]);

    log::debug!("Running {name} over {n} elements in {partition_count} partitions");

    let kernel = DecoupledKernel::new(instruction, states, config, n, name);
    client.launch(kernel, CubeCount::new(partition_count as u32))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monoid::Sum;
    use pretty_assertions::assert_eq;
    use wrs_runtime::client::ClientOptions;

    /// Writes the inclusive prefix of each partition, one element per partition.
    struct PartitionSums {
        input: Handle,
        output: Handle,
    }

    impl DecoupledInstruction for PartitionSums {
        type Monoid = Sum<u32>;
        type Local = ();

        fn bindings(&self) -> Vec<KernelBinding> {
            vec![
                KernelBinding::new(self.input.clone(), Access::Read),
                KernelBinding::new(self.output.clone(), Access::Write),
            ]
        }

        fn local(&self, partition: &PartitionContext) -> ((), u32) {
            ((), partition.range.clone().map(|i| self.input.load::<u32>(i)).sum())
        }

        fn finalize(&self, partition: &PartitionContext, _local: (), _exclusive: u32, inclusive: u32) {
            self.output.store(partition.id, inclusive);
        }
    }

    #[test]
    fn partition_context_clamps_last_partition() {
        assert_eq!(PartitionContext::of(2, 4, 10), PartitionContext::new(2, 8..10, true));
        assert_eq!(PartitionContext::of(0, 4, 10), PartitionContext::new(0, 0..4, false));
    }

    #[test]
    fn partitions_chain_their_prefixes() {
        for policy in [PartitionIdPolicy::Dynamic, PartitionIdPolicy::Static] {
            let client = ComputeClient::new(ClientOptions::new(4));
            let config = DecoupledConfig::new(2, 2)
                .with_parallel_lookback_depth(3)
                .with_id_policy(policy);
            let input = client.create(&[1u32; 50]);
            let output = client.empty(13);
            let states = DecoupledStates::<Sum<u32>>::allocate(&client, 13);

            let instruction = PartitionSums {
                input,
                output: output.clone(),
            };
            launch_decoupled(&client, instruction, &states, &config, 50, "sums".into()).unwrap();
            client.barrier(&[Barrier::device_to_host(&output)]);

            let expected: Vec<u32> = (1..=13).map(|p| (p * 4).min(50)).collect();
            assert_eq!(client.read::<u32>(&output), expected, "{policy}");
        }
    }
}
