use std::sync::Arc;

use wrs_runtime::{
    Handle, LaunchError,
    client::ComputeClient,
    hazard::{Access, Barrier},
    kernel::{CubeContext, CubeCount, CubeKernel, KernelBinding},
};

use super::BlockReductions;
use crate::{
    BlockScanVariant, BlockWiseConfig,
    block_scan::{self, BlockGeometry},
    decoupled::PartitionContext,
    monoid::Monoid,
};

/// The value combined by an instruction.
pub type BlockWiseValue<I> = <<I as BlockWiseInstruction>::Monoid as Monoid>::Value;

/// The per-block work of an algorithm run by the block-wise engine.
pub trait BlockWiseInstruction: Send + Sync + 'static {
    /// The combine operation of the scan.
    type Monoid: Monoid;

    /// The buffers accessed by the reduce pass.
    fn reduce_bindings(&self) -> Vec<KernelBinding>;

    /// The buffers accessed by the combine pass.
    fn combine_bindings(&self) -> Vec<KernelBinding>;

    /// Reduces the block, possibly storing local results for the combine pass.
    fn reduce(&self, block: &PartitionContext) -> BlockWiseValue<Self>;

    /// Writes the results of the block given its exclusive prefix and the total of every
    /// block.
    fn combine(
        &self,
        block: &PartitionContext,
        exclusive: BlockWiseValue<Self>,
        total: BlockWiseValue<Self>,
    );
}

/// First pass, one cube per block.
pub struct BlockReduceKernel<I: BlockWiseInstruction> {
    instruction: Arc<I>,
    reductions: Arc<BlockReductions<I::Monoid>>,
    block_size: usize,
    n: usize,
    name: String,
}

impl<I: BlockWiseInstruction> CubeKernel for BlockReduceKernel<I> {
    fn name(&self) -> String {
        format!("{}-reduce", self.name)
    }

    fn bindings(&self) -> Vec<KernelBinding> {
        let mut bindings = self.instruction.reduce_bindings();
        bindings.push(KernelBinding::new(
            self.reductions.handle().clone(),
            Access::Write,
        ));
        bindings
    }

    fn execute(&self, context: &CubeContext<'_>) {
        let block = PartitionContext::of(context.cube_pos() as usize, self.block_size, self.n);
        let reduction = self.instruction.reduce(&block);
        self.reductions.store(block.id, reduction);
    }
}

/// Second pass, a single cube scanning every block reduction.
pub struct TopLevelScanKernel<M: Monoid> {
    reductions: Arc<BlockReductions<M>>,
    variant: BlockScanVariant,
    geometry: BlockGeometry,
    name: String,
}

impl<M: Monoid> CubeKernel for TopLevelScanKernel<M> {
    fn name(&self) -> String {
        format!("{}-top-level", self.name)
    }

    fn bindings(&self) -> Vec<KernelBinding> {
        vec![KernelBinding::new(
            self.reductions.handle().clone(),
            Access::ReadWrite,
        )]
    }

    fn execute(&self, _context: &CubeContext<'_>) {
        let block_count = self.reductions.block_count();
        let mut values: Vec<M::Value> = (0..block_count)
            .map(|block| self.reductions.load(block))
            .collect();

        let total = block_scan::exclusive_scan::<M>(&mut values, self.variant, self.geometry);

        for (block, value) in values.into_iter().enumerate() {
            self.reductions.store(block, value);
        }
        self.reductions.store_total(total);
    }
}

/// Third pass, one cube per block.
pub struct BlockCombineKernel<I: BlockWiseInstruction> {
    instruction: Arc<I>,
    reductions: Arc<BlockReductions<I::Monoid>>,
    block_size: usize,
    n: usize,
    name: String,
}

impl<I: BlockWiseInstruction> CubeKernel for BlockCombineKernel<I> {
    fn name(&self) -> String {
        format!("{}-combine", self.name)
    }

    fn bindings(&self) -> Vec<KernelBinding> {
        let mut bindings = self.instruction.combine_bindings();
        bindings.push(KernelBinding::new(
            self.reductions.handle().clone(),
            Access::Read,
        ));
        bindings
    }

    fn execute(&self, context: &CubeContext<'_>) {
        let block = PartitionContext::of(context.cube_pos() as usize, self.block_size, self.n);
        let exclusive = self.reductions.load(block.id);
        let total = self.reductions.total();
        self.instruction.combine(&block, exclusive, total);
    }
}

/// Runs the instruction over `n` elements in three dispatches.
///
/// The reduction buffer must hold at least [BlockReductions::size_words] words for the block
/// count of `n`, which can't exceed the top level capacity of the configuration.
pub fn launch_block_wise<I: BlockWiseInstruction>(
    client: &ComputeClient,
    instruction: I,
    reductions: &Handle,
    config: &BlockWiseConfig,
    n: usize,
    name: String,
) -> Result<(), LaunchError> {
    let block_count = config.block_count(n);
    if block_count == 0 {
        return Ok(());
    }
    debug_assert!(
        block_count <= config.top_level_capacity(),
        "{block_count} blocks exceed the top level capacity of {}",
        config.top_level_capacity()
    );

    let instruction = Arc::new(instruction);
    let reductions = Arc::new(BlockReductions::<I::Monoid>::new(
        reductions.clone(),
        block_count,
    ));
    let cube_count = CubeCount::new(block_count as u32);

    log::debug!("Running {name} over {n} elements in {block_count} blocks");

    // The combine pass of the previous run may still be reading the reductions.
    client.barrier(&[Barrier::compute_to_compute(reductions.handle())]);

    client.launch(
        BlockReduceKernel {
            instruction: instruction.clone(),
            reductions: reductions.clone(),
            block_size: config.block_size(),
            n,
            name: name.clone(),
        },
        cube_count,
    )?;
    full_barrier(client, instruction.reduce_bindings(), reductions.handle());

    client.launch(
        TopLevelScanKernel {
            reductions: reductions.clone(),
            variant: config.variant,
            geometry: config.top_level_geometry(),
            name: name.clone(),
        },
        CubeCount::new_single(),
    )?;
    full_barrier(client, Vec::new(), reductions.handle());

    client.launch(
        BlockCombineKernel {
            instruction,
            reductions,
            block_size: config.block_size(),
            n,
            name,
        },
        cube_count,
    )
}

fn full_barrier(client: &ComputeClient, bindings: Vec<KernelBinding>, reductions: &Handle) {
    let mut barriers: Vec<Barrier<'_>> = bindings
        .iter()
        .map(|binding| Barrier::compute_to_compute(&binding.handle))
        .collect();
    barriers.push(Barrier::compute_to_compute(reductions));
    client.barrier(&barriers);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monoid::Sum;
    use pretty_assertions::assert_eq;
    use wrs_runtime::client::ClientOptions;

    /// Writes the exclusive prefix and the total seen by each block.
    struct BlockPrefixes {
        input: Handle,
        output: Handle,
    }

    impl BlockWiseInstruction for BlockPrefixes {
        type Monoid = Sum<i32>;

        fn reduce_bindings(&self) -> Vec<KernelBinding> {
            vec![KernelBinding::new(self.input.clone(), Access::Read)]
        }

        fn combine_bindings(&self) -> Vec<KernelBinding> {
            vec![KernelBinding::new(self.output.clone(), Access::Write)]
        }

        fn reduce(&self, block: &PartitionContext) -> i32 {
            block.range.clone().map(|i| self.input.load::<i32>(i)).sum()
        }

        fn combine(&self, block: &PartitionContext, exclusive: i32, total: i32) {
            self.output.store(2 * block.id, exclusive);
            self.output.store(2 * block.id + 1, total);
        }
    }

    #[test]
    fn blocks_receive_exclusive_prefix_and_total() {
        let client = ComputeClient::new(ClientOptions::new(3));
        let config = BlockWiseConfig::new(2, 2)
            .with_sequential_scan_length(2)
            .with_top_level(2, 4);
        let data: Vec<i32> = (0..30).collect();
        let input = client.create(&data);
        let output = client.empty(8);
        let reductions = BlockReductions::<Sum<i32>>::allocate(&client, 4);

        let instruction = BlockPrefixes {
            input,
            output: output.clone(),
        };
        launch_block_wise(&client, instruction, &reductions, &config, 30, "blocks".into())
            .unwrap();
        client.barrier(&[Barrier::device_to_host(&output)]);

        // Blocks of 8 elements: [0, 8), [8, 16), [16, 24), [24, 30).
        assert_eq!(
            client.read::<i32>(&output),
            vec![0, 435, 28, 435, 120, 435, 276, 435]
        );
    }

    #[test]
    fn reductions_hold_total_after_blocks() {
        assert_eq!(BlockReductions::<Sum<f32>>::size_words(4), 5);
    }
}
