use core::{marker::PhantomData, ops::Range};

use wrs_runtime::{
    Handle,
    element::Float,
    kernel::{CubeContext, CubeKernel, KernelBinding},
};

use super::{read, read_write, write};
use crate::{
    block_scan,
    block_wise::BlockWiseInstruction,
    decoupled::{DecoupledInstruction, PartitionContext},
    monoid::Sum,
};

#[derive(new)]
pub(crate) struct MeanInstruction<F: Float> {
    elements: Handle,
    mean: Handle,
    n: usize,
    _f: PhantomData<F>,
}

impl<F: Float> MeanInstruction<F> {
    fn sum(&self, range: Range<usize>) -> F {
        partition_sum(&self.elements, range)
    }
}

fn partition_sum<F: Float>(elements: &Handle, range: Range<usize>) -> F {
    block_scan::reduce::<Sum<F>, _>(range.map(|i| elements.load::<F>(i)))
}

impl<F: Float> DecoupledInstruction for MeanInstruction<F> {
    type Monoid = Sum<F>;
    type Local = ();

    fn bindings(&self) -> Vec<KernelBinding> {
        vec![read(&self.elements), write(&self.mean)]
    }

    fn local(&self, partition: &PartitionContext) -> ((), F) {
        ((), self.sum(partition.range.clone()))
    }

    fn finalize(&self, partition: &PartitionContext, _local: (), _exclusive: F, inclusive: F) {
        if partition.is_last {
            self.mean.store(0, inclusive.divide_by_count(self.n));
        }
    }
}

impl<F: Float> BlockWiseInstruction for MeanInstruction<F> {
    type Monoid = Sum<F>;

    fn reduce_bindings(&self) -> Vec<KernelBinding> {
        vec![read(&self.elements)]
    }

    fn combine_bindings(&self) -> Vec<KernelBinding> {
        vec![write(&self.mean)]
    }

    fn reduce(&self, block: &PartitionContext) -> F {
        self.sum(block.range.clone())
    }

    fn combine(&self, block: &PartitionContext, _exclusive: F, total: F) {
        if block.is_last {
            self.mean.store(0, total.divide_by_count(self.n));
        }
    }
}

/// Each partition adds its share of the mean to a zeroed scalar.
///
/// The additions happen in any order, so the result may differ in the last bits from run to
/// run.
#[derive(new)]
pub(crate) struct AtomicMeanKernel<F: Float> {
    elements: Handle,
    mean: Handle,
    n: usize,
    partition_size: usize,
    name: String,
    _f: PhantomData<F>,
}

impl<F: Float> CubeKernel for AtomicMeanKernel<F> {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn bindings(&self) -> Vec<KernelBinding> {
        vec![read(&self.elements), read_write(&self.mean)]
    }

    fn execute(&self, context: &CubeContext<'_>) {
        let partition =
            PartitionContext::of(context.cube_pos() as usize, self.partition_size, self.n);
        let sum: F = partition_sum(&self.elements, partition.range);
        self.mean.atomic_add_float(0, sum.divide_by_count(self.n));
    }
}
