use core::{marker::PhantomData, ops::Range};

use wrs_runtime::{Handle, element::Numeric, kernel::KernelBinding};

use super::{read, read_write, write};
use crate::{
    BlockScanVariant,
    block_scan::{self, BlockGeometry},
    block_wise::BlockWiseInstruction,
    decoupled::{DecoupledInstruction, PartitionContext},
    monoid::{Monoid, Sum},
};

#[derive(new)]
pub(crate) struct PrefixSumInstruction<N: Numeric> {
    elements: Handle,
    output: Handle,
    n: usize,
    variant: BlockScanVariant,
    geometry: BlockGeometry,
    reverse: bool,
    _n: PhantomData<N>,
}

impl<N: Numeric> PrefixSumInstruction<N> {
    /// The memory index of the `i`-th scanned element.
    fn index(&self, i: usize) -> usize {
        match self.reverse {
            true => self.n - 1 - i,
            false => i,
        }
    }

    fn local_scan(&self, range: Range<usize>) -> (Vec<N>, N) {
        let mut values: Vec<N> = range.map(|i| self.elements.load(self.index(i))).collect();
        let aggregate = block_scan::scan::<Sum<N>>(&mut values, self.variant, self.geometry);
        (values, aggregate)
    }
}

impl<N: Numeric> DecoupledInstruction for PrefixSumInstruction<N> {
    type Monoid = Sum<N>;
    type Local = Vec<N>;

    fn bindings(&self) -> Vec<KernelBinding> {
        vec![read(&self.elements), write(&self.output)]
    }

    fn local(&self, partition: &PartitionContext) -> (Vec<N>, N) {
        self.local_scan(partition.range.clone())
    }

    fn finalize(&self, partition: &PartitionContext, local: Vec<N>, exclusive: N, _inclusive: N) {
        for (i, value) in partition.range.clone().zip(local) {
            self.output
                .store(self.index(i), Sum::<N>::combine(exclusive, value));
        }
    }
}

impl<N: Numeric> BlockWiseInstruction for PrefixSumInstruction<N> {
    type Monoid = Sum<N>;

    fn reduce_bindings(&self) -> Vec<KernelBinding> {
        vec![read(&self.elements), write(&self.output)]
    }

    fn combine_bindings(&self) -> Vec<KernelBinding> {
        vec![read_write(&self.output)]
    }

    fn reduce(&self, block: &PartitionContext) -> N {
        let (values, aggregate) = self.local_scan(block.range.clone());
        for (i, value) in block.range.clone().zip(values) {
            self.output.store(self.index(i), value);
        }
        aggregate
    }

    fn combine(&self, block: &PartitionContext, exclusive: N, _total: N) {
        if block.id == 0 {
            return;
        }
        for i in block.range.clone() {
            let index = self.index(i);
            let local = self.output.load::<N>(index);
            self.output
                .store(index, Sum::<N>::combine(exclusive, local));
        }
    }
}
