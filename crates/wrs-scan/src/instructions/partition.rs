use core::{marker::PhantomData, ops::Range};

use wrs_runtime::{Handle, element::Numeric, kernel::KernelBinding};

use super::{read, write};
use crate::{
    BlockScanVariant,
    block_scan::{self, BlockGeometry},
    block_wise::BlockWiseInstruction,
    decoupled::{DecoupledInstruction, PartitionContext},
    monoid::Count,
};

/// The buffers written by a partition.
#[derive(new, Clone, Debug)]
pub(crate) struct PartitionTargets {
    pub heavy_count: Handle,
    pub indices: Handle,
    pub elements: Option<Handle>,
}

impl PartitionTargets {
    pub fn bindings(&self) -> impl Iterator<Item = KernelBinding> + '_ {
        [&self.heavy_count, &self.indices]
            .into_iter()
            .chain(self.elements.as_ref())
            .map(write)
    }

    /// Places the `i`-th element at `destination`.
    pub fn place<N: Numeric>(&self, destination: usize, i: usize, value: N) {
        self.indices.store(destination, i as u32);
        if let Some(elements) = &self.elements {
            elements.store(destination, value);
        }
    }
}

/// The classified elements of a partition with the number of heavy elements up to and
/// including each of them.
pub(crate) struct PartitionLocal<N> {
    values: Vec<N>,
    heavy: Vec<bool>,
    heavy_through: Vec<u32>,
}

#[derive(new)]
pub(crate) struct PartitionInstruction<N: Numeric> {
    elements: Handle,
    pivot: Handle,
    targets: PartitionTargets,
    n: usize,
    variant: BlockScanVariant,
    geometry: BlockGeometry,
    _n: PhantomData<N>,
}

impl<N: Numeric> PartitionInstruction<N> {
    fn classify(&self, range: Range<usize>) -> (Vec<N>, Vec<bool>) {
        let pivot = self.pivot.load::<N>(0);
        let values: Vec<N> = range.map(|i| self.elements.load(i)).collect();
        let heavy = values.iter().map(|value| *value > pivot).collect();
        (values, heavy)
    }

    fn local_scan(&self, range: Range<usize>) -> (PartitionLocal<N>, u32) {
        let (values, heavy) = self.classify(range);
        let mut heavy_through: Vec<u32> = heavy.iter().map(|heavy| *heavy as u32).collect();
        let aggregate =
            block_scan::inclusive_scan::<Count>(&mut heavy_through, self.variant, self.geometry);

        let local = PartitionLocal {
            values,
            heavy,
            heavy_through,
        };
        (local, aggregate)
    }

    // Heavy elements fill the output from the front, light elements from the back.
    fn place(&self, partition: &PartitionContext, local: PartitionLocal<N>, exclusive: u32) {
        for (k, i) in partition.range.clone().enumerate() {
            let heavy_through = (exclusive + local.heavy_through[k]) as usize;
            let destination = match local.heavy[k] {
                true => heavy_through - 1,
                false => self.n - (i + 1 - heavy_through),
            };
            self.targets.place(destination, i, local.values[k]);
        }

        if partition.is_last {
            let heavy_count = exclusive + local.heavy_through.last().copied().unwrap_or(0);
            self.targets.heavy_count.store(0, heavy_count);
        }
    }

    fn all_bindings(&self) -> Vec<KernelBinding> {
        [read(&self.elements), read(&self.pivot)]
            .into_iter()
            .chain(self.targets.bindings())
            .collect()
    }
}

impl<N: Numeric> DecoupledInstruction for PartitionInstruction<N> {
    type Monoid = Count;
    type Local = PartitionLocal<N>;

    fn bindings(&self) -> Vec<KernelBinding> {
        self.all_bindings()
    }

    fn local(&self, partition: &PartitionContext) -> (PartitionLocal<N>, u32) {
        self.local_scan(partition.range.clone())
    }

    fn finalize(
        &self,
        partition: &PartitionContext,
        local: PartitionLocal<N>,
        exclusive: u32,
        _inclusive: u32,
    ) {
        self.place(partition, local, exclusive);
    }
}

impl<N: Numeric> BlockWiseInstruction for PartitionInstruction<N> {
    type Monoid = Count;

    fn reduce_bindings(&self) -> Vec<KernelBinding> {
        vec![read(&self.elements), read(&self.pivot)]
    }

    fn combine_bindings(&self) -> Vec<KernelBinding> {
        self.all_bindings()
    }

    fn reduce(&self, block: &PartitionContext) -> u32 {
        let (_, heavy) = self.classify(block.range.clone());
        block_scan::reduce::<Count, _>(heavy.into_iter().map(|heavy| heavy as u32))
    }

    fn combine(&self, block: &PartitionContext, exclusive: u32, _total: u32) {
        let (local, _) = self.local_scan(block.range.clone());
        self.place(block, local, exclusive);
    }
}
