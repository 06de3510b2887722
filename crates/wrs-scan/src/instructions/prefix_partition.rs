use core::{marker::PhantomData, ops::Range};

use wrs_runtime::{Handle, element::Numeric, kernel::KernelBinding};

use super::{PartitionTargets, read, write};
use crate::{
    BlockScanVariant,
    block_scan::{self, BlockGeometry},
    block_wise::BlockWiseInstruction,
    decoupled::{DecoupledInstruction, PartitionContext},
    monoid::{HeavyLight, HeavyLightSum, Monoid},
};

/// The elements of a partition with the heavy and light counts and sums up to and including
/// each of them.
pub(crate) struct PrefixPartitionLocal<N> {
    values: Vec<N>,
    heavy: Vec<bool>,
    through: Vec<HeavyLight<N>>,
}

#[derive(new)]
pub(crate) struct PrefixPartitionInstruction<N: Numeric> {
    elements: Handle,
    pivot: Handle,
    targets: PartitionTargets,
    prefix: Handle,
    n: usize,
    variant: BlockScanVariant,
    geometry: BlockGeometry,
    _n: PhantomData<N>,
}

impl<N: Numeric> PrefixPartitionInstruction<N> {
    fn classify(&self, range: Range<usize>) -> impl Iterator<Item = (N, bool)> + '_ {
        let pivot = self.pivot.load::<N>(0);
        range.map(move |i| {
            let value = self.elements.load::<N>(i);
            (value, value > pivot)
        })
    }

    fn local_scan(&self, range: Range<usize>) -> (PrefixPartitionLocal<N>, HeavyLight<N>) {
        let (values, heavy): (Vec<N>, Vec<bool>) = self.classify(range).unzip();
        let mut through: Vec<HeavyLight<N>> = values
            .iter()
            .zip(heavy.iter())
            .map(|(value, heavy)| HeavyLight::element(*value, *heavy))
            .collect();
        let aggregate = block_scan::inclusive_scan::<HeavyLightSum<N>>(
            &mut through,
            self.variant,
            self.geometry,
        );

        let local = PrefixPartitionLocal {
            values,
            heavy,
            through,
        };
        (local, aggregate)
    }

    fn place(
        &self,
        partition: &PartitionContext,
        local: PrefixPartitionLocal<N>,
        exclusive: HeavyLight<N>,
        inclusive: HeavyLight<N>,
    ) {
        for (k, i) in partition.range.clone().enumerate() {
            let through = HeavyLightSum::<N>::combine(exclusive, local.through[k]);
            let (destination, prefix) = match local.heavy[k] {
                true => (through.heavy_count as usize - 1, through.heavy_sum),
                false => (self.n - through.light_count as usize, through.light_sum),
            };
            self.targets.place(destination, i, local.values[k]);
            self.prefix.store(destination, prefix);
        }

        if partition.is_last {
            self.targets.heavy_count.store(0, inclusive.heavy_count);
        }
    }

    fn all_bindings(&self) -> Vec<KernelBinding> {
        [read(&self.elements), read(&self.pivot), write(&self.prefix)]
            .into_iter()
            .chain(self.targets.bindings())
            .collect()
    }
}

impl<N: Numeric> DecoupledInstruction for PrefixPartitionInstruction<N> {
    type Monoid = HeavyLightSum<N>;
    type Local = PrefixPartitionLocal<N>;

    fn bindings(&self) -> Vec<KernelBinding> {
        self.all_bindings()
    }

    fn local(&self, partition: &PartitionContext) -> (PrefixPartitionLocal<N>, HeavyLight<N>) {
        self.local_scan(partition.range.clone())
    }

    fn finalize(
        &self,
        partition: &PartitionContext,
        local: PrefixPartitionLocal<N>,
        exclusive: HeavyLight<N>,
        inclusive: HeavyLight<N>,
    ) {
        self.place(partition, local, exclusive, inclusive);
    }
}

impl<N: Numeric> BlockWiseInstruction for PrefixPartitionInstruction<N> {
    type Monoid = HeavyLightSum<N>;

    fn reduce_bindings(&self) -> Vec<KernelBinding> {
        vec![read(&self.elements), read(&self.pivot)]
    }

    fn combine_bindings(&self) -> Vec<KernelBinding> {
        self.all_bindings()
    }

    fn reduce(&self, block: &PartitionContext) -> HeavyLight<N> {
        block_scan::reduce::<HeavyLightSum<N>, _>(
            self.classify(block.range.clone())
                .map(|(value, heavy)| HeavyLight::element(value, heavy)),
        )
    }

    fn combine(&self, block: &PartitionContext, exclusive: HeavyLight<N>, _total: HeavyLight<N>) {
        let (local, aggregate) = self.local_scan(block.range.clone());
        let inclusive = HeavyLightSum::<N>::combine(exclusive, aggregate);
        self.place(block, local, exclusive, inclusive);
    }
}
