use core::{fmt::Debug, marker::PhantomData};

use wrs_runtime::{
    Handle,
    element::{Element, Numeric},
    layout::{ScalarType, StructLayout},
};

/// An identity value and an associative combine operation.
///
/// Values are stored in buffers as consecutive words described by [layout](Monoid::layout).
/// Combining is not required to be commutative: `combine(lhs, rhs)` always has the elements
/// of `lhs` before those of `rhs`.
pub trait Monoid: Send + Sync + 'static {
    /// The combined value.
    type Value: Copy + Debug + PartialEq + Send + Sync + 'static;

    /// The fields of a stored value.
    fn layout() -> StructLayout;

    /// The value that leaves any other value unchanged when combined.
    fn identity() -> Self::Value;

    /// Combines two values.
    fn combine(lhs: Self::Value, rhs: Self::Value) -> Self::Value;

    /// Stores a value at the given word offset without ordering constraints.
    fn store(handle: &Handle, offset: usize, value: Self::Value);

    /// Loads a value from the given word offset without ordering constraints.
    fn load(handle: &Handle, offset: usize) -> Self::Value;

    /// The number of words of a stored value.
    fn size_words() -> usize {
        Self::layout().size_words()
    }
}

/// Sum of numbers.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sum<N: Numeric> {
    _n: PhantomData<N>,
}

impl<N: Numeric> Monoid for Sum<N> {
    type Value = N;

    fn layout() -> StructLayout {
        StructLayout::new().with_field("sum", N::SCALAR)
    }

    fn identity() -> N {
        N::zero()
    }

    fn combine(lhs: N, rhs: N) -> N {
        lhs.accumulate(rhs)
    }

    fn store(handle: &Handle, offset: usize, value: N) {
        handle.store(offset, value)
    }

    fn load(handle: &Handle, offset: usize) -> N {
        handle.load(offset)
    }
}

/// Number of elements above a pivot.
#[derive(Debug, Clone, Copy, Default)]
pub struct Count;

impl Monoid for Count {
    type Value = u32;

    fn layout() -> StructLayout {
        StructLayout::new().with_field("count", ScalarType::U32)
    }

    fn identity() -> u32 {
        0
    }

    fn combine(lhs: u32, rhs: u32) -> u32 {
        lhs.wrapping_add(rhs)
    }

    fn store(handle: &Handle, offset: usize, value: u32) {
        handle.store(offset, value)
    }

    fn load(handle: &Handle, offset: usize) -> u32 {
        handle.load(offset)
    }
}

/// Counts and sums of the heavy and light groups of a partition.
#[derive(new, Debug, Clone, Copy, PartialEq)]
pub struct HeavyLight<N> {
    pub heavy_count: u32,
    pub heavy_sum: N,
    pub light_count: u32,
    pub light_sum: N,
}

impl<N: Numeric> HeavyLight<N> {
    /// The value of a single element.
    pub fn element(value: N, heavy: bool) -> Self {
        if heavy {
            Self::new(1, value, 0, N::zero())
        } else {
            Self::new(0, N::zero(), 1, value)
        }
    }
}

/// Pairwise combination of [HeavyLight] values.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeavyLightSum<N: Numeric> {
    _n: PhantomData<N>,
}

impl<N: Numeric> Monoid for HeavyLightSum<N> {
    type Value = HeavyLight<N>;

    fn layout() -> StructLayout {
        StructLayout::new()
            .with_field("heavy_count", ScalarType::U32)
            .with_field("heavy_sum", N::SCALAR)
            .with_field("light_count", ScalarType::U32)
            .with_field("light_sum", N::SCALAR)
    }

    fn identity() -> HeavyLight<N> {
        HeavyLight::new(0, N::zero(), 0, N::zero())
    }

    fn combine(lhs: HeavyLight<N>, rhs: HeavyLight<N>) -> HeavyLight<N> {
        HeavyLight::new(
            lhs.heavy_count.wrapping_add(rhs.heavy_count),
            lhs.heavy_sum.accumulate(rhs.heavy_sum),
            lhs.light_count.wrapping_add(rhs.light_count),
            lhs.light_sum.accumulate(rhs.light_sum),
        )
    }

    fn store(handle: &Handle, offset: usize, value: HeavyLight<N>) {
        handle.store(offset, value.heavy_count);
        handle.store(offset + 1, value.heavy_sum);
        handle.store(offset + 2, value.light_count);
        handle.store(offset + 3, value.light_sum);
    }

    fn load(handle: &Handle, offset: usize) -> HeavyLight<N> {
        HeavyLight::new(
            handle.load(offset),
            handle.load(offset + 1),
            handle.load(offset + 2),
            handle.load(offset + 3),
        )
    }
}
