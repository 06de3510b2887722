//! Scans of the elements owned by a single partition.
//!
//! A partition is processed by `workgroup_size` lanes, each owning `items_per_lane` elements.
//! The [variant](BlockScanVariant) decides how lanes cooperate. All variants compute the same
//! prefixes, but combine elements in a different order, so floating point results may differ in
//! the last bits.

use crate::{BlockScanVariant, monoid::Monoid};

/// The shape of the lanes processing a partition.
#[derive(new, Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockGeometry {
    pub workgroup_size: usize,
    pub items_per_lane: usize,
}

impl BlockGeometry {
    /// Elements per partition.
    pub fn size(&self) -> usize {
        self.workgroup_size * self.items_per_lane
    }
}

/// Replaces the values by their inclusive scan and returns the aggregate.
///
/// The values may be fewer than the geometry size for the last partition.
pub fn inclusive_scan<M: Monoid>(
    values: &mut [M::Value],
    variant: BlockScanVariant,
    geometry: BlockGeometry,
) -> M::Value {
    debug_assert!(
        values.len() <= geometry.size(),
        "{} values don't fit a partition of {}",
        values.len(),
        geometry.size()
    );

    if values.is_empty() {
        return M::identity();
    }

    if variant.contains(BlockScanVariant::RAKING) {
        raking_scan::<M>(values, geometry.items_per_lane.max(1));
    } else if variant.contains(BlockScanVariant::STRIDED) {
        for row in values.chunks_mut(geometry.workgroup_size.max(1)) {
            ranked_scan::<M>(row);
        }
        let mut carry = M::identity();
        for row in values.chunks_mut(geometry.workgroup_size.max(1)) {
            for value in row.iter_mut() {
                *value = M::combine(carry, *value);
            }
            carry = row[row.len() - 1];
        }
    } else {
        ranked_scan::<M>(values);
    }

    values[values.len() - 1]
}

/// Replaces the values by their exclusive scan and returns the aggregate.
pub fn exclusive_scan<M: Monoid>(
    values: &mut [M::Value],
    variant: BlockScanVariant,
    geometry: BlockGeometry,
) -> M::Value {
    let aggregate = inclusive_scan::<M>(values, variant, geometry);
    if !values.is_empty() {
        values.rotate_right(1);
        values[0] = M::identity();
    }
    aggregate
}

/// Scans with the inclusive or exclusive kind selected by the variant.
pub fn scan<M: Monoid>(
    values: &mut [M::Value],
    variant: BlockScanVariant,
    geometry: BlockGeometry,
) -> M::Value {
    if variant.is_exclusive() {
        exclusive_scan::<M>(values, variant, geometry)
    } else {
        inclusive_scan::<M>(values, variant, geometry)
    }
}

/// Combines every value, in order.
pub fn reduce<M: Monoid, I: IntoIterator<Item = M::Value>>(values: I) -> M::Value {
    values.into_iter().fold(M::identity(), M::combine)
}

// Each lane scans its run sequentially, then lane totals are scanned and added back.
fn raking_scan<M: Monoid>(values: &mut [M::Value], items_per_lane: usize) {
    let mut lane_totals = Vec::with_capacity(values.len().div_ceil(items_per_lane));

    for lane in values.chunks_mut(items_per_lane) {
        for i in 1..lane.len() {
            lane[i] = M::combine(lane[i - 1], lane[i]);
        }
        lane_totals.push(lane[lane.len() - 1]);
    }

    let mut offset = M::identity();
    for (lane, total) in values.chunks_mut(items_per_lane).zip(lane_totals) {
        if offset != M::identity() {
            for value in lane.iter_mut() {
                *value = M::combine(offset, *value);
            }
        }
        offset = M::combine(offset, total);
    }
}

// Kogge-Stone: at step k every value takes in the value 2^k positions before it.
fn ranked_scan<M: Monoid>(values: &mut [M::Value]) {
    let mut previous = values.to_vec();
    let mut offset = 1;

    while offset < values.len() {
        previous.copy_from_slice(values);
        for i in offset..values.len() {
            values[i] = M::combine(previous[i - offset], previous[i]);
        }
        offset *= 2;
    }
}
