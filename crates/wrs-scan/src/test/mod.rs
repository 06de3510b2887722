#![allow(missing_docs)]

//! Tests exported to be instantiated against a client, with the `export_tests` feature.
//!
//! The consumer provides a `test_client()` function returning the
//! [ComputeClient](wrs_runtime::client::ComputeClient) to test with, then calls
//! [testgen_scan](crate::testgen_scan).

pub mod partition;

use rand::{Rng, SeedableRng, distr::Uniform, rngs::StdRng};
use wrs_runtime::element::Numeric;

// Random values are small integers, so every summation order gives the exact same result,
// even for floats.
const MAX_VALUE: i64 = 20;

/// Deterministic random elements in `[0, 20)`.
pub fn random_elements<N: Numeric>(n: usize) -> Vec<N> {
    StdRng::seed_from_u64(1234)
        .sample_iter(Uniform::<i64>::new(0, MAX_VALUE).unwrap())
        .take(n)
        .map(|value| N::from_i64(value).unwrap())
        .collect()
}

/// The pivot used by the partition tests, in the middle of the value range.
pub fn test_pivot<N: Numeric>() -> N {
    N::from_i64(MAX_VALUE / 2).unwrap()
}

// Every test is generated for each of these sizes.
#[macro_export]
macro_rules! test_sizes {
    () => {
        [0, 1, 7, 128, 1000, 4097, 20_000]
    };
}

// This macro generates all the tests.
#[macro_export]
macro_rules! testgen_scan {
    () => {
        mod test_scan {
            use super::*;

            $crate::testgen_prefix_sum!();
            $crate::testgen_partition!();
            $crate::testgen_prefix_partition!();
            $crate::testgen_mean!();
        }
    };
}
