use pretty_assertions::assert_eq;
use wrs_runtime::{client::ComputeClient, element::Numeric};

use super::{random_elements, reference, test_pivot};
use crate::{Partition, PartitionBuffers, ScanStrategy};

#[macro_export]
macro_rules! testgen_partition {
    () => {
        mod partition {
            use super::*;

            $crate::testgen_partition!(@types [u32, i32, f32], [
                decoupled_dynamic,
                decoupled_static_raking,
                decoupled_ranked_depth4,
                block_wise_raking,
                block_wise_ranked_strided
            ]);
        }
    };
    (@types [$($ty:ident),*], $strategies:tt) => {
        $(
            $crate::testgen_partition!(@strategies $ty, $strategies);
        )*
    };
    (@strategies $ty:ident, [$($strategy:ident),*]) => {
        ::paste::paste! {
            $(
                #[test]
                fn [<test_ $ty _ $strategy>]() {
                    let client = test_client();
                    for n in $crate::test_sizes!() {
                        let strategy = $crate::test::strategies::$strategy();
                        $crate::test::partition::TestCase::new(n, strategy, true)
                            .test_partition::<$ty>(&client);
                    }
                }

                #[test]
                fn [<test_ $ty _ $strategy _indices_only>]() {
                    let client = test_client();
                    for n in $crate::test_sizes!() {
                        let strategy = $crate::test::strategies::$strategy();
                        $crate::test::partition::TestCase::new(n, strategy, false)
                            .test_partition::<$ty>(&client);
                    }
                }
            )*
        }
    };
}

#[derive(new, Debug)]
pub struct TestCase {
    pub n: usize,
    pub strategy: ScanStrategy,
    pub write_partition_elements: bool,
}

impl TestCase {
    pub fn test_partition<N: Numeric>(&self, client: &ComputeClient) {
        let data = random_elements::<N>(self.n);
        let pivot = test_pivot::<N>();
        let (heavy, light) = reference::partition(&data, pivot);

        let partition = Partition::<N>::new(self.strategy).unwrap();
        let buffers = PartitionBuffers::allocate::<N>(
            client,
            &self.strategy,
            self.n,
            self.write_partition_elements,
        );
        client.write(&buffers.elements, &data);
        client.write(&buffers.pivot, &[pivot]);

        partition.run(client, &buffers, self.n).unwrap();

        let output = buffers.download::<N>(client, self.n);
        let context = format!("{} with {} elements", partition.name(), self.n);
        assert_eq!(output.heavy_count, heavy.len(), "{context}");
        assert_eq!(output.heavy_indices(), heavy.as_slice(), "{context}");
        assert_eq!(output.light_indices(), light.as_slice(), "{context}");

        match output.elements {
            Some(elements) => {
                let expected: Vec<N> = output.indices.iter().map(|i| data[*i as usize]).collect();
                assert_eq!(elements, expected, "{context}");
            }
            None => assert!(!self.write_partition_elements, "{context}"),
        }
    }
}
