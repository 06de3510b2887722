use std::sync::atomic::{AtomicBool, Ordering};

use pretty_assertions::assert_eq;
use rand::{Rng, SeedableRng, distr::Uniform, rngs::StdRng};
use wrs::{
    prelude::*,
    scan::{
        decoupled::{DecoupledStates, DescriptorState},
        monoid::Sum,
    },
};

fn client() -> ComputeClient {
    ComputeClient::new(ClientOptions::new(4))
}

fn run_prefix_sum<N: wrs::runtime::element::Numeric>(
    client: &ComputeClient,
    strategy: ScanStrategy,
    data: &[N],
) -> Vec<N> {
    let prefix_sum = PrefixSum::<N>::new(strategy).unwrap();
    let buffers = PrefixSumBuffers::allocate::<N>(client, &strategy, data.len());
    client.write(&buffers.elements, data);

    prefix_sum.run(client, &buffers, data.len()).unwrap();

    buffers.expect_host_access(client);
    client.read(&buffers.prefix_sum)
}

fn exclusive(variant: BlockScanVariant) -> BlockScanVariant {
    variant.difference(BlockScanVariant::INCLUSIVE) | BlockScanVariant::EXCLUSIVE
}

#[test]
fn ones_over_five_partitions() {
    let client = client();
    let data = vec![1u32; 10_000];
    let decoupled = DecoupledConfig::new(256, 8);
    let block_wise = BlockWiseConfig::new(256, 8);
    assert_eq!(decoupled.partition_count(data.len()), 5);
    assert_eq!(block_wise.block_count(data.len()), 5);

    let inclusive: Vec<u32> = (1..=10_000).collect();
    let exclusive_expected: Vec<u32> = (0..10_000).collect();

    for strategy in [
        ScanStrategy::Decoupled(decoupled),
        ScanStrategy::BlockWise(block_wise),
    ] {
        assert_eq!(run_prefix_sum(&client, strategy, &data), inclusive);
    }
    for strategy in [
        ScanStrategy::Decoupled(decoupled.with_variant(exclusive(decoupled.variant))),
        ScanStrategy::BlockWise(block_wise.with_variant(exclusive(block_wise.variant))),
    ] {
        assert_eq!(run_prefix_sum(&client, strategy, &data), exclusive_expected);
    }
}

#[test]
fn partition_keeps_group_order() {
    let client = client();
    let data = [3u32, 1, 4, 1, 5, 9, 2];

    for strategy in [
        ScanStrategy::Decoupled(DecoupledConfig::new(2, 1)),
        ScanStrategy::BlockWise(BlockWiseConfig::new(2, 1)),
    ] {
        let partition = Partition::<u32>::new(strategy).unwrap();
        let buffers = PartitionBuffers::allocate::<u32>(&client, &strategy, data.len(), true);
        client.write(&buffers.elements, &data);
        client.write(&buffers.pivot, &[3u32]);

        partition.run(&client, &buffers, data.len()).unwrap();

        buffers.expect_host_access(&client);
        let placed = client.read::<u32>(buffers.partition_elements.as_ref().unwrap());
        assert_eq!(placed, vec![4, 5, 9, 2, 1, 1, 3]);

        let output = buffers.download::<u32>(&client, data.len());
        assert_eq!(output.heavy_count, 3);
        assert_eq!(output.heavy_elements().unwrap(), &[4, 5, 9]);
        assert_eq!(output.light_elements().unwrap(), &[3, 1, 1, 2]);
        assert_eq!(output.heavy_indices(), &[2, 4, 5]);
        assert_eq!(output.light_indices(), &[0, 1, 3, 6]);
    }
}

#[test]
fn prefix_partition_sums_each_group() {
    let client = client();
    let data = [3.0f32, 1.0, 4.0, 1.0, 5.0, 9.0, 2.0];
    let strategy = ScanStrategy::Decoupled(DecoupledConfig::new(1, 2));
    let prefix_partition = PrefixPartition::<f32>::new(strategy).unwrap();
    let buffers = PrefixPartitionBuffers::allocate::<f32>(&client, &strategy, data.len(), false);
    client.write(&buffers.partition.elements, &data);
    client.write(&buffers.partition.pivot, &[3.0f32]);

    prefix_partition.run(&client, &buffers, data.len()).unwrap();

    let output = buffers.download::<f32>(&client, data.len());
    assert_eq!(output.heavy_prefix(), &[4.0, 9.0, 18.0]);
    assert_eq!(output.light_prefix(), &[3.0, 4.0, 5.0, 7.0]);
    assert_eq!(output.partition.elements, None);
}

#[test]
fn reused_partition_buffers_are_empty_after_empty_run() {
    let client = client();
    let data = [3u32, 1, 4, 1, 5, 9, 2];

    for strategy in [
        ScanStrategy::Decoupled(DecoupledConfig::new(2, 1)),
        ScanStrategy::BlockWise(BlockWiseConfig::new(2, 1)),
    ] {
        let partition = Partition::<u32>::new(strategy).unwrap();
        let buffers = PartitionBuffers::allocate::<u32>(&client, &strategy, data.len(), true);
        client.write(&buffers.elements, &data);
        client.write(&buffers.pivot, &[3u32]);

        partition.run(&client, &buffers, data.len()).unwrap();
        assert_eq!(buffers.download::<u32>(&client, data.len()).heavy_count, 3);

        partition.run(&client, &buffers, 0).unwrap();

        let output = buffers.download::<u32>(&client, 0);
        assert_eq!(output.heavy_count, 0);
        assert!(output.heavy_indices().is_empty());
        assert!(output.light_indices().is_empty());
        assert_eq!(output.heavy_elements(), Some(&[][..]));
        assert_eq!(output.light_elements(), Some(&[][..]));
    }
}

#[test]
fn reused_prefix_partition_buffers_are_empty_after_empty_run() {
    let client = client();
    let data = [3u32, 1, 4, 1, 5, 9, 2];

    for strategy in [
        ScanStrategy::Decoupled(DecoupledConfig::new(2, 1)),
        ScanStrategy::BlockWise(BlockWiseConfig::new(2, 1)),
    ] {
        let prefix_partition = PrefixPartition::<u32>::new(strategy).unwrap();
        let buffers = PrefixPartitionBuffers::allocate::<u32>(&client, &strategy, data.len(), true);
        client.write(&buffers.partition.elements, &data);
        client.write(&buffers.partition.pivot, &[3u32]);

        prefix_partition.run(&client, &buffers, data.len()).unwrap();
        assert_eq!(buffers.download::<u32>(&client, data.len()).heavy_prefix(), &[4, 9, 18]);

        prefix_partition.run(&client, &buffers, 0).unwrap();

        let output = buffers.download::<u32>(&client, 0);
        assert_eq!(output.partition.heavy_count, 0);
        assert!(output.heavy_prefix().is_empty());
        assert!(output.light_prefix().is_empty());
        assert!(output.partition.heavy_indices().is_empty());
    }
}

#[test]
fn single_element_is_its_own_prefix() {
    let client = client();
    let strategy = ScanStrategy::Decoupled(DecoupledConfig::new(4, 4));
    let prefix_sum = PrefixSum::<f32>::new(strategy).unwrap();
    let buffers = PrefixSumBuffers::allocate::<f32>(&client, &strategy, 1);
    client.write(&buffers.elements, &[2.5f32]);

    prefix_sum.run(&client, &buffers, 1).unwrap();

    buffers.expect_host_access(&client);
    assert_eq!(client.read::<f32>(&buffers.prefix_sum), vec![2.5]);

    let wrs::scan::ScanInternals::Decoupled { states } = &buffers.internals else {
        panic!("decoupled buffers expected");
    };
    client.barrier(&[Barrier::device_to_host(states)]);
    let layout = DecoupledStates::<Sum<f32>>::layout();
    let state = layout.element_offset(0) + layout.element.offset_of("state").unwrap();
    assert_eq!(
        client.read::<u32>(states)[state],
        DescriptorState::PrefixAvailable.to_word()
    );
}

#[test]
fn empty_input_does_no_work() {
    let client = client();

    for strategy in [
        ScanStrategy::Decoupled(DecoupledConfig::default()),
        ScanStrategy::BlockWise(BlockWiseConfig::default()),
    ] {
        let prefix_sum = PrefixSum::<u32>::new(strategy).unwrap();
        let buffers = PrefixSumBuffers::allocate::<u32>(&client, &strategy, 0);

        prefix_sum.run(&client, &buffers, 0).unwrap();

        buffers.expect_host_access(&client);
        assert_eq!(client.read::<u32>(&buffers.prefix_sum), Vec::<u32>::new());
    }

    let mean = Mean::<f32>::new(MeanStrategy::default()).unwrap();
    let buffers = MeanBuffers::allocate::<f32>(&client, &MeanStrategy::default(), 0);
    client.write(&buffers.mean, &[-1.0f32]);
    mean.run(&client, &buffers, 0).unwrap();
    assert_eq!(buffers.download::<f32>(&client), -1.0);
}

#[test]
fn engines_agree_on_fractional_data() {
    let client = client();
    let data: Vec<f32> = StdRng::seed_from_u64(42)
        .sample_iter(Uniform::new(0.0f32, 1.0).unwrap())
        .take(50_000)
        .collect();

    let decoupled = run_prefix_sum(
        &client,
        ScanStrategy::Decoupled(DecoupledConfig::new(64, 4)),
        &data,
    );
    let block_wise = run_prefix_sum(
        &client,
        ScanStrategy::BlockWise(BlockWiseConfig::new(64, 4).with_top_level(64, 4)),
        &data,
    );

    for (i, (lhs, rhs)) in decoupled.iter().zip(block_wise.iter()).enumerate() {
        let tolerance = 1e-4 * lhs.abs().max(1.0);
        assert!(
            (lhs - rhs).abs() <= tolerance,
            "Prefix {i} differs: {lhs} != {rhs}"
        );
    }
}

#[test]
fn reruns_are_identical() {
    let client = client();
    let data: Vec<u32> = StdRng::seed_from_u64(7)
        .sample_iter(Uniform::new(0u32, 100).unwrap())
        .take(30_000)
        .collect();
    let strategy = ScanStrategy::Decoupled(DecoupledConfig::new(32, 2).with_parallel_lookback_depth(2));
    let prefix_sum = PrefixSum::<u32>::new(strategy).unwrap();
    let buffers = PrefixSumBuffers::allocate::<u32>(&client, &strategy, data.len());
    client.write(&buffers.elements, &data);

    let mut results = Vec::new();
    for _ in 0..3 {
        prefix_sum.run(&client, &buffers, data.len()).unwrap();
        buffers.expect_host_access(&client);
        results.push(client.read::<u32>(&buffers.prefix_sum));
    }

    assert_eq!(results[0], results[1]);
    assert_eq!(results[1], results[2]);
}

#[test]
fn descriptors_never_move_backward() {
    let client = client();
    let n = 100_000;
    let config = DecoupledConfig::new(8, 2).with_parallel_lookback_depth(8);
    let strategy = ScanStrategy::Decoupled(config);
    let partition_count = config.partition_count(n);
    let prefix_sum = PrefixSum::<u32>::new(strategy).unwrap();
    let buffers = PrefixSumBuffers::allocate::<u32>(&client, &strategy, n);
    client.write(&buffers.elements, &vec![1u32; n]);
    let wrs::scan::ScanInternals::Decoupled { states } = &buffers.internals else {
        panic!("decoupled buffers expected");
    };
    let layout = DecoupledStates::<Sum<u32>>::layout();
    let state_offset = layout.element.offset_of("state").unwrap();
    let done = AtomicBool::new(false);

    let regressions = std::thread::scope(|scope| {
        let observer = scope.spawn(|| {
            let mut seen = vec![0u32; partition_count];
            let mut regressions = 0;
            while !done.load(Ordering::Acquire) {
                for (partition, last) in seen.iter_mut().enumerate() {
                    let word = states.word(layout.element_offset(partition) + state_offset);
                    let state = word.load(Ordering::Acquire);
                    if state < *last {
                        regressions += 1;
                    }
                    *last = state;
                }
            }
            regressions
        });

        prefix_sum.run(&client, &buffers, n).unwrap();
        done.store(true, Ordering::Release);
        observer.join().unwrap()
    });

    assert_eq!(regressions, 0);
    buffers.expect_host_access(&client);
    assert_eq!(client.read::<u32>(&buffers.prefix_sum)[n - 1], n as u32);
}

#[test]
fn reverse_memory_order_scans_from_the_end() {
    let client = client();
    let data = [1u32, 2, 3, 4, 5, 6, 7, 8, 9];
    let config = DecoupledConfig::new(2, 2);

    let prefix_sum =
        PrefixSum::<u32>::with_reverse_memory_order(ScanStrategy::Decoupled(config)).unwrap();
    let buffers =
        PrefixSumBuffers::allocate::<u32>(&client, &ScanStrategy::Decoupled(config), data.len());
    client.write(&buffers.elements, &data);
    prefix_sum.run(&client, &buffers, data.len()).unwrap();
    buffers.expect_host_access(&client);

    assert_eq!(
        client.read::<u32>(&buffers.prefix_sum),
        vec![45, 44, 42, 39, 35, 30, 24, 17, 9]
    );
}

#[test]
fn mean_then_prefix_partition() {
    let client = client();
    let data: Vec<f32> = (0..1001).map(|i| if i % 2 == 0 { 1.0 } else { 10.0 }).collect();
    let heavy: Vec<u32> = (0..1001).filter(|i| i % 2 == 1).collect();
    let light: Vec<u32> = (0..1001).filter(|i| i % 2 == 0).collect();
    let scan = ScanStrategy::BlockWise(BlockWiseConfig::new(16, 4).with_top_level(16, 4));

    for mean in [
        MeanStrategy::Decoupled(DecoupledConfig::new(32, 2)),
        MeanStrategy::Atomic(AtomicMeanConfig::new(32, 2)),
    ] {
        let pipeline = MeanPrefixPartition::<f32>::new(mean, scan).unwrap();
        let buffers =
            MeanPrefixPartitionBuffers::allocate::<f32>(&client, &mean, &scan, data.len(), true);
        client.write(&buffers.mean.elements, &data);

        for _ in 0..2 {
            pipeline.run(&client, &buffers, data.len()).unwrap();
            buffers.expect_host_access(&client);
        }

        let average = buffers.mean.download::<f32>(&client);
        assert!((average - 5501.0 / 1001.0).abs() < 1e-3, "{average}");

        let output = buffers.prefix_partition.download::<f32>(&client, data.len());
        assert_eq!(output.partition.heavy_indices(), heavy.as_slice());
        assert_eq!(output.partition.light_indices(), light.as_slice());
        assert_eq!(output.heavy_prefix().last(), Some(&5000.0));
        assert_eq!(output.light_prefix().last(), Some(&501.0));
    }
}

#[test]
fn invalid_configurations_are_rejected() {
    let stable = DecoupledConfig::default().with_summation(SummationMode::Stable);
    assert_eq!(
        PrefixSum::<f32>::new(ScanStrategy::Decoupled(stable)).unwrap_err(),
        ConfigError::StableSummationUnsupported
    );

    let variant = BlockScanVariant::RAKING | BlockScanVariant::RANKED;
    assert!(matches!(
        Partition::<u32>::new(ScanStrategy::Decoupled(
            DecoupledConfig::default().with_variant(variant)
        )),
        Err(ConfigError::InvalidVariant { .. })
    ));

    for depth in [0, 65] {
        assert_eq!(
            PrefixPartition::<u32>::new(ScanStrategy::Decoupled(
                DecoupledConfig::default().with_parallel_lookback_depth(depth)
            ))
            .unwrap_err(),
            ConfigError::InvalidLookbackDepth { depth, max: 64 }
        );
    }

    assert_eq!(
        PrefixSum::<u32>::with_reverse_memory_order(ScanStrategy::BlockWise(
            BlockWiseConfig::default()
        ))
        .unwrap_err(),
        ConfigError::ReverseMemoryOrderUnsupported
    );

    assert_eq!(
        Mean::<f32>::new(MeanStrategy::Atomic(AtomicMeanConfig::new(0, 8))).unwrap_err(),
        ConfigError::ZeroSize {
            name: "workgroup size"
        }
    );
}

#[test]
#[should_panic(expected = "can't run with block-wise buffers")]
fn mismatched_buffers_panic() {
    let client = client();
    let block_wise = ScanStrategy::BlockWise(BlockWiseConfig::default());
    let prefix_sum = PrefixSum::<u32>::new(ScanStrategy::default()).unwrap();
    let buffers = PrefixSumBuffers::allocate::<u32>(&client, &block_wise, 16);

    let _ = prefix_sum.run(&client, &buffers, 16);
}

#[cfg(debug_assertions)]
#[test]
#[should_panic(expected = "Missing barrier")]
fn rerun_without_barrier_panics() {
    let client = client();
    let strategy = ScanStrategy::default();
    let prefix_sum = PrefixSum::<u32>::new(strategy).unwrap();
    let buffers = PrefixSumBuffers::allocate::<u32>(&client, &strategy, 16);

    prefix_sum.run(&client, &buffers, 16).unwrap();
    prefix_sum.run(&client, &buffers, 16).unwrap();
}
