use core::sync::atomic::Ordering;

use wrs_runtime::{
    Handle, LaunchError,
    client::{ClientOptions, ComputeClient},
    hazard::{Access, Barrier},
    kernel::{CubeContext, CubeCount, CubeKernel, KernelBinding},
};

/// Each cube waits for its predecessor's flag before writing its own value.
struct ChainKernel {
    flags: Handle,
    output: Handle,
}

impl CubeKernel for ChainKernel {
    fn name(&self) -> String {
        "chain".to_string()
    }

    fn bindings(&self) -> Vec<KernelBinding> {
        vec![
            KernelBinding::new(self.flags.clone(), Access::ReadWrite),
            KernelBinding::new(self.output.clone(), Access::Write),
        ]
    }

    fn execute(&self, context: &CubeContext<'_>) {
        let pos = context.cube_pos() as usize;
        let mut previous = 0;

        if pos > 0 {
            while self.flags.word(pos - 1).load(Ordering::Acquire) == 0 {
                core::hint::spin_loop();
            }
            previous = self.output.load::<u32>(pos - 1);
        }

        self.output.store(pos, previous + 1);
        self.flags.word(pos).store(1, Ordering::Release);
    }
}

struct PanicKernel;

impl CubeKernel for PanicKernel {
    fn name(&self) -> String {
        "panic".to_string()
    }

    fn bindings(&self) -> Vec<KernelBinding> {
        Vec::new()
    }

    fn execute(&self, context: &CubeContext<'_>) {
        if context.cube_pos() == 3 {
            panic!("cube three fails");
        }
    }
}

fn run_chain(worker_count: usize, cube_count: u32) -> Vec<u32> {
    let client = ComputeClient::new(ClientOptions::new(worker_count));
    let flags = client.empty(cube_count as usize);
    let output = client.empty(cube_count as usize);

    client
        .launch(
            ChainKernel {
                flags: flags.clone(),
                output: output.clone(),
            },
            CubeCount::new(cube_count),
        )
        .unwrap();
    client.barrier(&[Barrier::device_to_host(&output)]);

    client.read(&output)
}

#[test]
fn cubes_waiting_on_predecessors_complete_with_single_worker() {
    let output = run_chain(1, 64);

    assert_eq!(output, (1..=64).collect::<Vec<u32>>());
}

#[test]
fn cubes_waiting_on_predecessors_complete_with_many_workers() {
    let output = run_chain(8, 1000);

    assert_eq!(output, (1..=1000).collect::<Vec<u32>>());
}

#[test]
fn kernel_panic_is_a_launch_error() {
    let client = ComputeClient::new(ClientOptions::new(2));

    let result = client.launch(PanicKernel, CubeCount::new(8));

    match result {
        Err(LaunchError::Execution { reason, .. }) => assert!(reason.contains("cube three fails")),
        other => panic!("Expected an execution error, got {other:?}"),
    }

    // The pool is still usable afterwards.
    assert!(client.launch(PanicKernel, CubeCount::new(2)).is_ok());
}

#[test]
fn empty_dispatch_is_a_noop() {
    let client = ComputeClient::new(ClientOptions::new(2));

    assert!(client.launch(PanicKernel, CubeCount::new(0)).is_ok());
}

#[test]
fn host_roundtrip() {
    let client = ComputeClient::new(ClientOptions::new(1));
    let handle = client.create(&[1.5f32, -2.0, 3.25]);

    client.write(&handle, &[4.0f32]);

    assert_eq!(client.read::<f32>(&handle), vec![4.0, -2.0, 3.25]);
    assert_eq!(client.read_scalar::<f32>(&handle), 4.0);
}

#[test]
fn fill_then_read_after_barrier() {
    let client = ComputeClient::new(ClientOptions::new(1));
    let handle = client.empty(4);

    client.fill(&handle, 7);
    client.barrier(&[Barrier::device_to_host(&handle)]);

    assert_eq!(client.read::<u32>(&handle), vec![7; 4]);
}

#[cfg(debug_assertions)]
#[test]
#[should_panic(expected = "Missing barrier")]
fn read_without_barrier_is_caught() {
    let client = ComputeClient::new(ClientOptions::new(1));
    let handle = client.empty(4);

    client.fill(&handle, 1);
    client.read::<u32>(&handle);
}

#[cfg(debug_assertions)]
#[test]
#[should_panic(expected = "Missing barrier before fill")]
fn fill_after_kernel_needs_barrier() {
    let client = ComputeClient::new(ClientOptions::new(1));
    let flags = client.empty(2);
    let output = client.empty(2);

    client
        .launch(
            ChainKernel {
                flags: flags.clone(),
                output: output.clone(),
            },
            CubeCount::new(2),
        )
        .unwrap();
    client.barrier(&[Barrier::device_to_host(&output)]);

    client.fill(&flags, 0);
}
