use core::sync::atomic::{AtomicBool, Ordering};

use crate::{Handle, hazard::Access};

/// The number of cubes of a dispatch.
#[derive(new, Debug, Clone, Copy, PartialEq, Eq)]
pub struct CubeCount {
    /// Cubes are numbered `0..count`.
    pub count: u32,
}

impl CubeCount {
    /// A dispatch of a single cube.
    pub fn new_single() -> Self {
        Self::new(1)
    }
}

/// A buffer bound to a kernel with the way the kernel accesses it.
#[derive(new, Debug, Clone)]
pub struct KernelBinding {
    /// The bound buffer.
    pub handle: Handle,
    /// How the kernel accesses it.
    pub access: Access,
}

/// What a cube can query about its own execution.
#[derive(new, Debug)]
pub struct CubeContext<'a> {
    cube_pos: u32,
    cube_count: u32,
    aborted: &'a AtomicBool,
}

impl CubeContext<'_> {
    /// The launch index of the cube.
    pub fn cube_pos(&self) -> u32 {
        self.cube_pos
    }

    /// The number of cubes of the dispatch.
    pub fn cube_count(&self) -> u32 {
        self.cube_count
    }

    /// If another cube of the same dispatch panicked.
    ///
    /// Cubes waiting on other cubes should stop waiting when this becomes true, the cube they
    /// wait on might never run.
    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::Relaxed)
    }
}

/// A kernel executed once per cube.
///
/// Cubes of a single dispatch run concurrently on the worker pool. They are started in
/// ascending launch order, so a cube may wait on the results of cubes with a lower launch
/// index, but never on a higher one.
pub trait CubeKernel: Send + Sync + 'static {
    /// The kernel name, used for logging.
    fn name(&self) -> String;

    /// The buffers accessed by the kernel.
    fn bindings(&self) -> Vec<KernelBinding>;

    /// Executes a single cube.
    fn execute(&self, context: &CubeContext<'_>);
}
