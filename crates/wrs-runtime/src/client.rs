use std::sync::Arc;

use crate::{
    Handle, LaunchError,
    compute::Scheduler,
    config::GlobalConfig,
    element::Element,
    hazard::{Access, Barrier, Hazard, PipelineStage},
    kernel::{CubeCount, CubeKernel, KernelBinding},
    logging::DispatchLogger,
};

/// Options used when creating a [ComputeClient].
#[derive(new, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientOptions {
    /// The number of worker threads.
    pub worker_count: usize,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self::new(GlobalConfig::get().scheduler.worker_count())
    }
}

/// The client is the entry point to allocate buffers, move data and launch kernels.
///
/// Host operations are synchronous: [read](Self::read) and [write](Self::write) complete before
/// returning, and [launch](Self::launch) returns once every cube has finished. Device
/// operations still record their accesses, so that a missing [barrier](Self::barrier) is caught
/// in debug builds.
#[derive(Clone)]
pub struct ComputeClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    scheduler: spin::Mutex<Scheduler>,
    logger: spin::Mutex<DispatchLogger>,
    worker_count: usize,
}

impl core::fmt::Debug for ComputeClient {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ComputeClient")
            .field("worker_count", &self.inner.worker_count)
            .finish()
    }
}

impl Default for ComputeClient {
    fn default() -> Self {
        Self::new(ClientOptions::default())
    }
}

impl ComputeClient {
    /// Creates a new client with its own worker pool.
    pub fn new(options: ClientOptions) -> Self {
        let config = GlobalConfig::get();
        let scheduler = Scheduler::new(options.worker_count);
        let worker_count = scheduler.worker_count();

        log::debug!("Creating a compute client with {worker_count} workers");

        Self {
            inner: Arc::new(ClientInner {
                scheduler: spin::Mutex::new(scheduler),
                logger: spin::Mutex::new(DispatchLogger::new(&config.logger)),
                worker_count,
            }),
        }
    }

    /// The number of worker threads executing cubes.
    pub fn worker_count(&self) -> usize {
        self.inner.worker_count
    }

    /// Given a slice of elements, returns a handle to a new buffer holding them.
    pub fn create<E: Element>(&self, data: &[E]) -> Handle {
        Handle::from_words(data.iter().map(|value| value.to_word()))
    }

    /// Reserves a zeroed buffer of `len_words` words.
    pub fn empty(&self, len_words: usize) -> Handle {
        Handle::from_words(core::iter::repeat_n(0, len_words))
    }

    /// Reserves a zeroed buffer of `len` elements.
    pub fn empty_for<E: Element>(&self, len: usize) -> Handle {
        // Every element is a single word.
        self.empty(len)
    }

    /// Reads every word of the buffer as elements.
    pub fn read<E: Element>(&self, handle: &Handle) -> Vec<E> {
        self.check_host(handle, Access::Read, "host read");
        (0..handle.len_words()).map(|index| handle.load(index)).collect()
    }

    /// Reads the first element of the buffer.
    pub fn read_scalar<E: Element>(&self, handle: &Handle) -> E {
        debug_assert!(handle.len_words() > 0, "Can't read a scalar from an empty buffer");
        self.check_host(handle, Access::Read, "host read");
        handle.load(0)
    }

    /// Writes elements at the start of the buffer.
    pub fn write<E: Element>(&self, handle: &Handle, data: &[E]) {
        debug_assert!(
            data.len() <= handle.len_words(),
            "Writing {} elements into a buffer of {} words",
            data.len(),
            handle.len_words()
        );
        self.check_host(handle, Access::Write, "host write");
        for (index, value) in data.iter().enumerate() {
            handle.store(index, *value);
        }
    }

    /// Sets every word of the buffer to `word` from the transfer stage.
    pub fn fill(&self, handle: &Handle, word: u32) {
        let hazard = handle.hazard().record(PipelineStage::TRANSFER, Access::Write);
        assert_no_hazard(hazard, handle, "fill");
        log::trace!("Filling buffer {:?} with {word:#x}", handle.id());

        for index in 0..handle.len_words() {
            handle
                .word(index)
                .store(word, core::sync::atomic::Ordering::Relaxed);
        }
    }

    /// Makes the pending accesses of each buffer visible to the next stages.
    pub fn barrier(&self, barriers: &[Barrier<'_>]) {
        for barrier in barriers {
            log::trace!(
                "Barrier on buffer {:?}: {:?} -> {:?}",
                barrier.handle.id(),
                barrier.src,
                barrier.dst
            );
            barrier.handle.hazard().release(barrier.src);
        }
    }

    /// Executes the kernel once per cube and waits for completion.
    pub fn launch<K: CubeKernel>(
        &self,
        kernel: K,
        cube_count: CubeCount,
    ) -> Result<(), LaunchError> {
        let name = kernel.name();

        for binding in merge_bindings(kernel.bindings()) {
            let hazard = binding
                .handle
                .hazard()
                .record(PipelineStage::COMPUTE, binding.access);
            assert_no_hazard(hazard, &binding.handle, &name);
        }

        log::trace!("Launching {name} with {} cubes", cube_count.count);

        let timing = self.inner.logger.lock().is_timing();
        let start = timing.then(web_time::Instant::now);

        let result = self
            .inner
            .scheduler
            .lock()
            .dispatch_execute(Arc::new(kernel), cube_count.count);

        let duration = start.map(|start| start.elapsed());
        self.inner
            .logger
            .lock()
            .log_dispatch(&name, cube_count.count, duration);

        result
    }

    fn check_host(&self, handle: &Handle, access: Access, operation: &str) {
        let hazard = handle.hazard().check(access);
        assert_no_hazard(hazard, handle, operation);
    }
}

fn assert_no_hazard(hazard: Option<Hazard>, handle: &Handle, operation: &str) {
    debug_assert!(
        hazard.is_none(),
        "Missing barrier before {operation} of buffer {:?}: {}",
        handle.id(),
        hazard.map(|hazard| hazard.to_string()).unwrap_or_default()
    );
}

// A buffer bound twice to the same kernel is accessed once with the combined access.
fn merge_bindings(bindings: Vec<KernelBinding>) -> Vec<KernelBinding> {
    let mut merged: Vec<KernelBinding> = Vec::with_capacity(bindings.len());

    for binding in bindings {
        match merged
            .iter_mut()
            .find(|existing| existing.handle.is_same(&binding.handle))
        {
            Some(existing) => existing.access = existing.access.merge(binding.access),
            None => merged.push(binding),
        }
    }

    merged
}
