/// Configuration of the worker pool.
#[derive(Default, Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct SchedulerConfig {
    /// The number of worker threads. Defaults to the available parallelism.
    #[serde(default)]
    pub worker_count: Option<usize>,
}

impl SchedulerConfig {
    /// The number of worker threads to spawn, at least one.
    pub fn worker_count(&self) -> usize {
        match self.worker_count {
            Some(count) => count.max(1),
            None => std::thread::available_parallelism()
                .map(|count| count.get())
                .unwrap_or(1),
        }
    }
}
