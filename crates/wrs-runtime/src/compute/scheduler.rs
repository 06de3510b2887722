use std::sync::{Arc, mpsc};

use super::{task::DispatchTask, worker::Worker};
use crate::{BackTrace, LaunchError, kernel::CubeKernel};

/// Distributes the cubes of a dispatch over a pool of workers.
pub(crate) struct Scheduler {
    workers: Vec<Worker>,
}

impl core::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Scheduler {{ workers: {} }}", self.workers.len())
    }
}

impl Scheduler {
    pub(crate) fn new(worker_count: usize) -> Self {
        let workers = (0..worker_count.max(1)).map(Worker::new).collect();
        Self { workers }
    }

    pub(crate) fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Executes every cube of the kernel and waits for all of them to finish.
    pub(crate) fn dispatch_execute(
        &mut self,
        kernel: Arc<dyn CubeKernel>,
        cube_count: u32,
    ) -> Result<(), LaunchError> {
        if cube_count == 0 {
            return Ok(());
        }

        let task = Arc::new(DispatchTask::new(kernel, cube_count));
        let (send, receive) = mpsc::channel();
        let mut msg_count = 0;

        for worker in self.workers.iter().take(cube_count as usize) {
            worker
                .send_task(task.clone(), send.clone())
                .map_err(|reason| LaunchError::WorkerDisconnected { reason })?;
            msg_count += 1;
        }
        drop(send);

        let mut failure = None;
        for result in receive.iter() {
            if let Err(reason) = result {
                failure.get_or_insert(reason);
            }
            msg_count -= 1;
            if msg_count == 0 {
                break;
            }
        }

        if let Some(reason) = failure {
            return Err(LaunchError::Execution {
                reason,
                backtrace: BackTrace::capture(),
            });
        }

        if msg_count != 0 {
            return Err(LaunchError::WorkerDisconnected {
                reason: format!("{msg_count} workers never reported back"),
            });
        }

        Ok(())
    }
}
