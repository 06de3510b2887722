use std::{
    panic::AssertUnwindSafe,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU32, Ordering},
    },
};

use crate::kernel::{CubeContext, CubeKernel};

/// A dispatch shared by all the workers taking part in it.
pub(crate) struct DispatchTask {
    kernel: Arc<dyn CubeKernel>,
    cube_count: u32,
    cursor: AtomicU32,
    aborted: AtomicBool,
}

impl DispatchTask {
    pub(crate) fn new(kernel: Arc<dyn CubeKernel>, cube_count: u32) -> Self {
        Self {
            kernel,
            cube_count,
            cursor: AtomicU32::new(0),
            aborted: AtomicBool::new(false),
        }
    }

    /// Executes cubes until none are left.
    ///
    /// Cube positions come from a single counter, so cubes start in ascending order across all
    /// workers.
    pub(crate) fn compute(&self) -> Result<(), String> {
        loop {
            if self.aborted.load(Ordering::Relaxed) {
                return Ok(());
            }

            let cube_pos = self.cursor.fetch_add(1, Ordering::Relaxed);
            if cube_pos >= self.cube_count {
                return Ok(());
            }

            let context = CubeContext::new(cube_pos, self.cube_count, &self.aborted);
            let result =
                std::panic::catch_unwind(AssertUnwindSafe(|| self.kernel.execute(&context)));

            if let Err(payload) = result {
                self.aborted.store(true, Ordering::Relaxed);
                let reason = if let Some(msg) = payload.downcast_ref::<&str>() {
                    msg.to_string()
                } else if let Some(msg) = payload.downcast_ref::<String>() {
                    msg.clone()
                } else {
                    String::from("unknown panic payload")
                };
                return Err(format!("cube {cube_pos} of {}: {reason}", self.kernel.name()));
            }
        }
    }
}
