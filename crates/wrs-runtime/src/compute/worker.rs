use std::{
    sync::{Arc, mpsc},
    thread,
};

use super::task::DispatchTask;

pub(crate) type TaskResult = Result<(), String>;

struct WorkerMessage {
    task: Arc<DispatchTask>,
    done: mpsc::Sender<TaskResult>,
}

/// A persistent thread executing dispatches.
///
/// The thread stops when the worker is dropped.
#[derive(Debug)]
pub(crate) struct Worker {
    tx: mpsc::Sender<WorkerMessage>,
}

impl Worker {
    pub(crate) fn new(thread_id: usize) -> Self {
        let (tx, rx) = mpsc::channel();
        let inner_worker = InnerWorker { thread_id, rx };
        thread::spawn(move || inner_worker.work());
        Self { tx }
    }

    pub(crate) fn send_task(
        &self,
        task: Arc<DispatchTask>,
        done: mpsc::Sender<TaskResult>,
    ) -> Result<(), String> {
        self.tx
            .send(WorkerMessage { task, done })
            .map_err(|err| format!("worker thread stopped: {err}"))
    }
}

struct InnerWorker {
    thread_id: usize,
    rx: mpsc::Receiver<WorkerMessage>,
}

impl InnerWorker {
    fn work(self) {
        log::trace!("Worker thread {} started", self.thread_id);
        for message in self.rx.iter() {
            let result = message.task.compute();
            // The dispatcher may have given up on this task already.
            let _ = message.done.send(result);
        }
        log::trace!("Worker thread {} stopped", self.thread_id);
    }
}
