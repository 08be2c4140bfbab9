//! Task queue and worker pool
//!
//! The queue is filled completely before any worker starts. Workers pull one
//! task at a time and publish exactly one outcome per task. A worker that sees
//! no task for a whole poll window concludes the queue is drained and exits;
//! that is the only way a worker finishes normally.

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::time::Duration;

use crate::checker::{panic_message, Check};
use crate::error::ScanError;
use crate::models::{Outcome, Task};

/// Multi-consumer queue of pending tasks
#[derive(Clone)]
pub struct TaskQueue {
    tx: Sender<Task>,
    rx: Receiver<Task>,
}

impl TaskQueue {
    /// Create an empty, unbounded queue
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    /// Enqueue every task, returning how many were added
    pub fn populate(&self, tasks: impl IntoIterator<Item = Task>) -> usize {
        let mut count = 0;
        for task in tasks {
            // the queue owns its receiver, so sending cannot fail
            if self.tx.send(task).is_ok() {
                count += 1;
            }
        }
        count
    }

    /// Take the next task, waiting at most `wait`. `None` means drained.
    pub fn pop(&self, wait: Duration) -> Option<Task> {
        match self.rx.recv_timeout(wait) {
            Ok(task) => Some(task),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Number of tasks not yet taken
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    /// Whether every task has been taken
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixed set of checker threads
pub struct WorkerPool {
    pool: rayon::ThreadPool,
    size: usize,
}

impl WorkerPool {
    /// Build a pool of `size` worker threads.
    ///
    /// A panic escaping a worker loop is logged and ends that worker only;
    /// the task it was holding never produces an outcome.
    pub fn new(size: usize) -> Result<Self, ScanError> {
        let size = size.max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(size)
            .thread_name(|i| format!("checker-{}", i))
            .panic_handler(|payload| {
                log::error!(
                    "Parallel worker got unexpected error: {}",
                    panic_message(payload.as_ref())
                );
            })
            .build()?;
        Ok(Self { pool, size })
    }

    /// Number of workers
    pub fn size(&self) -> usize {
        self.size
    }

    /// Start every worker on `queue`, publishing into `outcomes`.
    ///
    /// Returns immediately. Workers hold their own clone of the outcome
    /// sender, so the caller should drop its sender to observe when all
    /// workers are gone.
    pub fn start(
        &self,
        queue: &TaskQueue,
        checker: Arc<dyn Check>,
        outcomes: &Sender<Outcome>,
        poll_window: Duration,
    ) {
        for id in 0..self.size {
            let queue = queue.clone();
            let checker = Arc::clone(&checker);
            let outcomes = outcomes.clone();
            self.pool
                .spawn(move || worker_loop(id, queue, checker, outcomes, poll_window));
        }
    }
}

fn worker_loop(
    id: usize,
    queue: TaskQueue,
    checker: Arc<dyn Check>,
    outcomes: Sender<Outcome>,
    poll_window: Duration,
) {
    log::debug!("Worker {} started", id);
    while let Some(task) = queue.pop(poll_window) {
        let outcome = checker.check(&task);
        if outcomes.send(outcome).is_err() {
            log::debug!("Worker {}: collector is gone, stopping", id);
            return;
        }
    }
    log::debug!(
        "Closing parallel worker {}, the worker has no more tasks to perform",
        id
    );
}
