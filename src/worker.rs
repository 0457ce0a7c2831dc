//! Worker pools for asynchronous asset reads.
//!
//! Jobs are fire-and-forget closures; [`submit`] wraps a job so its result
//! arrives on a single-slot channel the frame thread can poll without
//! blocking.

use crossbeam::channel::{self, Receiver, TryRecvError};
use std::panic::{self, AssertUnwindSafe};

/// Boxed unit of work
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Thread pool collaborator
pub trait WorkerPool: Send + Sync {
    fn execute(&self, job: Job);

    fn thread_count(&self) -> usize;
}

/// Run `task` on `pool` and return a future for its result.
///
/// A panic inside the task is caught; the future then becomes ready
/// without a value.
pub fn submit<T, F>(pool: &dyn WorkerPool, task: F) -> TaskFuture<T>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let (sender, receiver) = channel::bounded(1);
    pool.execute(Box::new(move || {
        if let Ok(value) = panic::catch_unwind(AssertUnwindSafe(task)) {
            // Receiver may already be gone if the load was discarded
            let _ = sender.send(value);
        }
    }));
    TaskFuture::new(receiver)
}

enum FutureState<T> {
    Pending(Receiver<T>),
    Ready(Option<T>),
}

/// Handle to the result of a submitted task
pub struct TaskFuture<T> {
    state: FutureState<T>,
}

impl<T> TaskFuture<T> {
    fn new(receiver: Receiver<T>) -> Self {
        Self {
            state: FutureState::Pending(receiver),
        }
    }

    /// Already-completed future
    pub fn ready(value: T) -> Self {
        Self {
            state: FutureState::Ready(Some(value)),
        }
    }

    /// Non-blocking completion check
    pub fn is_ready(&mut self) -> bool {
        let FutureState::Pending(receiver) = &self.state else {
            return true;
        };
        match receiver.try_recv() {
            Ok(value) => {
                self.state = FutureState::Ready(Some(value));
                true
            }
            Err(TryRecvError::Empty) => false,
            Err(TryRecvError::Disconnected) => {
                self.state = FutureState::Ready(None);
                true
            }
        }
    }

    /// Block until the task finishes
    pub fn wait(&mut self) {
        if let FutureState::Pending(receiver) = &self.state {
            let value = receiver.recv().ok();
            self.state = FutureState::Ready(value);
        }
    }

    /// Result of the task, `None` if it panicked.
    ///
    /// Blocks if the task has not finished yet.
    pub fn into_result(mut self) -> Option<T> {
        self.wait();
        match self.state {
            FutureState::Ready(value) => value,
            FutureState::Pending(_) => None,
        }
    }
}

/// Runs every job inline on the submitting thread
#[derive(Debug, Default, Clone, Copy)]
pub struct ImmediateWorkerPool;

impl WorkerPool for ImmediateWorkerPool {
    fn execute(&self, job: Job) {
        job();
    }

    fn thread_count(&self) -> usize {
        1
    }
}

/// Dedicated rayon thread pool
#[cfg(feature = "parallel")]
pub struct RayonWorkerPool {
    pool: rayon::ThreadPool,
}

#[cfg(feature = "parallel")]
impl RayonWorkerPool {
    /// Create a pool with `threads` workers (0 = rayon default)
    pub fn new(threads: usize) -> crate::error::Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|index| format!("asset-worker-{index}"))
            .build()
            .map_err(|e| {
                crate::error::StreamError::Config(format!("Failed to build worker pool: {e}"))
            })?;
        Ok(Self { pool })
    }
}

#[cfg(feature = "parallel")]
impl WorkerPool for RayonWorkerPool {
    fn execute(&self, job: Job) {
        self.pool.spawn(job);
    }

    fn thread_count(&self) -> usize {
        self.pool.current_num_threads()
    }
}
