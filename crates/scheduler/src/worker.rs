//! Worker pool for stage execution
//!
//! This module provides a thread pool that drains a single stage
//! queue. Workers run independently on separate threads, pulling jobs
//! from the queue and running their payloads. The pool size is the
//! queue's concurrency bound: at most `num_workers` jobs from that
//! stage run in parallel.

use crate::queue::StageQueue;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Configuration for a stage worker pool.
#[derive(Debug, Clone)]
pub struct WorkerPoolConfig {
    /// Number of worker threads to spawn.
    pub num_workers: usize,

    /// Maximum time a worker will wait for a job before checking shutdown.
    /// Default: 10ms.
    pub poll_interval: Duration,
}

impl WorkerPoolConfig {
    /// Create a new worker pool configuration.
    pub fn new(num_workers: usize) -> Self {
        Self {
            num_workers,
            poll_interval: Duration::from_millis(10),
        }
    }

    /// Set the poll interval for workers.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self::new(2)
    }
}

/// Worker pool draining one stage queue.
///
/// Each worker pulls jobs from the queue and runs their payloads.
/// While the queue is suspended, `next_job()` yields nothing, so
/// workers idle without aborting whatever job they are currently
/// running — exactly the suspension contract the viewport scheduler
/// needs while the list is in motion.
///
/// # Example
///
/// ```
/// use filmstrip_scheduler::{StageJob, StageQueue, WorkerPool, WorkerPoolConfig};
/// use std::sync::Arc;
///
/// let queue = Arc::new(StageQueue::new("fetch"));
/// let pool = WorkerPool::new(queue.clone(), WorkerPoolConfig::new(2));
///
/// let (job, _token) = StageJob::new(|token| {
///     if token.is_cancelled() {
///         return;
///     }
///     // ... run the stage function ...
/// });
/// queue.submit(job).unwrap();
///
/// // Workers process jobs in the background...
///
/// pool.shutdown();
/// ```
pub struct WorkerPool {
    workers: Vec<Worker>,
    shutdown: Arc<AtomicBool>,
}

impl WorkerPool {
    /// Create and start a new worker pool draining `queue`.
    pub fn new(queue: Arc<StageQueue>, config: WorkerPoolConfig) -> Self {
        let shutdown = Arc::new(AtomicBool::new(false));
        let mut workers = Vec::with_capacity(config.num_workers);

        for id in 0..config.num_workers {
            let worker = Worker::new(id, queue.clone(), shutdown.clone(), config.poll_interval);
            workers.push(worker);
        }

        Self { workers, shutdown }
    }

    /// Get the number of worker threads.
    pub fn num_workers(&self) -> usize {
        self.workers.len()
    }

    /// Check if the worker pool is shutting down.
    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    /// Shutdown the worker pool gracefully.
    ///
    /// Signals all workers to stop and waits for them to finish their
    /// current jobs and exit. Blocks until all workers have terminated.
    pub fn shutdown(self) {
        self.shutdown.store(true, Ordering::Release);

        for worker in self.workers {
            worker.join();
        }
    }
}

/// A single worker thread in the pool.
struct Worker {
    thread: Option<JoinHandle<()>>,
}

impl Worker {
    fn new(
        id: usize,
        queue: Arc<StageQueue>,
        shutdown: Arc<AtomicBool>,
        poll_interval: Duration,
    ) -> Self {
        let thread = thread::Builder::new()
            .name(format!("filmstrip-stage-worker-{}", id))
            .spawn(move || {
                log::debug!("stage worker {} started", id);
                Self::run(queue, shutdown, poll_interval);
                log::debug!("stage worker {} stopped", id);
            })
            .expect("Failed to spawn worker thread");

        Self {
            thread: Some(thread),
        }
    }

    /// Main worker loop.
    ///
    /// Workers continuously pull jobs from the queue and run their
    /// payloads. They check for shutdown between jobs and sleep briefly
    /// when the queue is empty or suspended.
    fn run(queue: Arc<StageQueue>, shutdown: Arc<AtomicBool>, poll_interval: Duration) {
        loop {
            if shutdown.load(Ordering::Acquire) {
                break;
            }

            if let Some(job) = queue.next_job() {
                // The payload checks the token itself: a job cancelled
                // before this point reports a cancelled completion
                // without running its stage function.
                job.run();
            } else {
                thread::sleep(poll_interval);
            }
        }
    }

    fn join(mut self) {
        if let Some(thread) = self.thread.take() {
            thread.join().expect("Worker thread panicked");
        }
    }
}
