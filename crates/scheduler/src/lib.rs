//! Filmstrip Stage Scheduler Library
//!
//! Suspendable work queues with cancellable jobs and worker pools.
//!
//! This crate provides the execution machinery for the filmstrip item
//! pipeline. Each processing stage gets its own [`StageQueue`] (a FIFO
//! queue that can be suspended while the viewport is in motion) and its
//! own [`WorkerPool`] (a fixed number of threads that pull jobs off the
//! queue and run them). Jobs carry a [`CancellationToken`] so work for
//! items that scroll off-screen can be abandoned cooperatively.
//!
//! # Example
//!
//! ```
//! use filmstrip_scheduler::{StageJob, StageQueue, WorkerPool, WorkerPoolConfig};
//! use std::sync::Arc;
//!
//! let queue = Arc::new(StageQueue::new("demo"));
//! let pool = WorkerPool::new(queue.clone(), WorkerPoolConfig::new(2));
//!
//! let (job, token) = StageJob::new(|token| {
//!     if token.is_cancelled() {
//!         return;
//!     }
//!     // ... run the stage function and report the result ...
//! });
//! queue.submit(job).unwrap();
//!
//! // Hold back queued-but-not-started jobs while scrolling.
//! queue.set_suspended(true);
//! queue.set_suspended(false);
//!
//! // Abandon work that is no longer wanted.
//! token.cancel();
//!
//! pool.shutdown();
//! ```

mod cancel;
mod queue;
mod worker;

// Re-export public API
pub use cancel::CancellationToken;
pub use queue::{StageJob, StageQueue, SubmitError};
pub use worker::{WorkerPool, WorkerPoolConfig};
