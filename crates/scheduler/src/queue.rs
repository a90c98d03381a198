//! Suspendable FIFO stage queue
//!
//! Provides the per-stage work queue. Jobs are admitted in FIFO order
//! and handed to workers one at a time. While the queue is suspended,
//! admitted-but-not-started jobs are held back; jobs that are already
//! running on a worker are unaffected.

use crate::cancel::CancellationToken;
use std::collections::VecDeque;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};

/// Error returned when a job cannot be admitted to a queue
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SubmitError {
    /// The job's cancellation token was already set at submit time.
    ///
    /// This is a non-error signal: the caller is expected to run the
    /// job's cancelled completion path itself instead of enqueueing.
    #[error("job was cancelled before submission")]
    AlreadyCancelled,
}

/// A single admitted execution of a stage function
///
/// The payload owns everything it needs to run and report its result
/// (stage input, completion channel, token clone). It holds no
/// back-references into scheduler-owned state; results travel only
/// through whatever completion mechanism the payload captured.
pub struct StageJob {
    token: CancellationToken,
    payload: Box<dyn FnOnce(&CancellationToken) + Send>,
}

impl StageJob {
    /// Create a job with a freshly created cancellation token
    ///
    /// Returns the job together with a clone of its token, which the
    /// caller keeps so the job can be cancelled later.
    pub fn new<F>(payload: F) -> (Self, CancellationToken)
    where
        F: FnOnce(&CancellationToken) + Send + 'static,
    {
        let token = CancellationToken::new();
        let job = Self::with_token(token.clone(), payload);
        (job, token)
    }

    /// Create a job that shares a caller-provided cancellation token
    pub fn with_token<F>(token: CancellationToken, payload: F) -> Self
    where
        F: FnOnce(&CancellationToken) + Send + 'static,
    {
        Self {
            token,
            payload: Box::new(payload),
        }
    }

    /// Get the job's cancellation token
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Run the job's payload
    ///
    /// The payload itself is responsible for checking the token before
    /// invoking the stage function and for reporting a completion
    /// exactly once, cancelled or not.
    pub fn run(self) {
        (self.payload)(&self.token);
    }
}

impl std::fmt::Debug for StageJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageJob")
            .field("cancelled", &self.token.is_cancelled())
            .finish()
    }
}

/// Suspendable FIFO queue for stage jobs
///
/// Thread-safe: the coordination thread submits, suspends and clears
/// while worker threads pop. Each processing stage gets its own queue
/// so a slow transform stage cannot starve fetches (and vice versa);
/// the concurrency bound is the size of the worker pool draining the
/// queue.
///
/// # Example
///
/// ```
/// use filmstrip_scheduler::{StageJob, StageQueue};
///
/// let queue = StageQueue::new("fetch");
/// let (job, _token) = StageJob::new(|_token| {});
/// queue.submit(job).unwrap();
///
/// queue.set_suspended(true);
/// assert!(queue.next_job().is_none()); // held while suspended
///
/// queue.set_suspended(false);
/// assert!(queue.next_job().is_some());
/// ```
pub struct StageQueue {
    name: &'static str,
    jobs: Arc<Mutex<VecDeque<StageJob>>>,
    suspended: AtomicBool,
}

impl StageQueue {
    /// Create a new empty queue
    ///
    /// The name only appears in log output.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            jobs: Arc::new(Mutex::new(VecDeque::new())),
            suspended: AtomicBool::new(false),
        }
    }

    /// Submit a job to the queue
    ///
    /// Jobs are admitted in FIFO order. Fails with
    /// [`SubmitError::AlreadyCancelled`] if the job's token is already
    /// set, in which case the caller must run the cancelled completion
    /// path itself — the job is not enqueued.
    pub fn submit(&self, job: StageJob) -> Result<(), SubmitError> {
        if job.token().is_cancelled() {
            log::debug!("{} queue: rejected pre-cancelled job", self.name);
            return Err(SubmitError::AlreadyCancelled);
        }

        let mut jobs = self.jobs.lock().unwrap();
        jobs.push_back(job);
        log::trace!("{} queue: {} job(s) pending", self.name, jobs.len());
        Ok(())
    }

    /// Toggle whether queued-but-not-started jobs may begin
    ///
    /// Suspension never affects jobs already running on a worker.
    pub fn set_suspended(&self, suspended: bool) {
        self.suspended.store(suspended, Ordering::Release);
        log::debug!(
            "{} queue: {}",
            self.name,
            if suspended { "suspended" } else { "resumed" }
        );
    }

    /// Check whether the queue is suspended
    pub fn is_suspended(&self) -> bool {
        self.suspended.load(Ordering::Acquire)
    }

    /// Take the next job for execution
    ///
    /// Returns `None` while the queue is suspended or empty. Jobs come
    /// out in admission order.
    pub fn next_job(&self) -> Option<StageJob> {
        if self.is_suspended() {
            return None;
        }
        let mut jobs = self.jobs.lock().unwrap();
        jobs.pop_front()
    }

    /// Get the number of jobs waiting in the queue
    pub fn len(&self) -> usize {
        let jobs = self.jobs.lock().unwrap();
        jobs.len()
    }

    /// Check if the queue has no waiting jobs
    pub fn is_empty(&self) -> bool {
        let jobs = self.jobs.lock().unwrap();
        jobs.is_empty()
    }

    /// Drop all waiting jobs without running them
    ///
    /// Does not cancel their tokens; callers that want the cancelled
    /// completion path to run must cancel the tokens they kept.
    pub fn clear(&self) {
        let mut jobs = self.jobs.lock().unwrap();
        jobs.clear();
    }
}
