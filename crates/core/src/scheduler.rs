//! Viewport-driven work scheduler
//!
//! Owns the item table and the pending-work tracker, and decides which
//! items' fetch/transform jobs are in flight. The driving algorithm is
//! reconciliation: diff the set of items with active work against the
//! set of currently visible items, cancel work for rows that scrolled
//! away, admit work for rows that scrolled in. While the viewport is
//! in motion both stage queues are suspended so rows flying past never
//! trigger wasted fetches.
//!
//! Everything here runs on one coordination thread. Workers execute
//! stage functions in parallel but communicate results only through a
//! completion channel that [`Scheduler::pump`] drains back on the
//! coordination thread, so records, tracker and presenter are never
//! touched concurrently.

use crate::catalog::CatalogEntry;
use crate::error::StageError;
use crate::presenter::ListPresenter;
use crate::record::{ItemId, ItemRecord, ItemState, Stage};
use crate::tracker::{JobHandle, PendingWork};
use filmstrip_scheduler::{
    CancellationToken, StageJob, StageQueue, SubmitError, WorkerPool, WorkerPoolConfig,
};
use std::collections::{HashMap, HashSet};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::time::Duration;

/// Stage 1 function: fetch raw content from a source locator
pub type FetchFn = Arc<dyn Fn(&str) -> Result<Vec<u8>, String> + Send + Sync>;

/// Stage 2 function: transform raw content into displayable content
pub type TransformFn = Arc<dyn Fn(&[u8]) -> Result<Vec<u8>, String> + Send + Sync>;

/// The two pluggable stage functions supplied by the caller
///
/// Both may block (network I/O, CPU-bound transforms); they run on
/// worker threads and must not touch shared state.
#[derive(Clone)]
pub struct StageFunctions {
    fetch: FetchFn,
    transform: TransformFn,
}

impl StageFunctions {
    /// Wrap a pair of stage functions
    pub fn new<F, T>(fetch: F, transform: T) -> Self
    where
        F: Fn(&str) -> Result<Vec<u8>, String> + Send + Sync + 'static,
        T: Fn(&[u8]) -> Result<Vec<u8>, String> + Send + Sync + 'static,
    {
        Self {
            fetch: Arc::new(fetch),
            transform: Arc::new(transform),
        }
    }
}

/// Configuration for the scheduler's two worker pools
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Concurrency bound for stage 1 (I/O-bound fetches)
    pub fetch_workers: usize,

    /// Concurrency bound for stage 2 (CPU-bound transforms)
    pub transform_workers: usize,

    /// Worker poll interval when idle or suspended
    pub poll_interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            fetch_workers: 2,
            transform_workers: 2,
            poll_interval: Duration::from_millis(10),
        }
    }
}

/// What a job's payload reports back to the coordination thread
enum Outcome {
    /// The stage function ran to completion (successfully or not)
    Finished(Result<Vec<u8>, StageError>),

    /// The stage function was never invoked: the job was cancelled
    /// before execution started
    Skipped,
}

/// One completion message, sent exactly once per admitted job
struct Completion {
    item_id: ItemId,
    stage: Stage,
    token: CancellationToken,
    outcome: Outcome,
}

/// Viewport-driven scheduler for the two-stage item pipeline
///
/// # Example
///
/// ```
/// use filmstrip_core::{
///     CatalogEntry, ListPresenter, Scheduler, SchedulerConfig, StageFunctions,
/// };
/// use std::collections::HashSet;
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// struct Quiet;
/// impl ListPresenter for Quiet {
///     fn item_updated(&self, _id: u64) {}
/// }
///
/// let stages = StageFunctions::new(
///     |source: &str| Ok(source.as_bytes().to_vec()),
///     |raw: &[u8]| Ok(raw.to_vec()),
/// );
/// let mut scheduler = Scheduler::new(SchedulerConfig::default(), stages, Arc::new(Quiet));
///
/// scheduler.catalog_loaded(vec![CatalogEntry {
///     name: "Sunset".into(),
///     source: "photos/sunset.png".into(),
/// }]);
///
/// // The presenter reports row 0 as visible; a fetch job is admitted.
/// scheduler.visibility_changed(&HashSet::from([0]));
///
/// // Drain completions on the coordination thread.
/// scheduler.pump_wait(Duration::from_secs(1));
///
/// scheduler.shutdown();
/// ```
pub struct Scheduler {
    records: HashMap<ItemId, ItemRecord>,
    order: Vec<ItemId>,
    pending: PendingWork,
    fetch_queue: Arc<StageQueue>,
    transform_queue: Arc<StageQueue>,
    fetch_pool: WorkerPool,
    transform_pool: WorkerPool,
    completions_tx: Sender<Completion>,
    completions_rx: Receiver<Completion>,
    stages: StageFunctions,
    presenter: Arc<dyn ListPresenter>,
}

impl Scheduler {
    /// Create a scheduler with its two stage queues and worker pools
    pub fn new(
        config: SchedulerConfig,
        stages: StageFunctions,
        presenter: Arc<dyn ListPresenter>,
    ) -> Self {
        let fetch_queue = Arc::new(StageQueue::new("fetch"));
        let transform_queue = Arc::new(StageQueue::new("transform"));

        let fetch_pool = WorkerPool::new(
            fetch_queue.clone(),
            WorkerPoolConfig::new(config.fetch_workers).with_poll_interval(config.poll_interval),
        );
        let transform_pool = WorkerPool::new(
            transform_queue.clone(),
            WorkerPoolConfig::new(config.transform_workers)
                .with_poll_interval(config.poll_interval),
        );

        let (completions_tx, completions_rx) = channel();

        Self {
            records: HashMap::new(),
            order: Vec::new(),
            pending: PendingWork::new(),
            fetch_queue,
            transform_queue,
            fetch_pool,
            transform_pool,
            completions_tx,
            completions_rx,
            stages,
            presenter,
        }
    }

    /// Initialize item records from the loaded catalog
    ///
    /// Ids are assigned sequentially in catalog order; all records
    /// start in state `New`. A failed or empty catalog load simply
    /// means zero records.
    pub fn catalog_loaded(&mut self, entries: Vec<CatalogEntry>) {
        for entry in entries {
            let id = self.order.len() as ItemId;
            self.records
                .insert(id, ItemRecord::new(id, entry.name, entry.source));
            self.order.push(id);
        }
        log::info!("catalog loaded: {} item(s)", self.order.len());
    }

    /// Start the next stage for an item, if one is due
    ///
    /// `New` items with no tracked fetch get a fetch job; `RawReady`
    /// items with no tracked transform get a transform job. Terminal
    /// items, unknown ids and items with a handle already in flight
    /// are no-ops.
    pub fn admit(&mut self, id: ItemId) {
        let Some(record) = self.records.get(&id) else {
            return;
        };
        match record.state() {
            ItemState::New => self.spawn_job(id, Stage::Fetch),
            ItemState::RawReady => self.spawn_job(id, Stage::Transform),
            ItemState::Processed | ItemState::Failed => {}
        }
    }

    /// Make active work exactly track the visible set
    ///
    /// Cancels both stages for every item with in-flight work that is
    /// no longer visible (deregistering immediately, so the item is
    /// eligible for fresh admission if it scrolls back), then admits
    /// every visible item without in-flight work. Calling this twice
    /// with the same set is a no-op the second time.
    pub fn reconcile(&mut self, visible: &HashSet<ItemId>) {
        let active = self.pending.active_ids();

        let to_cancel: Vec<ItemId> = active.difference(visible).copied().collect();
        let to_admit: Vec<ItemId> = visible.difference(&active).copied().collect();

        let mut cancelled = 0;
        for id in &to_cancel {
            cancelled += self.pending.cancel_and_remove(*id);
        }

        for id in &to_admit {
            self.admit(*id);
        }

        log::debug!(
            "reconcile: {} visible, {} handle(s) cancelled, {} item(s) admitted",
            visible.len(),
            cancelled,
            to_admit.len()
        );
    }

    /// Presenter event: the set of visible rows changed
    pub fn visibility_changed(&mut self, visible: &HashSet<ItemId>) {
        self.reconcile(visible);
    }

    /// Presenter event: the viewport started moving
    ///
    /// Suspends both stage queues so admitted-but-not-started jobs
    /// hold until the viewport settles. Jobs already running on a
    /// worker are unaffected.
    pub fn viewport_started_moving(&self) {
        self.suspend_all();
    }

    /// Presenter event: the viewport came to rest
    ///
    /// Resumes both stage queues, then reconciles against the rows
    /// that ended up visible.
    pub fn viewport_settled(&mut self, visible: &HashSet<ItemId>) {
        self.resume_all();
        self.reconcile(visible);
    }

    /// Suspend both stage queues
    pub fn suspend_all(&self) {
        self.fetch_queue.set_suspended(true);
        self.transform_queue.set_suspended(true);
    }

    /// Resume both stage queues
    pub fn resume_all(&self) {
        self.fetch_queue.set_suspended(false);
        self.transform_queue.set_suspended(false);
    }

    /// Drain all completions currently queued, without blocking
    ///
    /// Must be called on the thread that owns the scheduler; this is
    /// where records are mutated and the presenter is notified.
    /// Returns the number of completions processed.
    pub fn pump(&mut self) -> usize {
        let mut processed = 0;
        while let Ok(completion) = self.completions_rx.try_recv() {
            self.apply_completion(completion);
            processed += 1;
        }
        processed
    }

    /// Wait up to `timeout` for at least one completion, then drain
    ///
    /// Returns the number of completions processed (zero on timeout).
    pub fn pump_wait(&mut self, timeout: Duration) -> usize {
        match self.completions_rx.recv_timeout(timeout) {
            Ok(completion) => {
                self.apply_completion(completion);
                1 + self.pump()
            }
            Err(_) => 0,
        }
    }

    /// Get read access to an item's record
    pub fn record(&self, id: ItemId) -> Option<&ItemRecord> {
        self.records.get(&id)
    }

    /// Iterate records in catalog order
    pub fn items(&self) -> impl Iterator<Item = &ItemRecord> {
        self.order.iter().filter_map(|id| self.records.get(id))
    }

    /// Get the number of items in the table
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Check whether the item table is empty
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Check whether a handle is in flight for an item at a stage
    pub fn is_tracked(&self, id: ItemId, stage: Stage) -> bool {
        self.pending.contains(id, stage)
    }

    /// Item identities with in-flight work at either stage
    pub fn active_items(&self) -> HashSet<ItemId> {
        self.pending.active_ids()
    }

    /// Stop both worker pools, waiting for in-flight jobs to finish
    pub fn shutdown(self) {
        self.fetch_queue.clear();
        self.transform_queue.clear();
        self.fetch_pool.shutdown();
        self.transform_pool.shutdown();
    }

    /// Create a handle, register it and submit the stage job
    fn spawn_job(&mut self, id: ItemId, stage: Stage) {
        if self.pending.contains(id, stage) {
            return;
        }
        let Some(record) = self.records.get(&id) else {
            return;
        };

        let handle = JobHandle::new(id, stage);
        let token = handle.token().clone();
        let tx = self.completions_tx.clone();

        let job = match stage {
            Stage::Fetch => {
                let source = record.source().to_string();
                let fetch = self.stages.fetch.clone();
                StageJob::with_token(token, move |token| {
                    let outcome = if token.is_cancelled() {
                        Outcome::Skipped
                    } else {
                        Outcome::Finished(fetch(&source).map_err(StageError::Fetch))
                    };
                    let _ = tx.send(Completion {
                        item_id: id,
                        stage: Stage::Fetch,
                        token: token.clone(),
                        outcome,
                    });
                })
            }
            Stage::Transform => {
                let Some(raw) = record.raw_content().map(<[u8]>::to_vec) else {
                    return;
                };
                let transform = self.stages.transform.clone();
                StageJob::with_token(token, move |token| {
                    let outcome = if token.is_cancelled() {
                        Outcome::Skipped
                    } else {
                        Outcome::Finished(transform(&raw).map_err(StageError::Transform))
                    };
                    let _ = tx.send(Completion {
                        item_id: id,
                        stage: Stage::Transform,
                        token: token.clone(),
                        outcome,
                    });
                })
            }
        };

        let queue = match stage {
            Stage::Fetch => &self.fetch_queue,
            Stage::Transform => &self.transform_queue,
        };

        self.pending.insert(handle);
        match queue.submit(job) {
            Ok(()) => log::debug!("admitted {} job for item {}", stage.as_str(), id),
            Err(SubmitError::AlreadyCancelled) => {
                // A pre-cancelled job never reaches a worker and sends
                // no completion; deregister inline.
                self.pending.remove(id, stage);
            }
        }
    }

    /// Commit one completion on the coordination thread
    fn apply_completion(&mut self, completion: Completion) {
        let Completion {
            item_id,
            stage,
            token,
            outcome,
        } = completion;

        if token.is_cancelled() {
            // Cancelled handles were deregistered the moment they were
            // cancelled; a fresh handle for the same item may be
            // tracked by now, so the tracker must not be touched here.
            log::debug!(
                "discarding cancelled {} result for item {}",
                stage.as_str(),
                item_id
            );
            return;
        }

        self.pending.remove(item_id, stage);

        let Some(record) = self.records.get_mut(&item_id) else {
            return;
        };

        let changed = match outcome {
            Outcome::Finished(Ok(content)) => match stage {
                Stage::Fetch => record.complete_fetch(content),
                Stage::Transform => record.complete_transform(content),
            },
            Outcome::Finished(Err(err)) => {
                log::warn!("item {} ({}): {}", item_id, record.name(), err);
                record.fail()
            }
            Outcome::Skipped => false,
        };

        if changed {
            self.presenter.item_updated(item_id);
        }
    }
}
