//! End-to-end scheduling scenarios
//!
//! Drives the scheduler the way a list presenter would: catalog load,
//! visibility changes, viewport motion, and completion pumping, with
//! gate-controlled stage functions where timing matters.

use filmstrip_core::{
    CatalogEntry, ItemId, ItemState, ListPresenter, Scheduler, SchedulerConfig, Stage,
    StageFunctions,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

/// Presenter that records every notification it receives
#[derive(Default)]
struct RecordingPresenter {
    updates: Mutex<Vec<ItemId>>,
}

impl RecordingPresenter {
    fn updates(&self) -> Vec<ItemId> {
        self.updates.lock().unwrap().clone()
    }
}

impl ListPresenter for RecordingPresenter {
    fn item_updated(&self, id: ItemId) {
        self.updates.lock().unwrap().push(id);
    }
}

fn catalog(names: &[&str]) -> Vec<CatalogEntry> {
    names
        .iter()
        .map(|name| CatalogEntry {
            name: name.to_string(),
            source: format!("photos/{}.png", name),
        })
        .collect()
}

fn config(fetch_workers: usize, transform_workers: usize) -> SchedulerConfig {
    SchedulerConfig {
        fetch_workers,
        transform_workers,
        poll_interval: Duration::from_millis(2),
    }
}

/// Pump until `n` completions have been processed or `timeout` passes
fn pump_until(scheduler: &mut Scheduler, n: usize, timeout: Duration) -> usize {
    let start = Instant::now();
    let mut processed = 0;
    while processed < n && start.elapsed() < timeout {
        processed += scheduler.pump_wait(Duration::from_millis(20));
    }
    processed
}

fn wait_until<F: Fn() -> bool>(cond: F, timeout: Duration) -> bool {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    cond()
}

/// Stage function pair where every fetch blocks on a gate until the
/// test releases it, so cancellation windows are deterministic.
struct GatedFetch {
    release: Sender<()>,
    started: Arc<AtomicUsize>,
}

impl GatedFetch {
    fn stages() -> (StageFunctions, Self) {
        let (release, gate_rx) = channel::<()>();
        let gate_rx = Arc::new(Mutex::new(gate_rx));
        let started = Arc::new(AtomicUsize::new(0));

        let started_clone = started.clone();
        let stages = StageFunctions::new(
            move |source: &str| {
                started_clone.fetch_add(1, Ordering::SeqCst);
                let gate: Arc<Mutex<Receiver<()>>> = gate_rx.clone();
                let _ = gate.lock().unwrap().recv();
                Ok(source.as_bytes().to_vec())
            },
            |raw: &[u8]| Ok(raw.to_vec()),
        );

        (stages, Self { release, started })
    }

    fn release(&self, n: usize) {
        for _ in 0..n {
            let _ = self.release.send(());
        }
    }

    fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }
}

// Only visible items get fetch handles.
#[test]
fn visibility_admits_only_visible_items() {
    let presenter = Arc::new(RecordingPresenter::default());
    // Zero workers: admissions stay queued, tracker state is exact.
    let mut scheduler = Scheduler::new(
        config(0, 0),
        StageFunctions::new(|s: &str| Ok(s.as_bytes().to_vec()), |r: &[u8]| Ok(r.to_vec())),
        presenter.clone(),
    );
    scheduler.catalog_loaded(catalog(&["a", "b", "c"]));

    scheduler.visibility_changed(&HashSet::from([0, 1]));

    assert!(scheduler.is_tracked(0, Stage::Fetch));
    assert!(scheduler.is_tracked(1, Stage::Fetch));
    assert!(!scheduler.is_tracked(2, Stage::Fetch));
    assert_eq!(scheduler.record(2).unwrap().state(), ItemState::New);
    assert!(presenter.updates().is_empty());

    scheduler.shutdown();
}

// Fetch completion moves the item to RawReady and the next
// reconcile admits its transform.
#[test]
fn fetch_completion_enables_transform_admission() {
    let presenter = Arc::new(RecordingPresenter::default());
    let mut scheduler = Scheduler::new(
        config(1, 0),
        StageFunctions::new(|s: &str| Ok(s.as_bytes().to_vec()), |r: &[u8]| Ok(r.to_vec())),
        presenter.clone(),
    );
    scheduler.catalog_loaded(catalog(&["a"]));

    scheduler.visibility_changed(&HashSet::from([0]));
    assert_eq!(pump_until(&mut scheduler, 1, Duration::from_secs(2)), 1);

    let record = scheduler.record(0).unwrap();
    assert_eq!(record.state(), ItemState::RawReady);
    assert_eq!(record.raw_content(), Some("photos/a.png".as_bytes()));
    assert!(!scheduler.is_tracked(0, Stage::Fetch));
    assert_eq!(presenter.updates(), vec![0]);

    scheduler.reconcile(&HashSet::from([0]));
    assert!(scheduler.is_tracked(0, Stage::Transform));
    assert!(!scheduler.is_tracked(0, Stage::Fetch));

    scheduler.shutdown();
}

// Items scrolled away mid-fetch are cancelled; their late
// results are discarded without notifying the presenter.
#[test]
fn scrolled_away_items_are_cancelled_and_results_discarded() {
    let (stages, gate) = GatedFetch::stages();
    let presenter = Arc::new(RecordingPresenter::default());
    let mut scheduler = Scheduler::new(config(2, 1), stages, presenter.clone());
    scheduler.catalog_loaded(catalog(&["a", "b", "c"]));

    scheduler.visibility_changed(&HashSet::from([0, 1]));
    assert!(wait_until(|| gate.started() == 2, Duration::from_secs(2)));

    // Both fetches are mid-flight; the viewport jumps to c.
    scheduler.visibility_changed(&HashSet::from([2]));
    assert!(!scheduler.is_tracked(0, Stage::Fetch));
    assert!(!scheduler.is_tracked(1, Stage::Fetch));
    assert!(scheduler.is_tracked(2, Stage::Fetch));

    // Let everything run to completion.
    gate.release(3);
    assert_eq!(pump_until(&mut scheduler, 3, Duration::from_secs(2)), 3);

    // Late results for a and b were discarded without mutation.
    assert_eq!(scheduler.record(0).unwrap().state(), ItemState::New);
    assert_eq!(scheduler.record(1).unwrap().state(), ItemState::New);
    assert!(scheduler.record(0).unwrap().raw_content().is_none());

    // Only c produced a notification.
    assert_eq!(presenter.updates(), vec![2]);
    assert_eq!(scheduler.record(2).unwrap().state(), ItemState::RawReady);

    scheduler.shutdown();
}

// Work admitted while the viewport is moving is queued but
// does not start executing until the viewport settles.
#[test]
fn suspension_holds_admitted_work_until_settled() {
    let calls = Arc::new(AtomicUsize::new(0));
    let calls_clone = calls.clone();
    let stages = StageFunctions::new(
        move |s: &str| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
            Ok(s.as_bytes().to_vec())
        },
        |r: &[u8]| Ok(r.to_vec()),
    );
    let presenter = Arc::new(RecordingPresenter::default());
    let mut scheduler = Scheduler::new(config(1, 1), stages, presenter.clone());
    scheduler.catalog_loaded(catalog(&["d"]));

    scheduler.viewport_started_moving();
    scheduler.visibility_changed(&HashSet::from([0]));

    assert!(scheduler.is_tracked(0, Stage::Fetch));
    thread::sleep(Duration::from_millis(50));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(scheduler.record(0).unwrap().state(), ItemState::New);

    scheduler.viewport_settled(&HashSet::from([0]));
    assert_eq!(pump_until(&mut scheduler, 1, Duration::from_secs(2)), 1);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(scheduler.record(0).unwrap().state(), ItemState::RawReady);

    scheduler.shutdown();
}

// A fetch failure is terminal; scrolling the item back
// into view never retries it.
#[test]
fn failed_fetch_is_permanent() {
    let calls = Arc::new(AtomicUsize::new(0));
    let calls_clone = calls.clone();
    let stages = StageFunctions::new(
        move |_: &str| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
            Err("connection refused".to_string())
        },
        |r: &[u8]| Ok(r.to_vec()),
    );
    let presenter = Arc::new(RecordingPresenter::default());
    let mut scheduler = Scheduler::new(config(1, 1), stages, presenter.clone());
    scheduler.catalog_loaded(catalog(&["e"]));

    scheduler.visibility_changed(&HashSet::from([0]));
    assert_eq!(pump_until(&mut scheduler, 1, Duration::from_secs(2)), 1);

    assert_eq!(scheduler.record(0).unwrap().state(), ItemState::Failed);
    assert_eq!(presenter.updates(), vec![0]);

    // Scrolled away and back: Failed blocks admission.
    scheduler.visibility_changed(&HashSet::new());
    scheduler.visibility_changed(&HashSet::from([0]));
    assert!(scheduler.active_items().is_empty());

    thread::sleep(Duration::from_millis(30));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(scheduler.pump(), 0);

    scheduler.shutdown();
}

// Full pipeline: fetch then transform, one notification per stage.
#[test]
fn item_reaches_processed_through_both_stages() {
    let presenter = Arc::new(RecordingPresenter::default());
    let stages = StageFunctions::new(
        |s: &str| Ok(s.as_bytes().to_vec()),
        |raw: &[u8]| {
            let mut out = raw.to_vec();
            out.reverse();
            Ok(out)
        },
    );
    let mut scheduler = Scheduler::new(config(1, 1), stages, presenter.clone());
    scheduler.catalog_loaded(catalog(&["a"]));

    let visible = HashSet::from([0]);
    scheduler.visibility_changed(&visible);
    assert_eq!(pump_until(&mut scheduler, 1, Duration::from_secs(2)), 1);
    assert_eq!(scheduler.record(0).unwrap().state(), ItemState::RawReady);

    // The presenter reacts to the update by reporting visibility again,
    // which admits the transform.
    scheduler.visibility_changed(&visible);
    assert!(scheduler.is_tracked(0, Stage::Transform));
    assert_eq!(pump_until(&mut scheduler, 1, Duration::from_secs(2)), 1);

    let record = scheduler.record(0).unwrap();
    assert_eq!(record.state(), ItemState::Processed);
    let mut expected = "photos/a.png".as_bytes().to_vec();
    expected.reverse();
    assert_eq!(record.processed_content(), Some(expected.as_slice()));
    assert_eq!(presenter.updates(), vec![0, 0]);

    scheduler.shutdown();
}

// Transform failures are terminal too.
#[test]
fn failed_transform_is_permanent() {
    let presenter = Arc::new(RecordingPresenter::default());
    let stages = StageFunctions::new(
        |s: &str| Ok(s.as_bytes().to_vec()),
        |_: &[u8]| Err("unsupported pixel format".to_string()),
    );
    let mut scheduler = Scheduler::new(config(1, 1), stages, presenter.clone());
    scheduler.catalog_loaded(catalog(&["a"]));

    let visible = HashSet::from([0]);
    scheduler.visibility_changed(&visible);
    assert_eq!(pump_until(&mut scheduler, 1, Duration::from_secs(2)), 1);
    scheduler.visibility_changed(&visible);
    assert_eq!(pump_until(&mut scheduler, 1, Duration::from_secs(2)), 1);

    let record = scheduler.record(0).unwrap();
    assert_eq!(record.state(), ItemState::Failed);
    // Raw content from the successful fetch is retained.
    assert!(record.raw_content().is_some());
    assert!(record.processed_content().is_none());

    scheduler.visibility_changed(&visible);
    assert!(scheduler.active_items().is_empty());

    scheduler.shutdown();
}

// At most one handle per (item, stage), even under repeated admission.
#[test]
fn no_duplicate_handles_per_item_and_stage() {
    let (stages, gate) = GatedFetch::stages();
    let presenter = Arc::new(RecordingPresenter::default());
    let mut scheduler = Scheduler::new(config(1, 1), stages, presenter);
    scheduler.catalog_loaded(catalog(&["a"]));

    let visible = HashSet::from([0]);
    scheduler.visibility_changed(&visible);
    assert!(wait_until(|| gate.started() == 1, Duration::from_secs(2)));

    // Re-admitting a tracked item must not create a second job.
    scheduler.admit(0);
    scheduler.visibility_changed(&visible);

    gate.release(1);
    assert_eq!(pump_until(&mut scheduler, 1, Duration::from_secs(2)), 1);
    assert_eq!(gate.started(), 1);

    scheduler.shutdown();
}
