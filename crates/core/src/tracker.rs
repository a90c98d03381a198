//! Pending work tracker
//!
//! Authoritative record of which (item, stage) pairs currently have a
//! job in flight. Membership here — not the item's state — decides
//! whether new work may be started for an item, and the tracker
//! guarantees at most one handle per (item, stage) at any time.
//!
//! The tracker is plain owned state: it lives on the coordination
//! thread inside the scheduler and is never touched by workers.

use crate::record::{ItemId, Stage};
use filmstrip_scheduler::CancellationToken;
use std::collections::{HashMap, HashSet};

/// Handle to one in-flight stage execution for one item
///
/// Carries the item's identity and an owned cancellation token — no
/// back-reference to the scheduler's containers. Results come back
/// only through the completion channel the job's payload captured.
#[derive(Debug, Clone)]
pub struct JobHandle {
    item_id: ItemId,
    stage: Stage,
    token: CancellationToken,
}

impl JobHandle {
    /// Create a handle for an item/stage pair with a fresh token
    pub fn new(item_id: ItemId, stage: Stage) -> Self {
        Self {
            item_id,
            stage,
            token: CancellationToken::new(),
        }
    }

    /// Get the target item's identity
    pub fn item_id(&self) -> ItemId {
        self.item_id
    }

    /// Get the stage this handle executes
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Get the handle's cancellation token
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Set the cancellation flag
    ///
    /// One-directional: a cancelled handle's result, if it eventually
    /// arrives, is discarded by the completion path.
    pub fn cancel(&self) {
        self.token.cancel();
    }
}

/// Per-stage maps of in-flight job handles
///
/// Two mappings, one per stage, each keyed by item identity.
#[derive(Debug, Default)]
pub struct PendingWork {
    fetches: HashMap<ItemId, JobHandle>,
    transforms: HashMap<ItemId, JobHandle>,
}

impl PendingWork {
    /// Create an empty tracker
    pub fn new() -> Self {
        Self::default()
    }

    fn map(&self, stage: Stage) -> &HashMap<ItemId, JobHandle> {
        match stage {
            Stage::Fetch => &self.fetches,
            Stage::Transform => &self.transforms,
        }
    }

    fn map_mut(&mut self, stage: Stage) -> &mut HashMap<ItemId, JobHandle> {
        match stage {
            Stage::Fetch => &mut self.fetches,
            Stage::Transform => &mut self.transforms,
        }
    }

    /// Register a handle, refusing duplicates
    ///
    /// Returns `false` and leaves the tracker unchanged if a handle is
    /// already registered for this item at this stage.
    pub fn insert(&mut self, handle: JobHandle) -> bool {
        let map = self.map_mut(handle.stage());
        if map.contains_key(&handle.item_id()) {
            return false;
        }
        map.insert(handle.item_id(), handle);
        true
    }

    /// Check whether a handle is tracked for an item at a stage
    pub fn contains(&self, id: ItemId, stage: Stage) -> bool {
        self.map(stage).contains_key(&id)
    }

    /// Remove and return the handle for an item at a stage
    pub fn remove(&mut self, id: ItemId, stage: Stage) -> Option<JobHandle> {
        self.map_mut(stage).remove(&id)
    }

    /// Cancel and deregister an item's handles at both stages
    ///
    /// Removal is immediate, which is what makes an item eligible for
    /// fresh admission the moment it scrolls back into view; the old
    /// handles' completion paths see the cancelled flag and no-op.
    /// Returns the number of handles cancelled.
    pub fn cancel_and_remove(&mut self, id: ItemId) -> usize {
        let mut cancelled = 0;
        if let Some(handle) = self.fetches.remove(&id) {
            handle.cancel();
            cancelled += 1;
        }
        if let Some(handle) = self.transforms.remove(&id) {
            handle.cancel();
            cancelled += 1;
        }
        cancelled
    }

    /// Union of item identities with in-flight work at either stage
    pub fn active_ids(&self) -> HashSet<ItemId> {
        self.fetches
            .keys()
            .chain(self.transforms.keys())
            .copied()
            .collect()
    }

    /// Total number of tracked handles across both stages
    pub fn len(&self) -> usize {
        self.fetches.len() + self.transforms.len()
    }

    /// Check whether no work is tracked at all
    pub fn is_empty(&self) -> bool {
        self.fetches.is_empty() && self.transforms.is_empty()
    }
}
