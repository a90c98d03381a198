//! Item state model
//!
//! Each catalog entry becomes an [`ItemRecord`] that moves through a
//! small state machine as its two processing stages complete. The
//! record alone determines how a row renders; whether *new* work
//! should be started for it is the pending-work tracker's business.

/// Unique identifier for an item
///
/// Assigned sequentially in catalog order at load time and immutable
/// thereafter.
pub type ItemId = u64;

/// One of the two sequential processing stages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Stage 1: fetch raw content from the item's source locator
    Fetch,

    /// Stage 2: transform raw content into displayable content
    Transform,
}

impl Stage {
    /// Short name for log output
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Fetch => "fetch",
            Stage::Transform => "transform",
        }
    }
}

/// Lifecycle state of an item
///
/// Transitions:
/// - `New` → `RawReady` (fetch succeeded) or `Failed` (fetch failed)
/// - `RawReady` → `Processed` (transform succeeded) or `Failed` (transform failed)
///
/// `Processed` and `Failed` are terminal: no further stage is ever
/// scheduled for an item in these states, and scrolling a failed item
/// back into view does not retry it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemState {
    /// No stage has completed yet
    New,

    /// Raw content is available, transform not yet done
    RawReady,

    /// Final content is available (terminal)
    Processed,

    /// A stage failed; the failure is permanent (terminal)
    Failed,
}

impl ItemState {
    /// Check whether the state admits no further work
    pub fn is_terminal(&self) -> bool {
        matches!(self, ItemState::Processed | ItemState::Failed)
    }

    /// Rendering contract: should the row show a busy indicator?
    ///
    /// `New` and `RawReady` rows show a spinner whether or not a job is
    /// currently in flight for them.
    pub fn shows_busy(&self) -> bool {
        matches!(self, ItemState::New | ItemState::RawReady)
    }
}

/// Per-item state and content holder
///
/// Owned exclusively by the scheduler's item table; presenters get
/// read access only. Content fields fill in as stages complete.
#[derive(Debug, Clone)]
pub struct ItemRecord {
    id: ItemId,
    name: String,
    source: String,
    raw_content: Option<Vec<u8>>,
    processed_content: Option<Vec<u8>>,
    state: ItemState,
}

impl ItemRecord {
    /// Create a record in state `New` with no content
    pub fn new(id: ItemId, name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            source: source.into(),
            raw_content: None,
            processed_content: None,
            state: ItemState::New,
        }
    }

    /// Get the item's identity
    pub fn id(&self) -> ItemId {
        self.id
    }

    /// Get the display label
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the source locator stage 1 fetches from
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Get the current lifecycle state
    pub fn state(&self) -> ItemState {
        self.state
    }

    /// Get the raw content, if stage 1 has completed
    pub fn raw_content(&self) -> Option<&[u8]> {
        self.raw_content.as_deref()
    }

    /// Get the processed content, if stage 2 has completed
    pub fn processed_content(&self) -> Option<&[u8]> {
        self.processed_content.as_deref()
    }

    /// Record a successful fetch: `New` → `RawReady`
    ///
    /// Returns `false` (and changes nothing) if the record is not in
    /// state `New`.
    pub fn complete_fetch(&mut self, raw: Vec<u8>) -> bool {
        if self.state != ItemState::New {
            return false;
        }
        self.raw_content = Some(raw);
        self.state = ItemState::RawReady;
        true
    }

    /// Record a successful transform: `RawReady` → `Processed`
    ///
    /// Returns `false` (and changes nothing) if the record is not in
    /// state `RawReady`.
    pub fn complete_transform(&mut self, processed: Vec<u8>) -> bool {
        if self.state != ItemState::RawReady {
            return false;
        }
        self.processed_content = Some(processed);
        self.state = ItemState::Processed;
        true
    }

    /// Record a stage failure: any non-terminal state → `Failed`
    ///
    /// Returns `false` if the record is already terminal.
    pub fn fail(&mut self) -> bool {
        if self.state.is_terminal() {
            return false;
        }
        self.state = ItemState::Failed;
        true
    }
}
