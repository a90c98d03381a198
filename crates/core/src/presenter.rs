//! List presenter boundary
//!
//! The visual list widget lives outside this crate. It feeds the
//! scheduler visibility and viewport-motion events (as method calls on
//! [`Scheduler`](crate::Scheduler)) and receives row-update
//! notifications through this trait.

use crate::record::ItemId;

/// Consumer of row-update notifications
///
/// `item_updated` fires after any state or content change for an item,
/// and only from the coordination thread while it is draining
/// completions — the presenter never observes a half-updated record.
/// Typical implementations redraw the single affected row.
pub trait ListPresenter: Send + Sync {
    /// An item's state or content changed; refresh its row
    fn item_updated(&self, id: ItemId);
}

/// Presenter that ignores all notifications
///
/// Useful for tests and headless runs that poll records directly.
#[derive(Debug, Default)]
pub struct NullPresenter;

impl ListPresenter for NullPresenter {
    fn item_updated(&self, _id: ItemId) {}
}
