//! Filmstrip Core Library
//!
//! Item state model and viewport-driven work scheduling for the
//! filmstrip list. The presenter reports which rows are visible; the
//! [`Scheduler`] reconciles that set against the work already in
//! flight, cancelling jobs for rows that scrolled away and admitting
//! fetch/transform jobs for rows that scrolled in.

pub mod catalog;
pub mod error;
pub mod presenter;
pub mod record;
pub mod scheduler;
pub mod tracker;

pub use catalog::{parse_catalog, CatalogEntry};
pub use error::{CatalogError, StageError};
pub use presenter::{ListPresenter, NullPresenter};
pub use record::{ItemId, ItemRecord, ItemState, Stage};
pub use scheduler::{Scheduler, SchedulerConfig, StageFunctions};
pub use tracker::{JobHandle, PendingWork};
