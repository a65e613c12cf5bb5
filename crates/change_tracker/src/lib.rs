//! Change tracking and undo/redo history for a live document.
//!
//! A [`ChangeTracker`] watches elements of an [`html::Document`], turns their
//! attribute, inline style and text mutations into [`EditRecord`]s kept in a
//! bounded [`HistoryLedger`], replays them backwards and forwards, and folds
//! the committed history into Markdown or JSON reports keyed by element
//! identity (CSS selector, XPath, label).
//!
//! The host drives it synchronously:
//!
//! 1. `tracker.observe(&mut doc, [element])`
//! 2. write to the document, then `tracker.process_mutations(&mut doc)`
//! 3. `tracker.undo(&mut doc)` / `tracker.redo(&mut doc)`
//! 4. `tracker.changes_as_text(&doc)`

#![allow(
    clippy::missing_docs_in_private_items,
    reason = "Internal implementation details don't need public documentation"
)]
#![allow(
    clippy::missing_inline_in_public_items,
    reason = "Inlining decisions left to compiler for this crate"
)]

pub mod classify;
pub mod config;
pub mod identity;
pub mod ledger;
pub mod notify;
pub mod record;
pub mod report;
pub mod snapshot;
pub mod tracker;
pub mod viewport;

pub use config::TrackerConfig;
pub use identity::{
    DataSourceLocator, ElementIdentity, IdentityCache, IdentityResolver, SourceInfo, SourceLabel,
    SourceLocator,
};
pub use ledger::HistoryLedger;
pub use notify::{ChangeNotifier, HistoryStatus};
pub use record::{EditKind, EditRecord, HistoryEntry};
pub use report::{ChangeSet, render_json, render_markdown};
pub use snapshot::{BaselineStore, ComputedStyleSource, ElementBaseline, InlineCascade};
pub use tracker::ChangeTracker;
pub use viewport::{Breakpoint, ViewportInfo};
