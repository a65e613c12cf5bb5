//! Live document model for the change tracker.
//!
//! [`Document`] is an arena of nodes addressed by [`NodeKey`]. It supports the
//! DOM operations the editor performs on a page (attribute and text writes,
//! tree edits), browser-style mutation observers, HTML serialization and
//! selector queries. [`parse_html`] builds a document from markup.

#![allow(
    clippy::missing_docs_in_private_items,
    reason = "Internal implementation details don't need public documentation"
)]
#![allow(
    clippy::missing_inline_in_public_items,
    reason = "Inlining decisions left to compiler for this crate"
)]

pub mod dom;
pub mod parser;
pub mod viewport;

pub use dom::mutation::{MutationKind, MutationObserverInit, MutationRecord, ObserverId};
pub use dom::{Document, DomError, ElementData, Node, NodeKey, NodeKind};
pub use parser::parse_html;
pub use viewport::Viewport;
