//! Host shell for the change tracker: loads a page, replays an edit script
//! against it and prints the resulting change report.

#![allow(
    clippy::missing_docs_in_private_items,
    reason = "Internal implementation details don't need public documentation"
)]
#![allow(
    clippy::missing_inline_in_public_items,
    reason = "Inlining decisions left to compiler for this crate"
)]
#![allow(
    clippy::missing_errors_doc,
    reason = "Errors are reported to the user verbatim"
)]

pub mod cli;
pub mod script;
pub mod session;

pub use cli::{Invocation, OutputFormat, execute, render};
pub use script::{EditStep, parse_script};
pub use session::Session;
