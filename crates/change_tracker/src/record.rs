//! Edit records: the unit of history.

use core::fmt;

use html::NodeKey;
use serde::Serialize;

use crate::viewport::ViewportInfo;

/// What an edit changed.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EditKind {
    /// The whole inline `style` attribute.
    Style,
    /// Any other attribute outside the reserved prefix.
    Attribute,
    /// Text content of an element.
    Text,
}

impl fmt::Display for EditKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(match self {
            Self::Style => "style",
            Self::Attribute => "attribute",
            Self::Text => "text",
        })
    }
}

/// One atomic, reversible change. Immutable once in the ledger.
///
/// `None` values mean "attribute absent" or "no previous text".
#[derive(Clone, Debug, PartialEq)]
pub struct EditRecord {
    pub kind: EditKind,
    /// Owning element. Text edits are attributed to the text node's parent.
    pub target: NodeKey,
    /// `style` for style edits, the attribute name for attribute edits.
    pub attribute_name: Option<String>,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    /// Milliseconds since the Unix epoch, non-decreasing across the ledger.
    pub timestamp: i64,
    pub viewport: ViewportInfo,
}

/// A committed record annotated with a freshly computed element label.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    #[serde(skip)]
    pub target: NodeKey,
    #[serde(rename = "type")]
    pub kind: EditKind,
    pub element_label: String,
    pub attribute_name: Option<String>,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub timestamp: i64,
    pub viewport: ViewportInfo,
}

impl HistoryEntry {
    pub(crate) fn new(record: &EditRecord, element_label: String) -> Self {
        Self {
            target: record.target,
            kind: record.kind,
            element_label,
            attribute_name: record.attribute_name.clone(),
            old_value: record.old_value.clone(),
            new_value: record.new_value.clone(),
            timestamp: record.timestamp,
            viewport: record.viewport,
        }
    }
}
