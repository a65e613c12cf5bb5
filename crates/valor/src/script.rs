//! JSON edit scripts replayed against a page.
//!
//! A script is an array of steps tagged by `op`:
//!
//! ```json
//! [
//!   { "op": "observe", "selector": ".card" },
//!   { "op": "setStyle", "selector": "#hero", "value": "color: red;" },
//!   { "op": "undo" }
//! ]
//! ```

use serde::Deserialize;

const fn default_pixel_ratio() -> f64 {
    1.0
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum EditStep {
    /// Start tracking every element matching `selector`.
    Observe { selector: String },
    /// Stop tracking every element matching `selector`.
    Unobserve { selector: String },
    SetAttribute {
        selector: String,
        name: String,
        value: String,
    },
    RemoveAttribute { selector: String, name: String },
    /// Replace the whole inline `style` attribute.
    SetStyle { selector: String, value: String },
    /// Edit the text of an element: in place when it has a single text child.
    SetText { selector: String, text: String },
    Undo,
    Redo,
    /// Resize the window the page is shown in.
    Viewport {
        width: u32,
        height: u32,
        #[serde(default = "default_pixel_ratio")]
        device_pixel_ratio: f64,
    },
}

impl EditStep {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Observe { .. } => "observe",
            Self::Unobserve { .. } => "unobserve",
            Self::SetAttribute { .. } => "setAttribute",
            Self::RemoveAttribute { .. } => "removeAttribute",
            Self::SetStyle { .. } => "setStyle",
            Self::SetText { .. } => "setText",
            Self::Undo => "undo",
            Self::Redo => "redo",
            Self::Viewport { .. } => "viewport",
        }
    }
}

/// Parse a script document.
///
/// # Errors
/// Returns an error when the input is not an array of known steps.
pub fn parse_script(source: &str) -> Result<Vec<EditStep>, serde_json::Error> {
    serde_json::from_str(source)
}
