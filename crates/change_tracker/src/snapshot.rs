//! Per-element baselines captured at first observation.

use std::collections::HashMap;

use css_style_attr::{normalize_style_attribute, parse_style_attribute_into_map};
use html::{Document, NodeKey};

/// Visually relevant properties recorded in every baseline.
pub const TRACKED_PROPERTIES: &[&str] = &[
    "color",
    "background-color",
    "background",
    "font-size",
    "font-weight",
    "font-family",
    "font-style",
    "text-align",
    "text-decoration",
    "line-height",
    "letter-spacing",
    "padding",
    "padding-top",
    "padding-right",
    "padding-bottom",
    "padding-left",
    "margin",
    "margin-top",
    "margin-right",
    "margin-bottom",
    "margin-left",
    "border",
    "border-width",
    "border-color",
    "border-style",
    "border-radius",
    "box-shadow",
    "width",
    "height",
    "max-width",
    "max-height",
    "min-width",
    "min-height",
    "display",
    "flex",
    "flex-direction",
    "justify-content",
    "align-items",
    "gap",
    "opacity",
    "visibility",
    "overflow",
    "position",
    "top",
    "right",
    "bottom",
    "left",
    "z-index",
    "transform",
    "cursor",
    "fill",
    "stroke",
];

/// Source of effective (computed) style values.
pub trait ComputedStyleSource {
    /// Effective value of `property` on `element`; empty when unknown.
    fn computed_value(&self, document: &Document, element: NodeKey, property: &str) -> String;
}

/// Computes values from inline styles only: the declared value, else the
/// parent's value for inherited properties, else the initial value.
#[derive(Clone, Copy, Debug, Default)]
pub struct InlineCascade;

impl InlineCascade {
    /// Whether a tracked property inherits by default.
    /// Spec: <https://www.w3.org/TR/css-cascade-4/#inheriting>
    #[must_use]
    pub fn is_inherited_property(property: &str) -> bool {
        matches!(
            property,
            "color"
                | "font-size"
                | "font-weight"
                | "font-family"
                | "font-style"
                | "text-align"
                | "line-height"
                | "letter-spacing"
                | "visibility"
                | "cursor"
                | "fill"
                | "stroke"
        )
    }

    /// Initial values for the tracked properties that have a simple one.
    #[must_use]
    pub fn initial_value(property: &str) -> Option<&'static str> {
        Some(match property {
            "color" => "canvastext",
            "background-color" => "transparent",
            "font-size" => "medium",
            "font-weight" => "normal",
            "font-style" => "normal",
            "text-align" => "start",
            "line-height" | "letter-spacing" => "normal",
            "border-style" => "none",
            "border-width" => "medium",
            "border-radius" | "padding" | "padding-top" | "padding-right" | "padding-bottom"
            | "padding-left" | "margin" | "margin-top" | "margin-right" | "margin-bottom"
            | "margin-left" => "0px",
            "box-shadow" | "max-width" | "max-height" | "transform" => "none",
            "width" | "height" | "min-width" | "min-height" | "top" | "right" | "bottom"
            | "left" | "z-index" | "cursor" => "auto",
            "display" => "inline",
            "flex-direction" => "row",
            "justify-content" | "align-items" | "gap" => "normal",
            "opacity" => "1",
            "visibility" => "visible",
            "overflow" => "visible",
            "position" => "static",
            "fill" => "black",
            "stroke" => "none",
            _ => return None,
        })
    }

    fn declared(document: &Document, element: NodeKey, property: &str) -> Option<String> {
        let style = document.get_attribute(element, "style")?;
        normalize_style_attribute(style)
            .into_iter()
            .find(|decl| decl.property == property)
            .map(|decl| decl.value)
    }
}

impl ComputedStyleSource for InlineCascade {
    fn computed_value(&self, document: &Document, element: NodeKey, property: &str) -> String {
        let mut current = Some(element);
        while let Some(node) = current {
            if let Some(value) = Self::declared(document, node, property) {
                return value;
            }
            if !Self::is_inherited_property(property) {
                break;
            }
            current = document.parent_element(node);
        }
        Self::initial_value(property)
            .map(ToOwned::to_owned)
            .unwrap_or_default()
    }
}

/// What an element looked like when it was first observed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ElementBaseline {
    /// Computed values of [`TRACKED_PROPERTIES`], in that order.
    pub styles: Vec<(String, String)>,
    /// The inline `style` attribute as a property map.
    pub inline_styles: HashMap<String, String>,
    /// All attributes in source order.
    pub attributes: Vec<(String, String)>,
    pub inner_html: String,
    pub text_content: String,
}

impl ElementBaseline {
    /// Snapshot `element`; `None` when it is not an element.
    #[must_use]
    pub fn capture(
        document: &Document,
        element: NodeKey,
        styles: &dyn ComputedStyleSource,
    ) -> Option<Self> {
        let data = document.element(element)?;
        Some(Self {
            styles: TRACKED_PROPERTIES
                .iter()
                .map(|property| {
                    (
                        (*property).to_owned(),
                        styles.computed_value(document, element, property),
                    )
                })
                .collect(),
            inline_styles: data
                .get_attribute("style")
                .map(parse_style_attribute_into_map)
                .unwrap_or_default(),
            attributes: data.attrs.iter().cloned().collect(),
            inner_html: document.inner_html(element).unwrap_or_default(),
            text_content: document.text_content(element).unwrap_or_default(),
        })
    }

    #[must_use]
    pub fn style(&self, property: &str) -> Option<&str> {
        self.styles
            .iter()
            .find(|(name, _)| name == property)
            .map(|(_, value)| value.as_str())
    }
}

/// Baselines keyed by element. Plain keys only; entries are pruned explicitly.
#[derive(Debug, Default)]
pub struct BaselineStore {
    entries: HashMap<NodeKey, ElementBaseline>,
}

impl BaselineStore {
    /// Capture a baseline unless one exists. Returns whether a new one was taken.
    pub fn capture_once(
        &mut self,
        document: &Document,
        element: NodeKey,
        styles: &dyn ComputedStyleSource,
    ) -> bool {
        if self.entries.contains_key(&element) {
            return false;
        }
        match ElementBaseline::capture(document, element, styles) {
            Some(baseline) => {
                self.entries.insert(element, baseline);
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn get(&self, element: NodeKey) -> Option<&ElementBaseline> {
        self.entries.get(&element)
    }

    pub fn retain(&mut self, mut keep: impl FnMut(NodeKey) -> bool) {
        self.entries.retain(|key, _| keep(*key));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
