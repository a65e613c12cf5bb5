//! Element identity: CSS selector, XPath, label and optional source attribution.
//!
//! Everything here is computed from the tree at call time. Selector uniqueness
//! is checked by re-querying the document; a query that fails to parse counts
//! as "not unique" and never reaches the caller.

use std::collections::HashMap;

use css_selectors::escape_identifier;
use html::{Document, NodeKey};
use log::debug;
use serde::{Deserialize, Serialize};

/// Where an element comes from in the application source, as reported by an
/// external collaborator.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SourceInfo {
    pub file_path: Option<String>,
    pub line_number: Option<u32>,
    pub column_number: Option<u32>,
    pub component_name: Option<String>,
}

/// Optional source attribution lookup. Never required for correctness.
pub trait SourceLocator {
    fn locate(&self, document: &Document, element: NodeKey) -> Option<SourceInfo>;
}

/// Reads a JSON `data-source` attribute from the element or its closest ancestor.
#[derive(Clone, Copy, Debug, Default)]
pub struct DataSourceLocator;

impl SourceLocator for DataSourceLocator {
    fn locate(&self, document: &Document, element: NodeKey) -> Option<SourceInfo> {
        let mut current = Some(element);
        while let Some(node) = current {
            if let Some(raw) = document.get_attribute(node, "data-source") {
                return match serde_json::from_str::<SourceInfo>(raw) {
                    Ok(info) => Some(info),
                    Err(err) => {
                        debug!("ignoring malformed data-source on {node}: {err}");
                        None
                    }
                };
            }
            current = document.parent_element(node);
        }
        None
    }
}

/// Cached description of an element.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementIdentity {
    pub source: Option<SourceInfo>,
    pub css_selector: String,
    pub xpath: String,
    pub label: String,
    pub tag_name: String,
}

impl ElementIdentity {
    fn unknown() -> Self {
        Self {
            source: None,
            css_selector: String::new(),
            xpath: String::new(),
            label: UNKNOWN_LABEL.to_owned(),
            tag_name: String::new(),
        }
    }
}

/// Label of a node that is not an element.
pub const UNKNOWN_LABEL: &str = "unknown";

/// Label preferring the component name from source attribution.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceLabel {
    pub label: String,
    pub html_label: String,
    pub component_name: Option<String>,
    /// `path:line:column`, with the parts that are known.
    pub file_path: Option<String>,
}

#[derive(Clone, Debug)]
pub struct IdentityResolver {
    internal_prefix: String,
}

impl IdentityResolver {
    #[must_use]
    pub fn new(internal_prefix: impl Into<String>) -> Self {
        Self {
            internal_prefix: internal_prefix.into(),
        }
    }

    /// Whether a class token belongs to the tool's own UI.
    #[must_use]
    pub fn is_internal_class(&self, class: &str) -> bool {
        class.starts_with(self.internal_prefix.as_str()) || class.starts_with("__")
    }

    fn visible_classes<'doc>(
        &self,
        document: &'doc Document,
        element: NodeKey,
        limit: usize,
    ) -> Vec<&'doc str> {
        document
            .element(element)
            .map(|data| {
                data.classes()
                    .filter(|class| !self.is_internal_class(class))
                    .take(limit)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Full identity of `element`; `None` when it is not an element.
    #[must_use]
    pub fn resolve(
        &self,
        document: &Document,
        element: NodeKey,
        locator: Option<&dyn SourceLocator>,
    ) -> Option<ElementIdentity> {
        let tag_name = document.tag_name(element)?.to_owned();
        Some(ElementIdentity {
            source: locator.and_then(|source| source.locate(document, element)),
            css_selector: self.css_selector(document, element),
            xpath: self.xpath(document, element),
            label: self.label(document, element),
            tag_name,
        })
    }

    /// Like [`IdentityResolver::resolve`], with a placeholder for non-elements.
    #[must_use]
    pub fn resolve_or_unknown(
        &self,
        document: &Document,
        element: NodeKey,
        locator: Option<&dyn SourceLocator>,
    ) -> ElementIdentity {
        self.resolve(document, element, locator)
            .unwrap_or_else(ElementIdentity::unknown)
    }

    /// `tag#id.class1.class2`, skipping internal classes.
    #[must_use]
    pub fn label(&self, document: &Document, element: NodeKey) -> String {
        let Some(data) = document.element(element) else {
            return UNKNOWN_LABEL.to_owned();
        };
        let mut label = data.tag.clone();
        if let Some(id) = data.id().filter(|id| !id.is_empty()) {
            label.push('#');
            label.push_str(id);
        }
        for class in self.visible_classes(document, element, 2) {
            label.push('.');
            label.push_str(class);
        }
        label
    }

    /// Label using the component name when the locator knows one.
    #[must_use]
    pub fn label_with_source(
        &self,
        document: &Document,
        element: NodeKey,
        locator: Option<&dyn SourceLocator>,
    ) -> SourceLabel {
        let html_label = self.label(document, element);
        let source = locator.and_then(|source| source.locate(document, element));
        match source {
            Some(SourceInfo {
                file_path,
                line_number,
                column_number,
                component_name: Some(component),
            }) => {
                let file_path = file_path.map(|path| {
                    let mut out = path;
                    for part in [line_number, column_number].into_iter().flatten() {
                        out.push_str(&format!(":{part}"));
                    }
                    out
                });
                SourceLabel {
                    label: component.clone(),
                    html_label,
                    component_name: Some(component),
                    file_path,
                }
            }
            _ => SourceLabel {
                label: html_label.clone(),
                html_label,
                component_name: None,
                file_path: None,
            },
        }
    }

    /// A selector for `element`: the ancestor path when it is unique,
    /// otherwise the shortest unique candidate, otherwise the ancestor path anyway.
    #[must_use]
    pub fn css_selector(&self, document: &Document, element: NodeKey) -> String {
        let full = self.ancestor_path(document, element);
        match document.query_selector_all(&full) {
            Ok(matches) if matches == [element] => full,
            Ok(_) => self.optimized_selector(document, element).unwrap_or(full),
            Err(err) => {
                debug!("selector {full:?} does not parse: {err}");
                full
            }
        }
    }

    /// `#id` or `tag.classes:nth-of-type(n)` steps joined by ` > `, up to the
    /// nearest id or to `body`.
    fn ancestor_path(&self, document: &Document, element: NodeKey) -> String {
        let mut path: Vec<String> = Vec::new();
        let mut current = Some(element);
        while let Some(node) = current {
            let Some(data) = document.element(node) else {
                break;
            };
            if let Some(id) = data.id().filter(|id| !id.is_empty()) {
                path.push(format!("#{}", escape_identifier(id)));
                break;
            }
            let mut step = data.tag.clone();
            for class in self.visible_classes(document, node, 3) {
                step.push('.');
                step.push_str(&escape_identifier(class));
            }
            if let Some(index) = same_tag_index(document, node) {
                step.push_str(&format!(":nth-of-type({index})"));
            }
            path.push(step);
            current = document.parent_element(node);
            if current.is_some_and(|parent| document.tag_name(parent) == Some("body")) {
                path.push("body".to_owned());
                break;
            }
        }
        path.reverse();
        path.join(" > ")
    }

    fn optimized_selector(&self, document: &Document, element: NodeKey) -> Option<String> {
        let data = document.element(element)?;
        if let Some(id) = data.id().filter(|id| !id.is_empty()) {
            let candidate = format!("#{}", escape_identifier(id));
            if is_unique(document, &candidate, element) {
                return Some(candidate);
            }
        }

        let classes = self.visible_classes(document, element, usize::MAX);
        let mut candidate = data.tag.clone();
        for class in classes {
            candidate.push('.');
            candidate.push_str(&escape_identifier(class));
            if is_unique(document, &candidate, element) {
                return Some(candidate);
            }
        }

        let reserved = format!("data-{}", self.internal_prefix);
        data.attrs
            .iter()
            .filter(|(name, value)| {
                name.starts_with("data-") && !name.starts_with(reserved.as_str()) && !value.is_empty()
            })
            .map(|(name, value)| {
                format!(
                    "{}[{}=\"{}\"]",
                    data.tag,
                    escape_identifier(name),
                    escape_identifier(value)
                )
            })
            .find(|candidate| is_unique(document, candidate, element))
    }

    /// `/html/body/div[2]`, with a 1-based index only where same-tag siblings exist.
    #[must_use]
    pub fn xpath(&self, document: &Document, element: NodeKey) -> String {
        let mut parts: Vec<String> = Vec::new();
        let mut current = Some(element);
        while let Some(node) = current {
            let Some(tag) = document.tag_name(node) else {
                break;
            };
            let mut part = tag.to_owned();
            if let Some(index) = same_tag_index(document, node) {
                part.push_str(&format!("[{index}]"));
            }
            parts.push(part);
            if tag == "html" {
                break;
            }
            current = document.parent_element(node);
        }
        if parts.last().is_none_or(|top| top != "html") {
            parts.push("html".to_owned());
        }
        parts.reverse();
        format!("/{}", parts.join("/"))
    }
}

/// 1-based position among same-tag element siblings, only when there is more than one.
fn same_tag_index(document: &Document, element: NodeKey) -> Option<usize> {
    let parent = document.parent_element(element)?;
    let tag = document.tag_name(element)?;
    let siblings: Vec<NodeKey> = document
        .element_children(parent)
        .into_iter()
        .filter(|sibling| document.tag_name(*sibling) == Some(tag))
        .collect();
    if siblings.len() < 2 {
        return None;
    }
    siblings
        .iter()
        .position(|sibling| *sibling == element)
        .map(|index| index + 1)
}

fn is_unique(document: &Document, selector: &str, element: NodeKey) -> bool {
    match document.query_selector_all(selector) {
        Ok(matches) => matches == [element],
        Err(err) => {
            debug!("candidate selector {selector:?} rejected: {err}");
            false
        }
    }
}

/// Identities cached per element. Holds plain keys, so it never keeps a node alive.
#[derive(Debug, Default)]
pub struct IdentityCache {
    entries: HashMap<NodeKey, ElementIdentity>,
}

impl IdentityCache {
    #[must_use]
    pub fn get(&self, element: NodeKey) -> Option<&ElementIdentity> {
        self.entries.get(&element)
    }

    #[must_use]
    pub fn contains(&self, element: NodeKey) -> bool {
        self.entries.contains_key(&element)
    }

    /// Resolve and store the identity of `element` unless it is already cached.
    pub fn ensure(
        &mut self,
        document: &Document,
        resolver: &IdentityResolver,
        locator: Option<&dyn SourceLocator>,
        element: NodeKey,
    ) {
        if self.entries.contains_key(&element) {
            return;
        }
        if let Some(identity) = resolver.resolve(document, element, locator) {
            self.entries.insert(element, identity);
        }
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
