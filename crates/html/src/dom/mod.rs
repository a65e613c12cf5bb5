//! Arena-backed document tree.
//!
//! Nodes live in a map keyed by [`NodeKey`] and stay addressable after they
//! are removed from the tree, so callers can hold keys to detached elements
//! and test them with [`Document::is_connected`].

pub mod mutation;
mod printing;
mod query;

use core::fmt;
use std::collections::HashMap;

use log::trace;
use smallvec::SmallVec;

use crate::viewport::Viewport;
use mutation::{MutationObserverInit, MutationRecord, ObserverId, ObserverRegistry};

/// Stable, non-owning handle to a node of a [`Document`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeKey(pub u64);

impl NodeKey {
    /// The document node itself.
    pub const ROOT: Self = Self(0);
}

impl fmt::Display for NodeKey {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "#{}", self.0)
    }
}

/// Tag name and attributes of an element, in insertion order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ElementData {
    pub tag: String,
    pub attrs: SmallVec<(String, String), 4>,
}

impl ElementData {
    #[must_use]
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attrs: SmallVec::new(),
        }
    }

    #[must_use]
    pub fn get_attribute(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Value of the `id` attribute, if any.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.get_attribute("id")
    }

    /// Class tokens in attribute order.
    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.get_attribute("class")
            .unwrap_or_default()
            .split_ascii_whitespace()
    }

    #[must_use]
    pub fn has_class(&self, class: &str) -> bool {
        self.classes().any(|token| token == class)
    }

    fn set(&mut self, name: &str, value: &str) -> Option<String> {
        if let Some((_, existing)) = self.attrs.iter_mut().find(|(key, _)| key == name) {
            return Some(core::mem::replace(existing, value.to_owned()));
        }
        self.attrs.push((name.to_owned(), value.to_owned()));
        None
    }

    fn remove(&mut self, name: &str) -> Option<String> {
        let index = self.attrs.iter().position(|(key, _)| key == name)?;
        Some(self.attrs.remove(index).1)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Document,
    Element(ElementData),
    Text(String),
    Comment(String),
}

#[derive(Clone, Debug)]
pub struct Node {
    pub kind: NodeKind,
    pub parent: Option<NodeKey>,
    pub children: Vec<NodeKey>,
}

impl Node {
    const fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            parent: None,
            children: Vec::new(),
        }
    }
}

/// Errors raised by document operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomError {
    UnknownNode(NodeKey),
    UnknownObserver(ObserverId),
    NotAnElement(NodeKey),
    NotText(NodeKey),
    InvalidAttributeName(String),
    /// Insertion would put a node inside itself or under a leaf node.
    HierarchyRequest,
    NotAChild { parent: NodeKey, child: NodeKey },
    Parse(String),
}

impl fmt::Display for DomError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownNode(key) => write!(formatter, "unknown node {key}"),
            Self::UnknownObserver(id) => write!(formatter, "unknown observer {id:?}"),
            Self::NotAnElement(key) => write!(formatter, "node {key} is not an element"),
            Self::NotText(key) => write!(formatter, "node {key} is not character data"),
            Self::InvalidAttributeName(name) => {
                write!(formatter, "invalid attribute name: {name:?}")
            }
            Self::HierarchyRequest => formatter.write_str("hierarchy request error"),
            Self::NotAChild { parent, child } => {
                write!(formatter, "node {child} is not a child of {parent}")
            }
            Self::Parse(message) => write!(formatter, "parse error: {message}"),
        }
    }
}

impl std::error::Error for DomError {}

#[derive(Debug)]
pub struct Document {
    nodes: HashMap<NodeKey, Node>,
    next_key: u64,
    observers: ObserverRegistry,
    viewport: Viewport,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Empty document containing only the root node.
    #[must_use]
    pub fn new() -> Self {
        let mut nodes = HashMap::new();
        nodes.insert(NodeKey::ROOT, Node::new(NodeKind::Document));
        Self {
            nodes,
            next_key: 1,
            observers: ObserverRegistry::default(),
            viewport: Viewport::default(),
        }
    }

    fn allocate(&mut self, kind: NodeKind) -> NodeKey {
        let key = NodeKey(self.next_key);
        self.next_key = self.next_key.saturating_add(1);
        self.nodes.insert(key, Node::new(kind));
        key
    }

    /// Create a detached element; the tag name is lowercased.
    pub fn create_element(&mut self, tag: &str) -> NodeKey {
        self.allocate(NodeKind::Element(ElementData::new(tag)))
    }

    pub fn create_text(&mut self, text: &str) -> NodeKey {
        self.allocate(NodeKind::Text(text.to_owned()))
    }

    pub fn create_comment(&mut self, text: &str) -> NodeKey {
        self.allocate(NodeKind::Comment(text.to_owned()))
    }

    // ----- tree access -----

    #[must_use]
    pub fn node(&self, key: NodeKey) -> Option<&Node> {
        self.nodes.get(&key)
    }

    #[must_use]
    pub fn element(&self, key: NodeKey) -> Option<&ElementData> {
        match &self.nodes.get(&key)?.kind {
            NodeKind::Element(data) => Some(data),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_element(&self, key: NodeKey) -> bool {
        self.element(key).is_some()
    }

    /// Lowercase tag name of an element.
    #[must_use]
    pub fn tag_name(&self, key: NodeKey) -> Option<&str> {
        self.element(key).map(|data| data.tag.as_str())
    }

    #[must_use]
    pub fn parent(&self, key: NodeKey) -> Option<NodeKey> {
        self.nodes.get(&key)?.parent
    }

    #[must_use]
    pub fn parent_element(&self, key: NodeKey) -> Option<NodeKey> {
        self.parent(key).filter(|parent| self.is_element(*parent))
    }

    /// Child nodes; empty for unknown keys.
    #[must_use]
    pub fn children(&self, key: NodeKey) -> &[NodeKey] {
        self.nodes
            .get(&key)
            .map(|node| node.children.as_slice())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn element_children(&self, key: NodeKey) -> Vec<NodeKey> {
        self.children(key)
            .iter()
            .copied()
            .filter(|child| self.is_element(*child))
            .collect()
    }

    #[must_use]
    pub fn previous_element_sibling(&self, key: NodeKey) -> Option<NodeKey> {
        let parent = self.parent(key)?;
        let siblings = self.children(parent);
        let index = siblings.iter().position(|sibling| *sibling == key)?;
        siblings[..index]
            .iter()
            .rev()
            .copied()
            .find(|sibling| self.is_element(*sibling))
    }

    /// True when `key` is in the tree rooted at the document node.
    #[must_use]
    pub fn is_connected(&self, key: NodeKey) -> bool {
        let mut current = Some(key);
        while let Some(node) = current {
            if node == NodeKey::ROOT {
                return true;
            }
            current = self.parent(node);
        }
        false
    }

    /// The root element (`<html>` for parsed pages).
    #[must_use]
    pub fn document_element(&self) -> Option<NodeKey> {
        self.element_children(NodeKey::ROOT).first().copied()
    }

    #[must_use]
    pub fn body(&self) -> Option<NodeKey> {
        let root = self.document_element()?;
        self.element_children(root)
            .into_iter()
            .find(|child| self.tag_name(*child) == Some("body"))
    }

    /// Descendants of `key` in tree order, excluding `key`.
    #[must_use]
    pub fn descendants(&self, key: NodeKey) -> Vec<NodeKey> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeKey> = self.children(key).iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.children(node).iter().rev().copied());
        }
        out
    }

    /// Every connected element in tree order.
    #[must_use]
    pub fn elements(&self) -> Vec<NodeKey> {
        self.descendants(NodeKey::ROOT)
            .into_iter()
            .filter(|key| self.is_element(*key))
            .collect()
    }

    fn inclusive_ancestors(&self, key: NodeKey) -> Vec<NodeKey> {
        let mut out = vec![key];
        let mut current = self.parent(key);
        while let Some(node) = current {
            out.push(node);
            current = self.parent(node);
        }
        out
    }

    fn queue_record(&mut self, record: &MutationRecord) {
        let ancestors = self.inclusive_ancestors(record.target);
        self.observers.queue(&ancestors, record);
    }

    // ----- tree mutation -----

    fn require(&self, key: NodeKey) -> Result<&Node, DomError> {
        self.nodes.get(&key).ok_or(DomError::UnknownNode(key))
    }

    /// Append `child` to `parent`, moving it out of its current parent first.
    ///
    /// # Errors
    /// Unknown keys, a leaf `parent`, or a `child` that is an inclusive ancestor of `parent`.
    pub fn append_child(&mut self, parent: NodeKey, child: NodeKey) -> Result<(), DomError> {
        self.check_insertion(parent, child)?;
        if let Some(old_parent) = self.parent(child) {
            self.remove_child(old_parent, child)?;
        }
        self.attach(parent, child);
        self.queue_record(&MutationRecord::child_list(parent, vec![child], Vec::new()));
        Ok(())
    }

    fn check_insertion(&self, parent: NodeKey, child: NodeKey) -> Result<(), DomError> {
        let parent_node = self.require(parent)?;
        let child_node = self.require(child)?;
        if !matches!(parent_node.kind, NodeKind::Document | NodeKind::Element(_))
            || matches!(child_node.kind, NodeKind::Document)
            || self.inclusive_ancestors(parent).contains(&child)
        {
            return Err(DomError::HierarchyRequest);
        }
        Ok(())
    }

    /// Link without queueing records. Used by the parser and by insertion helpers
    /// that queue their own combined record.
    pub(crate) fn attach(&mut self, parent: NodeKey, child: NodeKey) {
        if let Some(node) = self.nodes.get_mut(&child) {
            node.parent = Some(parent);
        }
        if let Some(node) = self.nodes.get_mut(&parent) {
            node.children.push(child);
        }
    }

    fn detach(&mut self, parent: NodeKey, child: NodeKey) -> bool {
        let Some(parent_node) = self.nodes.get_mut(&parent) else {
            return false;
        };
        let Some(index) = parent_node.children.iter().position(|key| *key == child) else {
            return false;
        };
        parent_node.children.remove(index);
        if let Some(node) = self.nodes.get_mut(&child) {
            node.parent = None;
        }
        true
    }

    /// Remove `child` from `parent`. The node stays addressable but disconnected.
    ///
    /// # Errors
    /// `NotAChild` when `child` is not a child of `parent`.
    pub fn remove_child(&mut self, parent: NodeKey, child: NodeKey) -> Result<(), DomError> {
        self.require(parent)?;
        self.require(child)?;
        // Queue while the child is still linked so subtree observers above see it.
        if self.parent(child) != Some(parent) {
            return Err(DomError::NotAChild { parent, child });
        }
        self.queue_record(&MutationRecord::child_list(parent, Vec::new(), vec![child]));
        self.detach(parent, child);
        trace!("removed {child} from {parent}");
        Ok(())
    }

    /// Remove `key` from its parent, if it has one.
    ///
    /// # Errors
    /// `UnknownNode` for an unknown key.
    pub fn remove(&mut self, key: NodeKey) -> Result<(), DomError> {
        self.require(key)?;
        match self.parent(key) {
            Some(parent) => self.remove_child(parent, key),
            None => Ok(()),
        }
    }

    // ----- character data -----

    /// Text of a node: concatenated descendant text for elements, the data for
    /// text and comments, `None` for the document.
    #[must_use]
    pub fn text_content(&self, key: NodeKey) -> Option<String> {
        match &self.nodes.get(&key)?.kind {
            NodeKind::Document => None,
            NodeKind::Text(text) | NodeKind::Comment(text) => Some(text.clone()),
            NodeKind::Element(_) => {
                let mut out = String::new();
                for node in self.descendants(key) {
                    if let Some(Node {
                        kind: NodeKind::Text(text),
                        ..
                    }) = self.nodes.get(&node)
                    {
                        out.push_str(text);
                    }
                }
                Some(out)
            }
        }
    }

    /// Replace the children of an element with a single text node (none for
    /// an empty string). Queues one child-list record. On text and comments
    /// this is [`Document::set_character_data`].
    ///
    /// # Errors
    /// Unknown keys or the document node.
    pub fn set_text_content(&mut self, key: NodeKey, text: &str) -> Result<(), DomError> {
        match &self.require(key)?.kind {
            NodeKind::Document => Err(DomError::NotAnElement(key)),
            NodeKind::Text(_) | NodeKind::Comment(_) => self.set_character_data(key, text),
            NodeKind::Element(_) => {
                let removed: Vec<NodeKey> = self.children(key).to_vec();
                let added: Vec<NodeKey> = if text.is_empty() {
                    Vec::new()
                } else {
                    vec![self.create_text(text)]
                };
                if removed.is_empty() && added.is_empty() {
                    return Ok(());
                }
                let record = MutationRecord::child_list(key, added.clone(), removed.clone());
                self.queue_record(&record);
                for child in removed {
                    self.detach(key, child);
                }
                for child in added {
                    self.attach(key, child);
                }
                Ok(())
            }
        }
    }

    /// Replace the data of a text or comment node.
    ///
    /// # Errors
    /// `NotText` for elements and the document.
    pub fn set_character_data(&mut self, key: NodeKey, data: &str) -> Result<(), DomError> {
        let node = self
            .nodes
            .get_mut(&key)
            .ok_or(DomError::UnknownNode(key))?;
        let old = match &mut node.kind {
            NodeKind::Text(text) | NodeKind::Comment(text) => {
                core::mem::replace(text, data.to_owned())
            }
            _ => return Err(DomError::NotText(key)),
        };
        self.queue_record(&MutationRecord::character_data(key, old));
        Ok(())
    }

    // ----- attributes -----

    #[must_use]
    pub fn get_attribute(&self, key: NodeKey, name: &str) -> Option<&str> {
        let data = self.element(key)?;
        if name.bytes().any(|byte| byte.is_ascii_uppercase()) {
            return data.get_attribute(&name.to_ascii_lowercase());
        }
        data.get_attribute(name)
    }

    #[must_use]
    pub fn has_attribute(&self, key: NodeKey, name: &str) -> bool {
        self.get_attribute(key, name).is_some()
    }

    /// Set an attribute. Always queues a record, even when the value is unchanged.
    ///
    /// # Errors
    /// Non-elements and names that are empty or contain whitespace, quotes, `/`, `=` or `>`.
    pub fn set_attribute(&mut self, key: NodeKey, name: &str, value: &str) -> Result<(), DomError> {
        let name = validate_attribute_name(name)?;
        let data = self.element_mut(key)?;
        let old = data.set(&name, value);
        self.queue_record(&MutationRecord::attributes(key, &name, old));
        Ok(())
    }

    /// Remove an attribute. Queues a record only if it was present.
    ///
    /// # Errors
    /// Non-elements and invalid names.
    pub fn remove_attribute(&mut self, key: NodeKey, name: &str) -> Result<(), DomError> {
        let name = validate_attribute_name(name)?;
        let data = self.element_mut(key)?;
        if let Some(old) = data.remove(&name) {
            self.queue_record(&MutationRecord::attributes(key, &name, Some(old)));
        }
        Ok(())
    }

    fn element_mut(&mut self, key: NodeKey) -> Result<&mut ElementData, DomError> {
        match &mut self
            .nodes
            .get_mut(&key)
            .ok_or(DomError::UnknownNode(key))?
            .kind
        {
            NodeKind::Element(data) => Ok(data),
            _ => Err(DomError::NotAnElement(key)),
        }
    }

    /// Set an attribute during parsing: no validation beyond lowercasing, no records.
    pub(crate) fn push_parsed_attribute(&mut self, key: NodeKey, name: &str, value: &str) {
        if let Ok(data) = self.element_mut(key) {
            data.set(&name.to_ascii_lowercase(), value);
        }
    }

    // ----- observers -----

    pub fn create_observer(&mut self) -> ObserverId {
        self.observers.create()
    }

    /// Register `observer` on `target`; observing the same target again replaces its options.
    ///
    /// # Errors
    /// Unknown observer or node.
    pub fn observe(
        &mut self,
        observer: ObserverId,
        target: NodeKey,
        options: MutationObserverInit,
    ) -> Result<(), DomError> {
        self.require(target)?;
        if self.observers.observe(observer, target, options) {
            Ok(())
        } else {
            Err(DomError::UnknownObserver(observer))
        }
    }

    /// Drop one registration. Returns whether it existed.
    pub fn unobserve(&mut self, observer: ObserverId, target: NodeKey) -> bool {
        self.observers.unobserve(observer, target)
    }

    /// Drop all registrations of `observer` and discard its queued records.
    pub fn disconnect(&mut self, observer: ObserverId) {
        self.observers.disconnect(observer);
    }

    /// Forget `observer` entirely.
    pub fn release_observer(&mut self, observer: ObserverId) {
        self.observers.release(observer);
    }

    pub fn take_records(&mut self, observer: ObserverId) -> Vec<MutationRecord> {
        self.observers.take_records(observer)
    }

    #[must_use]
    pub fn has_pending_records(&self, observer: ObserverId) -> bool {
        self.observers.has_pending(observer)
    }

    #[must_use]
    pub fn is_observing(&self, observer: ObserverId, target: NodeKey) -> bool {
        self.observers.is_observing(observer, target)
    }

    // ----- window -----

    #[must_use]
    pub const fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }
}

/// Lowercase `name` and reject what the DOM `Name` production would.
fn validate_attribute_name(name: &str) -> Result<String, DomError> {
    let invalid = name.is_empty()
        || name.chars().any(|character| {
            character.is_whitespace()
                || character.is_control()
                || matches!(character, '"' | '\'' | '>' | '<' | '/' | '=')
        });
    if invalid {
        return Err(DomError::InvalidAttributeName(name.to_owned()));
    }
    Ok(name.to_ascii_lowercase())
}
