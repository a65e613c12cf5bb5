//! The change tracker context object.
//!
//! One [`ChangeTracker`] per page session, owned by the host and handed the
//! [`Document`] on every call. It owns a single mutation observer with one
//! registration per observed element; the host calls
//! [`ChangeTracker::process_mutations`] after it writes to the document.

use core::fmt;
use std::collections::HashMap;

use chrono::Utc;
use html::{
    Document, MutationKind, MutationObserverInit, MutationRecord, NodeKey, NodeKind, ObserverId,
};
use log::{debug, error, trace, warn};
use tokio::sync::broadcast;

use crate::classify::{EditDraft, MutationTarget, ObservedMutation, classify};
use crate::config::TrackerConfig;
use crate::identity::{
    DataSourceLocator, ElementIdentity, IdentityCache, IdentityResolver, SourceLocator,
};
use crate::ledger::HistoryLedger;
use crate::notify::{ChangeNotifier, HistoryStatus};
use crate::record::{EditKind, EditRecord, HistoryEntry};
use crate::report::{ChangeSet, build_change_set, render_json, render_markdown};
use crate::snapshot::{BaselineStore, ComputedStyleSource, ElementBaseline, InlineCascade};
use crate::viewport::ViewportInfo;

/// Attribute and character data changes with old values, across the subtree.
/// Child-list changes are not watched.
const WATCH_OPTIONS: MutationObserverInit = MutationObserverInit {
    child_list: false,
    attributes: true,
    character_data: true,
    subtree: true,
    attribute_old_value: true,
    character_data_old_value: true,
};

type OffBounds = Box<dyn Fn(&Document, NodeKey) -> bool>;

/// Whether `element` is, or sits inside, an element whose tag starts with `prefix`.
#[must_use]
pub fn is_inside_ui(document: &Document, element: NodeKey, prefix: &str) -> bool {
    let mut current = Some(element);
    while let Some(node) = current {
        if document.tag_name(node).is_some_and(|tag| tag.starts_with(prefix)) {
            return true;
        }
        current = document.parent_element(node);
    }
    false
}

/// Direction of a history writeback.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Replay {
    Undo,
    Redo,
}

impl fmt::Display for Replay {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(match self {
            Self::Undo => "undo",
            Self::Redo => "redo",
        })
    }
}

pub struct ChangeTracker {
    config: TrackerConfig,
    ledger: HistoryLedger,
    notifier: ChangeNotifier,
    resolver: IdentityResolver,
    identities: IdentityCache,
    baselines: BaselineStore,
    styles: Box<dyn ComputedStyleSource>,
    source_locator: Option<Box<dyn SourceLocator>>,
    off_bounds: OffBounds,
    observer: Option<ObserverId>,
    /// Observed elements in observation order.
    observed: Vec<NodeKey>,
}

impl fmt::Debug for ChangeTracker {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ChangeTracker")
            .field("config", &self.config)
            .field("ledger", &self.ledger)
            .field("observer", &self.observer)
            .field("observed", &self.observed)
            .finish_non_exhaustive()
    }
}

impl Default for ChangeTracker {
    fn default() -> Self {
        Self::new(TrackerConfig::default())
    }
}

impl ChangeTracker {
    /// A tracker with the `data-source` locator, inline-style cascade and the
    /// default off-bounds rule (inside a `<vis-bug*>` element).
    #[must_use]
    pub fn new(config: TrackerConfig) -> Self {
        let ui_prefix = config.ui_tag_prefix.clone();
        Self {
            ledger: HistoryLedger::new(config.history_limit),
            notifier: ChangeNotifier::new(config.notify_capacity),
            resolver: IdentityResolver::new(config.internal_prefix.clone()),
            identities: IdentityCache::default(),
            baselines: BaselineStore::default(),
            styles: Box::new(InlineCascade),
            source_locator: Some(Box::new(DataSourceLocator)),
            off_bounds: Box::new(move |document: &Document, element: NodeKey| {
                is_inside_ui(document, element, &ui_prefix)
            }),
            observer: None,
            observed: Vec::new(),
            config,
        }
    }

    /// Replace the source attribution lookup; `None` disables attribution.
    #[must_use]
    pub fn with_source_locator(mut self, locator: Option<Box<dyn SourceLocator>>) -> Self {
        self.source_locator = locator;
        self
    }

    /// Replace the predicate marking the tool's own UI elements.
    #[must_use]
    pub fn with_off_bounds(
        mut self,
        predicate: impl Fn(&Document, NodeKey) -> bool + 'static,
    ) -> Self {
        self.off_bounds = Box::new(predicate);
        self
    }

    /// Replace the computed style source used for baselines.
    #[must_use]
    pub fn with_style_source(mut self, styles: Box<dyn ComputedStyleSource>) -> Self {
        self.styles = styles;
        self
    }

    fn observer_id(&mut self, document: &mut Document) -> ObserverId {
        *self
            .observer
            .get_or_insert_with(|| document.create_observer())
    }

    // ----- observation -----

    /// Start tracking each element. Already observed, off-bounds and
    /// non-element keys are skipped. The first observation captures a baseline
    /// and caches the element's identity.
    pub fn observe(&mut self, document: &mut Document, elements: impl IntoIterator<Item = NodeKey>) {
        let observer = self.observer_id(document);
        for element in elements {
            if self.observed.contains(&element) {
                continue;
            }
            if !document.is_element(element) {
                debug!("not observing {element}: not an element");
                continue;
            }
            if (self.off_bounds)(&*document, element) {
                debug!("not observing {element}: off-bounds");
                continue;
            }
            self.baselines
                .capture_once(document, element, self.styles.as_ref());
            self.identities.ensure(
                document,
                &self.resolver,
                self.source_locator.as_deref(),
                element,
            );
            if let Err(err) = document.observe(observer, element, WATCH_OPTIONS) {
                warn!("failed to observe {element}: {err}");
                continue;
            }
            self.observed.push(element);
            trace!("observing {element}");
        }
    }

    /// Stop tracking each element. Recorded history is kept; pending
    /// mutations are recorded before the watch goes away. Side table entries
    /// of detached elements nothing refers to any more are dropped.
    pub fn unobserve(
        &mut self,
        document: &mut Document,
        elements: impl IntoIterator<Item = NodeKey>,
    ) {
        let Some(observer) = self.observer else {
            return;
        };
        self.process_mutations(document);
        for element in elements {
            let Some(index) = self.observed.iter().position(|key| *key == element) else {
                continue;
            };
            self.observed.remove(index);
            document.unobserve(observer, element);
            trace!("stopped observing {element}");
        }
        self.prune_detached(document);
    }

    #[must_use]
    pub fn is_observing(&self, element: NodeKey) -> bool {
        self.observed.contains(&element)
    }

    #[must_use]
    pub fn observed(&self) -> &[NodeKey] {
        &self.observed
    }

    // ----- mutation handling -----

    /// Deliver pending mutation records: classify each one and push the
    /// resulting edits. Returns how many records were pushed.
    pub fn process_mutations(&mut self, document: &mut Document) -> usize {
        let Some(observer) = self.observer else {
            return 0;
        };
        let records = document.take_records(observer);
        if records.is_empty() {
            return 0;
        }
        let reserved = self.config.reserved_attribute_prefix();
        let mut pushed = 0;
        for mutation in observe_batch(document, &records) {
            if let Some(draft) = classify(&mutation, &reserved) {
                self.push_edit(document, draft);
                pushed += 1;
            }
        }
        pushed
    }

    fn push_edit(&mut self, document: &Document, draft: EditDraft) {
        self.identities.ensure(
            document,
            &self.resolver,
            self.source_locator.as_deref(),
            draft.target,
        );
        let record = EditRecord {
            kind: draft.kind,
            target: draft.target,
            attribute_name: draft.attribute_name,
            old_value: draft.old_value,
            new_value: draft.new_value,
            timestamp: Utc::now().timestamp_millis(),
            viewport: ViewportInfo::from(document.viewport()),
        };
        debug!("recorded {} edit on {}", record.kind, record.target);
        let status = self.ledger.push(record);
        self.notifier.notify(status);
    }

    // ----- undo / redo -----

    /// Revert the record at the cursor.
    ///
    /// Returns the affected element, or `None` when there is nothing to undo
    /// or the element is detached or off-bounds.
    pub fn undo(&mut self, document: &mut Document) -> Option<NodeKey> {
        self.process_mutations(document);
        let record = self.ledger.peek_undo()?.clone();
        self.write_back(document, &record, record.old_value.as_deref(), Replay::Undo);
        self.ledger.retreat();
        self.notifier.notify(self.ledger.status());
        self.affected(document, record.target)
    }

    /// Reapply the record after the cursor. Same return contract as [`ChangeTracker::undo`].
    pub fn redo(&mut self, document: &mut Document) -> Option<NodeKey> {
        self.process_mutations(document);
        let record = self.ledger.peek_redo()?.clone();
        self.write_back(document, &record, record.new_value.as_deref(), Replay::Redo);
        self.ledger.advance();
        self.notifier.notify(self.ledger.status());
        self.affected(document, record.target)
    }

    fn affected(&self, document: &Document, element: NodeKey) -> Option<NodeKey> {
        if !document.is_connected(element) || (self.off_bounds)(document, element) {
            return None;
        }
        Some(element)
    }

    /// Write `value` for `record` with the observer fully detached, then
    /// re-register every observed element. Failures are logged, never returned.
    fn write_back(
        &mut self,
        document: &mut Document,
        record: &EditRecord,
        value: Option<&str>,
        replay: Replay,
    ) {
        let observer = self.observer_id(document);
        document.disconnect(observer);

        let result = match record.kind {
            EditKind::Style | EditKind::Attribute => {
                let name = record.attribute_name.as_deref().unwrap_or("style");
                match value {
                    Some(value) => document.set_attribute(record.target, name, value),
                    None => document.remove_attribute(record.target, name),
                }
            }
            EditKind::Text => match value {
                Some(text) if !text.is_empty() => document.set_text_content(record.target, text),
                _ => {
                    trace!("{replay} of text on {}: nothing to restore", record.target);
                    Ok(())
                }
            },
        };
        if let Err(err) = result {
            error!("{replay} failed on {}: {err}", record.target);
        }

        for element in &self.observed {
            if let Err(err) = document.observe(observer, *element, WATCH_OPTIONS) {
                warn!("failed to re-observe {element} after {replay}: {err}");
            }
        }
    }

    // ----- reporting -----

    /// Cached identity, or a live one when the element was never cached.
    fn identity_of(&self, document: &Document, element: NodeKey) -> ElementIdentity {
        self.identities.get(element).cloned().unwrap_or_else(|| {
            self.resolver
                .resolve_or_unknown(document, element, self.source_locator.as_deref())
        })
    }

    /// Committed records grouped per element, with live final state.
    #[must_use]
    pub fn changes(&self, document: &Document) -> ChangeSet {
        build_change_set(
            document,
            self.ledger.committed(),
            |element| self.identity_of(document, element),
            Utc::now(),
        )
    }

    #[must_use]
    pub fn changes_as_text(&self, document: &Document) -> String {
        render_markdown(&self.changes(document))
    }

    #[must_use]
    pub fn changes_as_json(&self, document: &Document) -> String {
        render_json(&self.changes(document))
    }

    /// Committed records, oldest first, each with a freshly computed label.
    #[must_use]
    pub fn history(&self, document: &Document) -> Vec<HistoryEntry> {
        self.ledger
            .committed()
            .map(|record| HistoryEntry::new(record, self.resolver.label(document, record.target)))
            .collect()
    }

    // ----- state -----

    #[must_use]
    pub fn status(&self) -> HistoryStatus {
        self.ledger.status()
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.ledger.can_undo()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.ledger.can_redo()
    }

    #[must_use]
    pub const fn ledger(&self) -> &HistoryLedger {
        &self.ledger
    }

    #[must_use]
    pub const fn config(&self) -> &TrackerConfig {
        &self.config
    }

    #[must_use]
    pub const fn resolver(&self) -> &IdentityResolver {
        &self.resolver
    }

    #[must_use]
    pub fn baseline(&self, element: NodeKey) -> Option<&ElementBaseline> {
        self.baselines.get(element)
    }

    #[must_use]
    pub fn identity(&self, element: NodeKey) -> Option<&ElementIdentity> {
        self.identities.get(element)
    }

    /// Subscribe to history status changes. Drop the receiver to unsubscribe.
    pub fn subscribe(&self) -> broadcast::Receiver<HistoryStatus> {
        self.notifier.subscribe()
    }

    /// Drop all history and prune side tables of detached elements.
    pub fn clear(&mut self, document: &mut Document) {
        self.process_mutations(document);
        let status = self.ledger.clear();
        self.prune_detached(document);
        self.notifier.notify(status);
    }

    /// Forget baselines and identities of elements that are detached, not
    /// observed and not referenced by any held record, undone ones included.
    pub fn prune_detached(&mut self, document: &Document) {
        let referenced: Vec<NodeKey> = self.ledger.held().map(|rec| rec.target).collect();
        let keep = |key: NodeKey| {
            document.is_connected(key)
                || self.observed.contains(&key)
                || referenced.contains(&key)
        };
        let before = self.baselines.len() + self.identities.len();
        self.baselines.retain(keep);
        self.identities.retain(keep);
        let pruned = before - self.baselines.len() - self.identities.len();
        if pruned > 0 {
            debug!("pruned {pruned} side table entries");
        }
    }
}

/// Resolve each record's new value and target shape.
///
/// A record's new value is the old value of the next record for the same
/// node and attribute in the batch, or the live value for the last one.
fn observe_batch(document: &Document, records: &[MutationRecord]) -> Vec<ObservedMutation> {
    let mut value_after: HashMap<(NodeKey, Option<&str>), Option<String>> = HashMap::new();
    let mut observed: Vec<ObservedMutation> = records
        .iter()
        .rev()
        .map(|record| {
            let key = (record.target, record.attribute_name.as_deref());
            let new_value = value_after
                .get(&key)
                .cloned()
                .unwrap_or_else(|| live_value(document, record));
            value_after.insert(key, record.old_value.clone());
            ObservedMutation {
                kind: record.kind,
                target: target_shape(document, record.target),
                attribute_name: record.attribute_name.clone(),
                old_value: record.old_value.clone(),
                new_value,
            }
        })
        .collect();
    observed.reverse();
    observed
}

fn live_value(document: &Document, record: &MutationRecord) -> Option<String> {
    match (record.kind, record.attribute_name.as_deref()) {
        (MutationKind::Attributes, Some(name)) => document
            .get_attribute(record.target, name)
            .map(ToOwned::to_owned),
        (MutationKind::CharacterData, _) => document.text_content(record.target),
        _ => None,
    }
}

fn target_shape(document: &Document, node: NodeKey) -> MutationTarget {
    match document.node(node).map(|entry| &entry.kind) {
        Some(NodeKind::Element(_)) => MutationTarget::Element(node),
        Some(NodeKind::Text(_)) => MutationTarget::Text {
            node,
            parent: document.parent_element(node),
        },
        _ => MutationTarget::Other(node),
    }
}
