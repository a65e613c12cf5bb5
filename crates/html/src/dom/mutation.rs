//! Mutation observers.
//! Spec: <https://dom.spec.whatwg.org/#mutation-observers>
//!
//! Observers are owned by the [`Document`](super::Document) and identified by
//! [`ObserverId`]. Records are queued synchronously during each write and
//! handed out by `take_records`; delivering them is up to the host.

use std::collections::BTreeMap;

use super::NodeKey;

/// Handle to an observer created by [`Document::create_observer`](super::Document::create_observer).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(u64);

/// Which mutations a registration is interested in.
/// Spec: <https://dom.spec.whatwg.org/#dictdef-mutationobserverinit>
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct MutationObserverInit {
    pub child_list: bool,
    pub attributes: bool,
    pub character_data: bool,
    pub subtree: bool,
    pub attribute_old_value: bool,
    pub character_data_old_value: bool,
}

/// Spec: <https://dom.spec.whatwg.org/#dom-mutationrecord-type>
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MutationKind {
    Attributes,
    CharacterData,
    ChildList,
}

/// A single queued mutation.
/// Spec: <https://dom.spec.whatwg.org/#interface-mutationrecord>
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MutationRecord {
    pub kind: MutationKind,
    pub target: NodeKey,
    pub attribute_name: Option<String>,
    /// Only filled when a matching registration asked for old values.
    pub old_value: Option<String>,
    pub added_nodes: Vec<NodeKey>,
    pub removed_nodes: Vec<NodeKey>,
}

impl MutationRecord {
    pub(crate) fn attributes(target: NodeKey, name: &str, old_value: Option<String>) -> Self {
        Self {
            kind: MutationKind::Attributes,
            target,
            attribute_name: Some(name.to_owned()),
            old_value,
            added_nodes: Vec::new(),
            removed_nodes: Vec::new(),
        }
    }

    pub(crate) fn character_data(target: NodeKey, old_value: String) -> Self {
        Self {
            kind: MutationKind::CharacterData,
            target,
            attribute_name: None,
            old_value: Some(old_value),
            added_nodes: Vec::new(),
            removed_nodes: Vec::new(),
        }
    }

    pub(crate) fn child_list(target: NodeKey, added: Vec<NodeKey>, removed: Vec<NodeKey>) -> Self {
        Self {
            kind: MutationKind::ChildList,
            target,
            attribute_name: None,
            old_value: None,
            added_nodes: added,
            removed_nodes: removed,
        }
    }
}

#[derive(Clone, Debug)]
struct Registration {
    target: NodeKey,
    options: MutationObserverInit,
}

impl Registration {
    /// Whether this registration on an inclusive ancestor of the mutated node
    /// wants the record, and whether it asks for the old value.
    fn interest(&self, kind: MutationKind, is_target: bool) -> Option<bool> {
        if !is_target && !self.options.subtree {
            return None;
        }
        match kind {
            MutationKind::Attributes => self
                .options
                .attributes
                .then_some(self.options.attribute_old_value),
            MutationKind::CharacterData => self
                .options
                .character_data
                .then_some(self.options.character_data_old_value),
            MutationKind::ChildList => self.options.child_list.then_some(false),
        }
    }
}

/// All observers of one document. `BTreeMap` keeps creation order, which is
/// the order observers are notified in.
#[derive(Debug, Default)]
pub(crate) struct ObserverRegistry {
    next_id: u64,
    registrations: BTreeMap<ObserverId, Vec<Registration>>,
    queues: BTreeMap<ObserverId, Vec<MutationRecord>>,
}

impl ObserverRegistry {
    pub(crate) fn create(&mut self) -> ObserverId {
        let id = ObserverId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        self.registrations.insert(id, Vec::new());
        self.queues.insert(id, Vec::new());
        id
    }

    /// Register (or re-register with new options) `target`. Returns false for an unknown observer.
    pub(crate) fn observe(
        &mut self,
        observer: ObserverId,
        target: NodeKey,
        options: MutationObserverInit,
    ) -> bool {
        let Some(registrations) = self.registrations.get_mut(&observer) else {
            return false;
        };
        if let Some(existing) = registrations.iter_mut().find(|reg| reg.target == target) {
            existing.options = options;
        } else {
            registrations.push(Registration { target, options });
        }
        true
    }

    /// Drop the registration for `target`, keeping already queued records.
    pub(crate) fn unobserve(&mut self, observer: ObserverId, target: NodeKey) -> bool {
        let Some(registrations) = self.registrations.get_mut(&observer) else {
            return false;
        };
        let before = registrations.len();
        registrations.retain(|reg| reg.target != target);
        registrations.len() != before
    }

    /// Drop every registration and discard queued records.
    /// Spec: <https://dom.spec.whatwg.org/#dom-mutationobserver-disconnect>
    pub(crate) fn disconnect(&mut self, observer: ObserverId) {
        if let Some(registrations) = self.registrations.get_mut(&observer) {
            registrations.clear();
        }
        if let Some(queue) = self.queues.get_mut(&observer) {
            queue.clear();
        }
    }

    pub(crate) fn release(&mut self, observer: ObserverId) {
        self.registrations.remove(&observer);
        self.queues.remove(&observer);
    }

    pub(crate) fn take_records(&mut self, observer: ObserverId) -> Vec<MutationRecord> {
        self.queues
            .get_mut(&observer)
            .map(core::mem::take)
            .unwrap_or_default()
    }

    pub(crate) fn has_pending(&self, observer: ObserverId) -> bool {
        self.queues
            .get(&observer)
            .is_some_and(|queue| !queue.is_empty())
    }

    pub(crate) fn is_observing(&self, observer: ObserverId, target: NodeKey) -> bool {
        self.registrations
            .get(&observer)
            .is_some_and(|registrations| registrations.iter().any(|reg| reg.target == target))
    }

    /// Queue `record` for every interested observer, at most once per observer.
    /// `inclusive_ancestors` starts with the record's target.
    /// Spec: <https://dom.spec.whatwg.org/#queueing-a-mutation-record>
    pub(crate) fn queue(&mut self, inclusive_ancestors: &[NodeKey], record: &MutationRecord) {
        for (observer, registrations) in &self.registrations {
            let mut interested = false;
            let mut wants_old_value = false;
            for (depth, node) in inclusive_ancestors.iter().enumerate() {
                for registration in registrations.iter().filter(|reg| reg.target == *node) {
                    if let Some(old_value) = registration.interest(record.kind, depth == 0) {
                        interested = true;
                        wants_old_value |= old_value;
                    }
                }
            }
            if !interested {
                continue;
            }
            let mut delivered = record.clone();
            if !wants_old_value {
                delivered.old_value = None;
            }
            self.queues.entry(*observer).or_default().push(delivered);
        }
    }
}
