//! Raw mutation to edit classification.
//!
//! Pure functions over [`ObservedMutation`], so they can be driven by
//! synthetic inputs without a document.

use html::{MutationKind, NodeKey};

use crate::record::EditKind;

/// What a mutation record's target was when the record was handled.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MutationTarget {
    Element(NodeKey),
    /// A text node and its parent element, if it still has one.
    Text {
        node: NodeKey,
        parent: Option<NodeKey>,
    },
    Other(NodeKey),
}

/// A mutation record with its new value resolved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObservedMutation {
    pub kind: MutationKind,
    pub target: MutationTarget,
    pub attribute_name: Option<String>,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
}

/// An edit ready to be stamped and pushed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EditDraft {
    pub kind: EditKind,
    pub target: NodeKey,
    pub attribute_name: Option<String>,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
}

/// Turn a mutation into an edit, or `None` when it is not tracked.
///
/// - `style` attribute changes become [`EditKind::Style`]; unchanged strings are dropped.
/// - Other attributes become [`EditKind::Attribute`] unless they start with `reserved_prefix`.
/// - Character data and child-list changes on a text node with a parent element
///   become [`EditKind::Text`] on that parent.
#[must_use]
pub fn classify(mutation: &ObservedMutation, reserved_prefix: &str) -> Option<EditDraft> {
    let draft = |kind, target| EditDraft {
        kind,
        target,
        attribute_name: mutation.attribute_name.clone(),
        old_value: mutation.old_value.clone(),
        new_value: mutation.new_value.clone(),
    };
    match (
        mutation.kind,
        mutation.target,
        mutation.attribute_name.as_deref(),
    ) {
        (MutationKind::Attributes, MutationTarget::Element(element), Some("style")) => {
            if mutation.old_value == mutation.new_value {
                return None;
            }
            Some(draft(EditKind::Style, element))
        }
        (MutationKind::Attributes, MutationTarget::Element(element), Some(name))
            if !name.starts_with(reserved_prefix) =>
        {
            Some(draft(EditKind::Attribute, element))
        }
        (
            MutationKind::CharacterData | MutationKind::ChildList,
            MutationTarget::Text {
                parent: Some(parent),
                ..
            },
            _,
        ) => Some(EditDraft {
            attribute_name: None,
            ..draft(EditKind::Text, parent)
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESERVED: &str = "data-visbug";

    fn attribute(name: &str, old: Option<&str>, new: Option<&str>) -> ObservedMutation {
        ObservedMutation {
            kind: MutationKind::Attributes,
            target: MutationTarget::Element(NodeKey(3)),
            attribute_name: Some(name.to_owned()),
            old_value: old.map(str::to_owned),
            new_value: new.map(str::to_owned),
        }
    }

    #[test]
    fn style_changes_keep_whole_strings() {
        let draft = classify(&attribute("style", None, Some("color: red;")), RESERVED);
        assert_eq!(
            draft,
            Some(EditDraft {
                kind: EditKind::Style,
                target: NodeKey(3),
                attribute_name: Some("style".to_owned()),
                old_value: None,
                new_value: Some("color: red;".to_owned()),
            })
        );
    }

    #[test]
    fn redundant_style_writes_are_dropped() {
        let mutation = attribute("style", Some("color: red;"), Some("color: red;"));
        assert_eq!(classify(&mutation, RESERVED), None);
    }

    #[test]
    fn reserved_attributes_are_ignored() {
        assert_eq!(
            classify(&attribute("data-visbug-selected", None, Some("")), RESERVED),
            None
        );
        let draft = classify(&attribute("data-x", Some("a"), Some("b")), RESERVED);
        assert_eq!(draft.map(|edit| edit.kind), Some(EditKind::Attribute));
    }

    #[test]
    fn same_value_attribute_writes_are_kept() {
        let draft = classify(&attribute("title", Some("a"), Some("a")), RESERVED);
        assert!(draft.is_some());
    }

    #[test]
    fn text_edits_go_to_the_parent_element() {
        let mutation = ObservedMutation {
            kind: MutationKind::CharacterData,
            target: MutationTarget::Text {
                node: NodeKey(9),
                parent: Some(NodeKey(4)),
            },
            attribute_name: None,
            old_value: Some("old".to_owned()),
            new_value: Some("new".to_owned()),
        };
        let draft = classify(&mutation, RESERVED);
        assert_eq!(draft.as_ref().map(|edit| edit.target), Some(NodeKey(4)));
        assert_eq!(draft.map(|edit| edit.kind), Some(EditKind::Text));
    }

    #[test]
    fn orphan_text_and_element_child_lists_are_ignored() {
        let orphan = ObservedMutation {
            kind: MutationKind::CharacterData,
            target: MutationTarget::Text {
                node: NodeKey(9),
                parent: None,
            },
            attribute_name: None,
            old_value: Some("x".to_owned()),
            new_value: Some("y".to_owned()),
        };
        assert_eq!(classify(&orphan, RESERVED), None);

        let child_list = ObservedMutation {
            kind: MutationKind::ChildList,
            target: MutationTarget::Element(NodeKey(2)),
            attribute_name: None,
            old_value: None,
            new_value: None,
        };
        assert_eq!(classify(&child_list, RESERVED), None);
    }
}
