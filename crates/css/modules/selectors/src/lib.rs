//! Selectors Level 3: Element matching for uniqueness checks.
//! Spec: <https://www.w3.org/TR/selectors-3/>
//!
//! This module implements the subset needed to re-query selectors that were
//! generated for an element:
//! - Type, universal, class, id and attribute (presence / equals) selectors
//! - The `:nth-of-type(n)` structural pseudo-class with an integer argument
//! - Combinators: descendant, child, adjacent sibling, general sibling
//! - CSS escapes in identifiers and quoted strings
//!
//! Anything outside that subset is a parse error rather than a silent no-match.

#![forbid(unsafe_code)]

mod error;
mod escape;
mod matcher;
mod parser;

pub use error::SelectorError;
pub use escape::escape_identifier;
pub use matcher::{matches_complex, matches_compound, matches_selector_list};
pub use parser::{parse_complex_selector, parse_selector_list};

/// An adapter that abstracts DOM access for selector matching.
/// Implement this for your DOM layer.
///
/// Spec references:
/// - Section 3: Selectors overview and element matching
pub trait ElementAdapter {
    type Handle: Copy + Eq;

    /// Parent element if any.
    /// Spec: Section 11: Combinators (for tree relationships)
    fn parent(&self, element: Self::Handle) -> Option<Self::Handle>;

    /// Previous sibling element (skip non-elements if your DOM has mixed nodes).
    /// Spec: Section 11: Sibling combinators
    fn previous_sibling_element(&self, element: Self::Handle) -> Option<Self::Handle>;

    /// Tag name in ASCII lowercase (per HTML parsing conventions).
    /// Spec: Section 5: Type selectors
    fn tag_name(&self, element: Self::Handle) -> &str;

    /// Returns Some(id) if the element has an id attribute, else None.
    /// Spec: Section 7: ID selectors
    fn element_id(&self, element: Self::Handle) -> Option<&str>;

    /// True if the element has the given class token (case-sensitive).
    /// Spec: Section 6: Class selectors
    fn has_class(&self, element: Self::Handle, class: &str) -> bool;

    /// Returns the attribute value if present.
    /// Spec: Section 8: Attribute selectors
    fn attr(&self, element: Self::Handle, name: &str) -> Option<&str>;

    /// 1-based position among element siblings sharing the same tag name.
    /// Spec: Section 6.6.5.5: `:nth-of-type()` pseudo-class
    fn nth_of_type(&self, element: Self::Handle) -> usize {
        let tag = self.tag_name(element);
        let mut position = 1usize;
        let mut current = self.previous_sibling_element(element);
        while let Some(sibling) = current {
            if self.tag_name(sibling) == tag {
                position = position.saturating_add(1);
            }
            current = self.previous_sibling_element(sibling);
        }
        position
    }
}

/// Simple selectors (subset).
/// Spec: Section 5, 6, 7, 8
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SimpleSelector {
    /// Spec: Section 5: Type selectors
    Type(String),
    /// Spec: Section 6: Class selectors
    Class(String),
    /// Spec: Section 7: ID selectors
    IdSelector(String),
    /// Spec: Section 8: Attribute selectors `[attr]`
    AttrExists(String),
    /// Spec: Section 8: Attribute selectors `[attr=value]`
    AttrEquals { name: String, value: String },
    /// Spec: Section 6.6.5.5: `:nth-of-type(n)` with a plain positive integer
    NthOfType(usize),
    /// Universal selector '*'.
    /// Spec: Section 5: Universal selector
    Universal,
}

/// A compound selector is a sequence of simple selectors (no combinators).
/// Spec: Section 5: Simple selector sequences
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct CompoundSelector {
    pub simples: Vec<SimpleSelector>,
}

/// Combinators between compounds.
/// Spec: Section 11: Combinators
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Combinator {
    Descendant,
    Child,
    AdjacentSibling,
    GeneralSibling,
}

/// A complex selector is one or more compounds separated by combinators.
/// `rest` holds each combinator together with the compound to its right.
/// Spec: Section 3, 11
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct ComplexSelector {
    pub first: CompoundSelector,
    pub rest: Vec<(Combinator, CompoundSelector)>,
}

/// A selector list separated by commas.
/// Spec: Section 4: Groups of selectors
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct SelectorList {
    pub selectors: Vec<ComplexSelector>,
}
