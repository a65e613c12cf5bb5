//! CSS selector matching engine.
//! Spec: <https://www.w3.org/TR/selectors-3/>

use crate::{
    Combinator, ComplexSelector, CompoundSelector, ElementAdapter, SelectorList, SimpleSelector,
};

/// Match a selector list against an element.
/// Spec: Section 3, 4
pub fn matches_selector_list<A: ElementAdapter>(
    adapter: &A,
    element: A::Handle,
    list: &SelectorList,
) -> bool {
    list.selectors
        .iter()
        .any(|selector_item| matches_complex(adapter, element, selector_item))
}

/// Match a complex selector against an element.
/// Spec: Section 3, 11: Right-to-left matching strategy
pub fn matches_complex<A: ElementAdapter>(
    adapter: &A,
    element: A::Handle,
    sel: &ComplexSelector,
) -> bool {
    match sel.rest.split_last() {
        None => matches_compound(adapter, element, &sel.first),
        Some(((combinator, rightmost), init)) => {
            matches_compound(adapter, element, rightmost)
                && match_leftwards(adapter, element, *combinator, &sel.first, init)
        }
    }
}

/// Match a compound selector against a single element.
/// Spec: Section 5–8
pub fn matches_compound<A: ElementAdapter>(
    adapter: &A,
    element: A::Handle,
    compound: &CompoundSelector,
) -> bool {
    compound.simples.iter().all(|simple| match simple {
        SimpleSelector::Universal => true,
        SimpleSelector::Type(type_name) => {
            type_name.is_empty() || adapter.tag_name(element) == type_name.as_str()
        }
        SimpleSelector::Class(class_name) => adapter.has_class(element, class_name.as_str()),
        SimpleSelector::IdSelector(id_value) => adapter
            .element_id(element)
            .is_some_and(|value| value == id_value.as_str()),
        SimpleSelector::AttrExists(name) => adapter.attr(element, name.as_str()).is_some(),
        SimpleSelector::AttrEquals { name, value } => adapter
            .attr(element, name.as_str())
            .is_some_and(|attr_value| attr_value == value.as_str()),
        SimpleSelector::NthOfType(position) => adapter.nth_of_type(element) == *position,
    })
}

/// Relate `right_element` (already matched) to the compound on the left of
/// `combinator`, backtracking over every candidate the combinator allows.
/// Spec: Section 11: Combinators
fn match_leftwards<A: ElementAdapter>(
    adapter: &A,
    right_element: A::Handle,
    combinator: Combinator,
    first: &CompoundSelector,
    init: &[(Combinator, CompoundSelector)],
) -> bool {
    let (left, next) = match init.split_last() {
        Some(((next_combinator, compound), remaining)) => {
            (compound, Some((*next_combinator, remaining)))
        }
        None => (first, None),
    };
    let accepts = |candidate: A::Handle| {
        matches_compound(adapter, candidate, left)
            && next.is_none_or(|(next_combinator, remaining)| {
                match_leftwards(adapter, candidate, next_combinator, first, remaining)
            })
    };
    match combinator {
        Combinator::Child => adapter.parent(right_element).is_some_and(accepts),
        Combinator::AdjacentSibling => adapter
            .previous_sibling_element(right_element)
            .is_some_and(accepts),
        Combinator::Descendant => {
            let mut current = adapter.parent(right_element);
            while let Some(ancestor) = current {
                if accepts(ancestor) {
                    return true;
                }
                current = adapter.parent(ancestor);
            }
            false
        }
        Combinator::GeneralSibling => {
            let mut current = adapter.previous_sibling_element(right_element);
            while let Some(sibling) = current {
                if accepts(sibling) {
                    return true;
                }
                current = adapter.previous_sibling_element(sibling);
            }
            false
        }
    }
}
