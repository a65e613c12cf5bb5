//! CSS Style Attributes: style="..." attribute processing.
//! Spec: <https://www.w3.org/TR/css-style-attr/>

#![forbid(unsafe_code)]

use std::collections::HashMap;

/// Sentinel reported for the side of a change where a property is absent.
pub const UNSET: &str = "unset";

/// A single CSS declaration parsed from a style attribute.
///
/// Spec: <https://www.w3.org/TR/css-style-attr/#interpreting>
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Declaration {
    /// Property name, ASCII-lowercased unless it is a custom property (`--*`).
    pub property: String,
    /// Raw value slice trimmed of surrounding ASCII whitespace. May contain spaces.
    pub value: String,
}

/// One property whose value differs between two style attribute strings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PropertyChange {
    pub property: String,
    /// Previous value, or [`UNSET`] when the property was absent.
    pub from: String,
    /// New value, or [`UNSET`] when the property was removed.
    pub to: String,
}

/// Parse the value of a `style` attribute into a list of declarations.
///
/// This performs a minimal, resilient parse:
/// - Splits on semicolons (`;`) into declaration items.
/// - For each item, splits on the first colon (`:`) into property and value.
/// - Trims ASCII whitespace and lowercases the property name.
/// - Skips empty or invalid items (no colon, empty property, or empty value after trimming).
///
/// Semicolons inside `url(...)` or strings are not special-cased.
///
/// Spec: <https://www.w3.org/TR/css-style-attr/#interpreting>
pub fn parse_style_attribute(input: &str) -> Vec<Declaration> {
    if input.is_empty() {
        return Vec::new();
    }
    let mut out: Vec<Declaration> = Vec::new();
    for raw_item in input.split(';') {
        let item = raw_item.trim_matches(is_ascii_whitespace);
        if item.is_empty() {
            continue;
        }
        let Some((raw_prop, raw_value)) = item.split_once(':') else {
            continue;
        };
        let property_text = raw_prop.trim_matches(is_ascii_whitespace);
        let value_text = raw_value.trim_matches(is_ascii_whitespace);
        if property_text.is_empty() || value_text.is_empty() {
            continue;
        }
        out.push(Declaration {
            property: normalize_property_name(property_text),
            value: value_text.to_owned(),
        });
    }
    out
}

/// Convenience: parse into a map keyed by property name.
///
/// If a property appears multiple times, the last one wins, matching standard
/// source-order behavior for duplicate declarations within the same block.
///
/// Spec: <https://www.w3.org/TR/css-style-attr/#interpreting>
pub fn parse_style_attribute_into_map(input: &str) -> HashMap<String, String> {
    let mut map: HashMap<String, String> = HashMap::new();
    for decl in parse_style_attribute(input) {
        map.insert(decl.property, decl.value);
    }
    map
}

/// Parse and keep only the last occurrence of each property, in source order
/// of those last occurrences.
///
/// Spec: <https://www.w3.org/TR/css-style-attr/#interpreting>
pub fn normalize_style_attribute(input: &str) -> Vec<Declaration> {
    let mut last_index_for_property: HashMap<String, usize> = HashMap::new();
    let declarations = parse_style_attribute(input);
    for (index, decl_item) in declarations.iter().enumerate() {
        last_index_for_property.insert(decl_item.property.clone(), index);
    }
    declarations
        .into_iter()
        .enumerate()
        .filter_map(
            |(index, decl_item)| match last_index_for_property.get(&decl_item.property) {
                Some(&last_index) if last_index == index => Some(decl_item),
                _ => None,
            },
        )
        .collect()
}

/// Per-property difference between two inline style strings.
///
/// `None` stands for an absent `style` attribute and behaves like an empty one.
/// Only properties whose effective value differs are returned: first those of
/// `old` in source order, then those that only exist in `new`.
pub fn diff_style_attributes(old: Option<&str>, new: Option<&str>) -> Vec<PropertyChange> {
    let old_decls = normalize_style_attribute(old.unwrap_or_default());
    let new_decls = normalize_style_attribute(new.unwrap_or_default());
    let new_values: HashMap<&str, &str> = new_decls
        .iter()
        .map(|decl| (decl.property.as_str(), decl.value.as_str()))
        .collect();
    let old_values: HashMap<&str, &str> = old_decls
        .iter()
        .map(|decl| (decl.property.as_str(), decl.value.as_str()))
        .collect();

    let mut changes: Vec<PropertyChange> = Vec::new();
    for decl in &old_decls {
        let next = new_values.get(decl.property.as_str()).copied();
        if next != Some(decl.value.as_str()) {
            changes.push(PropertyChange {
                property: decl.property.clone(),
                from: decl.value.clone(),
                to: next.unwrap_or(UNSET).to_owned(),
            });
        }
    }
    for decl in &new_decls {
        if !old_values.contains_key(decl.property.as_str()) {
            changes.push(PropertyChange {
                property: decl.property.clone(),
                from: UNSET.to_owned(),
                to: decl.value.clone(),
            });
        }
    }
    changes
}

/// ASCII whitespace per CSS Syntax (TAB, LF, FF, CR, SPACE).
///
/// Spec: <https://www.w3.org/TR/css-syntax-3/#whitespace>
const fn is_ascii_whitespace(character: char) -> bool {
    matches!(
        character,
        '\u{0009}' | '\u{000A}' | '\u{000C}' | '\u{000D}' | '\u{0020}'
    )
}

/// Lowercase a property name; custom properties are case-sensitive and kept as written.
///
/// Spec: <https://www.w3.org/TR/css-variables-1/#defining-variables>
fn normalize_property_name(text: &str) -> String {
    if text.starts_with("--") || !text.chars().any(|character| character.is_ascii_uppercase()) {
        return text.to_owned();
    }
    text.to_ascii_lowercase()
}
