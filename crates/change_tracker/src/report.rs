//! Change reports built from the committed part of the ledger.

use core::fmt::Write as _;
use std::collections::HashMap;

use chrono::{DateTime, SecondsFormat, Utc};
use css_style_attr::{UNSET, diff_style_attributes};
use html::{Document, NodeKey};
use log::error;
use serde::Serialize;

use crate::identity::ElementIdentity;
use crate::record::{EditKind, EditRecord};
use crate::viewport::ViewportInfo;

/// Version of the report envelope.
pub const REPORT_VERSION: &str = "1.0";

/// Markdown returned when nothing has been committed.
pub const EMPTY_REPORT: &str =
    "# No Changes Tracked\n\nSelect elements and make changes to track them.";

/// Longest text value printed in Markdown before it is cut.
const TEXT_PREVIEW_CHARS: usize = 100;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeSet {
    pub version: String,
    /// RFC 3339, UTC, millisecond precision.
    pub timestamp: String,
    pub viewport: ViewportInfo,
    pub elements: Vec<ElementChanges>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementChanges {
    #[serde(skip)]
    pub element: NodeKey,
    pub identifier: ElementIdentity,
    pub changes: ChangeGroups,
    /// Live inline style at report time.
    pub final_style: Option<String>,
    /// Live `outerHTML` at report time.
    #[serde(rename = "finalHTML")]
    pub final_html: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ChangeGroups {
    pub styles: Vec<StyleChange>,
    pub text: Vec<TextChange>,
    pub attributes: Vec<AttributeChange>,
}

/// One property that differs between the old and new inline style of a record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StyleChange {
    pub property: String,
    pub from: String,
    pub to: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TextChange {
    pub from: Option<String>,
    pub to: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AttributeChange {
    pub attribute: String,
    pub from: Option<String>,
    pub to: Option<String>,
}

/// Fold `records` into per-element groups, in order of each element's first record.
///
/// `identify` supplies the identity of each element (cached or computed live).
pub fn build_change_set<'rec>(
    document: &Document,
    records: impl IntoIterator<Item = &'rec EditRecord>,
    mut identify: impl FnMut(NodeKey) -> ElementIdentity,
    generated_at: DateTime<Utc>,
) -> ChangeSet {
    let mut order: Vec<NodeKey> = Vec::new();
    let mut groups: HashMap<NodeKey, ChangeGroups> = HashMap::new();
    for record in records {
        let group = groups.entry(record.target).or_insert_with(|| {
            order.push(record.target);
            ChangeGroups::default()
        });
        match record.kind {
            EditKind::Style => group.styles.extend(
                diff_style_attributes(record.old_value.as_deref(), record.new_value.as_deref())
                    .into_iter()
                    .map(|change| StyleChange {
                        property: change.property,
                        from: change.from,
                        to: change.to,
                    }),
            ),
            EditKind::Text => group.text.push(TextChange {
                from: record.old_value.clone(),
                to: record.new_value.clone(),
            }),
            EditKind::Attribute => group.attributes.push(AttributeChange {
                attribute: record.attribute_name.clone().unwrap_or_default(),
                from: record.old_value.clone(),
                to: record.new_value.clone(),
            }),
        }
    }

    let elements = order
        .into_iter()
        .map(|element| ElementChanges {
            element,
            identifier: identify(element),
            changes: groups.remove(&element).unwrap_or_default(),
            final_style: document.get_attribute(element, "style").map(ToOwned::to_owned),
            final_html: document.outer_html(element).unwrap_or_default(),
        })
        .collect();

    ChangeSet {
        version: REPORT_VERSION.to_owned(),
        timestamp: generated_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        viewport: ViewportInfo::from(document.viewport()),
        elements,
    }
}

/// The change set as pretty-printed JSON (two-space indentation).
#[must_use]
pub fn render_json(changes: &ChangeSet) -> String {
    serde_json::to_string_pretty(changes).unwrap_or_else(|err| {
        error!("failed to serialize change report: {err}");
        "{}".to_owned()
    })
}

fn preview(text: Option<&str>) -> String {
    let text = text.unwrap_or_default();
    if text.chars().count() <= TEXT_PREVIEW_CHARS {
        return text.to_owned();
    }
    let mut out: String = text.chars().take(TEXT_PREVIEW_CHARS).collect();
    out.push_str("...");
    out
}

fn or_unset(value: Option<&str>) -> &str {
    value.filter(|val| !val.is_empty()).unwrap_or(UNSET)
}

/// The change set as Markdown meant to be pasted into a coding assistant.
#[must_use]
pub fn render_markdown(changes: &ChangeSet) -> String {
    if changes.elements.is_empty() {
        return EMPTY_REPORT.to_owned();
    }
    let mut out = String::new();
    if let Err(err) = write_markdown(changes, &mut out) {
        error!("failed to render change report: {err}");
    }
    out
}

fn write_markdown(changes: &ChangeSet, out: &mut String) -> core::fmt::Result {
    writeln!(out, "# VisBug Visual Changes\n")?;
    writeln!(
        out,
        "**Viewport:** {}x{} ({})",
        changes.viewport.width, changes.viewport.height, changes.viewport.breakpoint
    )?;
    writeln!(out, "**Generated:** {}\n", changes.timestamp)?;
    writeln!(out, "---\n")?;

    for (index, element) in changes.elements.iter().enumerate() {
        let id = &element.identifier;
        writeln!(out, "## Element {}: `{}`\n", index + 1, id.label)?;
        writeln!(out, "### Location\n")?;
        if let Some(source) = &id.source {
            if let Some(path) = &source.file_path {
                writeln!(
                    out,
                    "**React Component:** `{}`",
                    source.component_name.as_deref().unwrap_or("Unknown")
                )?;
                match source.line_number {
                    Some(line) => writeln!(out, "**File:** `{path}:{line}`")?,
                    None => writeln!(out, "**File:** `{path}`")?,
                }
            }
        }
        writeln!(out, "**CSS Selector:** `{}`", id.css_selector)?;
        writeln!(out, "**XPath:** `{}`\n", id.xpath)?;

        let groups = &element.changes;
        if !groups.styles.is_empty() {
            writeln!(out, "### Style Changes\n")?;
            writeln!(out, "| Property | From | To |")?;
            writeln!(out, "|----------|------|----|")?;
            for change in &groups.styles {
                writeln!(
                    out,
                    "| `{}` | `{}` | `{}` |",
                    change.property, change.from, change.to
                )?;
            }
            writeln!(out)?;
        }

        if !groups.text.is_empty() {
            writeln!(out, "### Text Changes\n")?;
            for change in &groups.text {
                writeln!(out, "- From: \"{}\"", preview(change.from.as_deref()))?;
                writeln!(out, "- To: \"{}\"\n", preview(change.to.as_deref()))?;
            }
        }

        if !groups.attributes.is_empty() {
            writeln!(out, "### Attribute Changes\n")?;
            for change in &groups.attributes {
                writeln!(
                    out,
                    "- `{}`: `{}` → `{}`",
                    change.attribute,
                    or_unset(change.from.as_deref()),
                    or_unset(change.to.as_deref())
                )?;
            }
            writeln!(out)?;
        }

        if let Some(style) = element.final_style.as_deref().filter(|style| !style.is_empty()) {
            writeln!(out, "### Final Inline Style\n")?;
            writeln!(out, "```css\n{style}\n```\n")?;
        }

        writeln!(out, "### Final HTML\n")?;
        writeln!(out, "```html\n{}\n```\n", element.final_html)?;
        writeln!(out, "---\n")?;
    }

    writeln!(
        out,
        "*Copy this to your AI coding assistant to apply these visual changes to your codebase.*"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::IdentityResolver;
    use chrono::TimeZone as _;
    use html::{Viewport, parse_html};

    fn record(kind: EditKind, target: NodeKey, name: Option<&str>, old: Option<&str>, new: Option<&str>) -> EditRecord {
        EditRecord {
            kind,
            target,
            attribute_name: name.map(str::to_owned),
            old_value: old.map(str::to_owned),
            new_value: new.map(str::to_owned),
            timestamp: 0,
            viewport: ViewportInfo::from(Viewport::default()),
        }
    }

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5)
            .single()
            .unwrap_or_default()
    }

    fn fixture() -> (Document, NodeKey, NodeKey) {
        let doc = parse_html(
            r#"<html><body><div id="a" style="width: 10px; height: 7px">x</div><p class="lead">hello</p></body></html>"#,
        )
        .unwrap_or_default();
        let div = doc.query_selector("#a").ok().flatten().unwrap_or(NodeKey::ROOT);
        let para = doc.query_selector("p").ok().flatten().unwrap_or(NodeKey::ROOT);
        (doc, div, para)
    }

    #[test]
    fn groups_by_first_seen_element() {
        let (doc, div, para) = fixture();
        let records = [
            record(EditKind::Text, para, None, Some("hi"), Some("hello")),
            record(EditKind::Style, div, Some("style"), Some("width: 10px;"), Some("width: 10px; height: 5px;")),
            record(EditKind::Attribute, para, Some("title"), None, Some("t")),
        ];
        let resolver = IdentityResolver::new("visbug");
        let set = build_change_set(
            &doc,
            &records,
            |element| resolver.resolve_or_unknown(&doc, element, None),
            fixed_time(),
        );
        assert_eq!(set.version, "1.0");
        assert_eq!(set.timestamp, "2025-01-02T03:04:05.000Z");
        let labels: Vec<&str> = set.elements.iter().map(|el| el.identifier.label.as_str()).collect();
        assert_eq!(labels, vec!["p.lead", "div#a"]);
        assert_eq!(set.elements[0].changes.text.len(), 1);
        assert_eq!(set.elements[0].changes.attributes.len(), 1);
        assert_eq!(
            set.elements[1].changes.styles,
            vec![StyleChange {
                property: "height".into(),
                from: UNSET.into(),
                to: "5px".into()
            }]
        );
        assert_eq!(set.elements[1].final_style.as_deref(), Some("width: 10px; height: 7px"));
    }

    #[test]
    fn json_uses_camel_case_and_two_space_indent() {
        let (doc, div, _) = fixture();
        let records = [record(EditKind::Attribute, div, Some("title"), None, Some("t"))];
        let resolver = IdentityResolver::new("visbug");
        let set = build_change_set(
            &doc,
            &records,
            |element| resolver.resolve_or_unknown(&doc, element, None),
            fixed_time(),
        );
        let json = render_json(&set);
        assert!(json.starts_with("{\n  \"version\": \"1.0\""));
        assert!(json.contains("\"finalHTML\""));
        assert!(json.contains("\"cssSelector\": \"#a\""));
        assert!(json.contains("\"devicePixelRatio\""));
    }

    #[test]
    fn markdown_sections() {
        let (doc, div, para) = fixture();
        let long = "y".repeat(120);
        let records = [
            record(EditKind::Style, div, Some("style"), None, Some("color: red")),
            record(EditKind::Text, para, None, Some(&long), Some("short")),
            record(EditKind::Attribute, para, Some("title"), None, Some("t")),
        ];
        let resolver = IdentityResolver::new("visbug");
        let set = build_change_set(
            &doc,
            &records,
            |element| resolver.resolve_or_unknown(&doc, element, None),
            fixed_time(),
        );
        let text = render_markdown(&set);
        assert!(text.starts_with("# VisBug Visual Changes\n\n**Viewport:** 1280x800 (desktop)\n"));
        assert!(text.contains("## Element 1: `div#a`"));
        assert!(text.contains("| `color` | `unset` | `red` |"));
        assert!(text.contains(&format!("- From: \"{}...\"", "y".repeat(100))));
        assert!(text.contains("- `title`: `unset` → `t`"));
        assert!(text.contains("```css\nwidth: 10px; height: 7px\n```"));
        assert!(text.contains("**XPath:** `/html/body/div`"));
        assert!(text.ends_with("to your codebase.*\n"));
    }

    #[test]
    fn empty_report_placeholder() {
        let (doc, ..) = fixture();
        let resolver = IdentityResolver::new("visbug");
        let set = build_change_set(
            &doc,
            core::iter::empty::<&EditRecord>(),
            |element| resolver.resolve_or_unknown(&doc, element, None),
            fixed_time(),
        );
        assert!(set.elements.is_empty());
        assert_eq!(render_markdown(&set), EMPTY_REPORT);
    }
}
