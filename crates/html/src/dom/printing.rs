//! HTML serialization.
//! Spec: <https://html.spec.whatwg.org/multipage/parsing.html#serialising-html-fragments>

use core::fmt;

use super::{Document, NodeKey, NodeKind};

/// Elements serialized without an end tag or children.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Elements whose text children are written verbatim.
const RAW_TEXT_ELEMENTS: &[&str] = &[
    "style", "script", "xmp", "iframe", "noembed", "noframes", "plaintext",
];

fn escape_text(text: &str, out: &mut String) {
    for character in text.chars() {
        match character {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            other => out.push(other),
        }
    }
}

fn escape_attribute(value: &str, out: &mut String) {
    for character in value.chars() {
        match character {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            other => out.push(other),
        }
    }
}

impl Document {
    /// Markup of `key` including its own tags. `None` for unknown keys.
    #[must_use]
    pub fn outer_html(&self, key: NodeKey) -> Option<String> {
        self.node(key)?;
        let mut out = String::new();
        self.serialize_node(key, false, &mut out);
        Some(out)
    }

    /// Markup of the children of `key`.
    #[must_use]
    pub fn inner_html(&self, key: NodeKey) -> Option<String> {
        self.node(key)?;
        let mut out = String::new();
        self.serialize_children(key, &mut out);
        Some(out)
    }

    fn serialize_children(&self, key: NodeKey, out: &mut String) {
        let raw = self
            .tag_name(key)
            .is_some_and(|tag| RAW_TEXT_ELEMENTS.contains(&tag));
        for child in self.children(key) {
            self.serialize_node(*child, raw, out);
        }
    }

    fn serialize_node(&self, key: NodeKey, raw_text: bool, out: &mut String) {
        let Some(node) = self.node(key) else {
            return;
        };
        match &node.kind {
            NodeKind::Document => self.serialize_children(key, out),
            NodeKind::Text(text) if raw_text => out.push_str(text),
            NodeKind::Text(text) => escape_text(text, out),
            NodeKind::Comment(text) => {
                out.push_str("<!--");
                out.push_str(text);
                out.push_str("-->");
            }
            NodeKind::Element(data) => {
                out.push('<');
                out.push_str(&data.tag);
                for (name, value) in &data.attrs {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    escape_attribute(value, out);
                    out.push('"');
                }
                out.push('>');
                if VOID_ELEMENTS.contains(&data.tag.as_str()) {
                    return;
                }
                self.serialize_children(key, out);
                out.push_str("</");
                out.push_str(&data.tag);
                out.push('>');
            }
        }
    }
}

/// Serializes the whole document.
impl fmt::Display for Document {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        self.serialize_children(NodeKey::ROOT, &mut out);
        formatter.write_str(&out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_text_and_attributes() {
        let mut doc = Document::new();
        let div = doc.create_element("div");
        let text = doc.create_text("a < b & c");
        doc.attach(NodeKey::ROOT, div);
        doc.attach(div, text);
        doc.push_parsed_attribute(div, "title", "say \"hi\"");
        assert_eq!(
            doc.outer_html(div).as_deref(),
            Some("<div title=\"say &quot;hi&quot;\">a &lt; b &amp; c</div>")
        );
        assert_eq!(doc.inner_html(div).as_deref(), Some("a &lt; b &amp; c"));
    }

    #[test]
    fn void_and_raw_text_elements() {
        let mut doc = Document::new();
        let body = doc.create_element("body");
        let br = doc.create_element("br");
        let style = doc.create_element("style");
        let css = doc.create_text("a > b {}");
        doc.attach(NodeKey::ROOT, body);
        doc.attach(body, br);
        doc.attach(body, style);
        doc.attach(style, css);
        assert_eq!(doc.to_string(), "<body><br><style>a > b {}</style></body>");
    }
}
