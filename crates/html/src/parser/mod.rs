//! HTML5 parsing using html5ever.

use html5ever::tendril::TendrilSink;
use html5ever::{ParseOpts, parse_document};
use log::debug;
use markup5ever_rcdom::{Handle, NodeData as RcNodeData, RcDom};

use crate::dom::{Document, DomError, NodeKey};

/// Parse a full HTML document.
///
/// Doctypes, processing instructions and whitespace-only text are dropped.
/// No mutation records are produced.
///
/// # Errors
/// Returns [`DomError::Parse`] when the input cannot be read.
pub fn parse_html(html: &str) -> Result<Document, DomError> {
    let dom: RcDom = parse_document(RcDom::default(), ParseOpts::default())
        .from_utf8()
        .read_from(&mut html.as_bytes())
        .map_err(|err| DomError::Parse(err.to_string()))?;

    let mut document = Document::new();
    convert_node(&mut document, &dom.document, NodeKey::ROOT);
    debug!("parsed {} elements", document.elements().len());
    Ok(document)
}

fn convert_node(document: &mut Document, rc_node: &Handle, parent: NodeKey) {
    match &rc_node.data {
        RcNodeData::Document => {
            for child in rc_node.children.borrow().iter() {
                convert_node(document, child, parent);
            }
        }
        RcNodeData::Doctype { .. } | RcNodeData::ProcessingInstruction { .. } => {}
        RcNodeData::Text { contents } => {
            let text = contents.borrow();
            if text.trim().is_empty() {
                return;
            }
            let node = document.create_text(&text);
            document.attach(parent, node);
        }
        RcNodeData::Comment { contents } => {
            let node = document.create_comment(contents);
            document.attach(parent, node);
        }
        RcNodeData::Element { name, attrs, .. } => {
            let node = document.create_element(&name.local);
            for attr in attrs.borrow().iter() {
                document.push_parsed_attribute(node, &attr.name.local, &attr.value);
            }
            document.attach(parent, node);
            for child in rc_node.children.borrow().iter() {
                convert_node(document, child, node);
            }
        }
    }
}
