//! HTML5 Parser implementation
//!
//! Parses with html5ever into its RcDom, then converts the result into our
//! arena DOM. Whitespace-only text nodes are dropped during conversion.

use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, NodeData as RcNodeData, RcDom};
use zjax_dom::{Document, DomTree, NodeId};

/// HTML5 parser
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlParser;

impl HtmlParser {
    /// Create a new HTML parser
    pub fn new() -> Self {
        Self
    }

    /// Parse HTML string into a Document
    pub fn parse(&self, html: &str) -> Document {
        self.parse_with_url(html, "about:blank")
    }

    /// Parse HTML with a base URL
    pub fn parse_with_url(&self, html: &str, url: &str) -> Document {
        tracing::debug!("Parsing HTML document: {}", url);

        let dom = parse_document(RcDom::default(), Default::default()).one(html);

        let mut document = Document::empty(url);
        self.convert_node(&dom.document, document.tree_mut(), NodeId::ROOT);
        // Building the tree is not a page mutation
        document.tree_mut().take_mutations();

        tracing::debug!("Parsed {} nodes", document.tree().len());
        document
    }

    /// Convert an RcDom node to our DOM format
    fn convert_node(&self, handle: &Handle, tree: &mut DomTree, parent: NodeId) {
        let id = match &handle.data {
            RcNodeData::Document => {
                for child in handle.children.borrow().iter() {
                    self.convert_node(child, tree, parent);
                }
                return;
            }
            RcNodeData::Doctype { name, .. } => tree.create_doctype(name),
            RcNodeData::Text { contents } => {
                let text = contents.borrow();
                if text.trim().is_empty() {
                    return;
                }
                tree.create_text(&text)
            }
            RcNodeData::Comment { contents } => tree.create_comment(contents),
            RcNodeData::Element { name, attrs, .. } => {
                let id = tree.create_element(&name.local);
                for attr in attrs.borrow().iter() {
                    // Fresh element, set_attribute cannot miss
                    let _ = tree.set_attribute(id, &attr.name.local, &attr.value);
                }
                id
            }
            RcNodeData::ProcessingInstruction { .. } => return,
        };

        if tree.append_child(parent, id).is_err() {
            tracing::warn!("Dropping node that could not be attached to {}", tree.pretty_name(parent));
            return;
        }

        for child in handle.children.borrow().iter() {
            self.convert_node(child, tree, id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple() {
        let html = "<html><head><title>Test</title></head><body><p>Hello</p></body></html>";
        let doc = HtmlParser::new().parse(html);

        assert_eq!(doc.title(), "Test");
        let p = doc.query("body > p").unwrap();
        assert_eq!(doc.tree().text_content(p), "Hello");
    }

    #[test]
    fn test_parse_fragment_gets_skeleton() {
        let doc = HtmlParser::new().parse(r#"<div id="x" z-active="true">new</div>"#);

        let body = doc.body().unwrap();
        let div = doc.get_element_by_id("x").unwrap();
        assert_eq!(doc.tree().parent(div), Some(body));
        assert_eq!(doc.tree().get_attribute(div, "z-active"), Some("true"));
        assert!(!doc.tree().has_pending_mutations());
    }

    #[test]
    fn test_whitespace_text_dropped() {
        let doc = HtmlParser::new().parse("<ul>\n  <li>a</li>\n  <li>b</li>\n</ul>");
        let ul = doc.query("ul").unwrap();
        assert_eq!(doc.tree().children(ul).count(), 2);
    }
}
