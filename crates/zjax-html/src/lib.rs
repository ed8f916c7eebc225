//! zjax HTML Parser
//!
//! HTML5 parsing built on html5ever, producing `zjax_dom` documents, plus
//! the matching innerHTML/outerHTML serializer.

mod parser;
mod serializer;

pub use parser::HtmlParser;
pub use serializer::HtmlSerializer;
pub use zjax_dom::{Document, DomTree, NodeId};

/// Parse an HTML string into a Document
pub fn parse(html: &str) -> Document {
    HtmlParser::new().parse(html)
}

/// Parse an HTML string with a document URL
pub fn parse_with_url(html: &str, url: &str) -> Document {
    HtmlParser::new().parse_with_url(html, url)
}

/// Serialize a node including itself
pub fn outer_html(tree: &DomTree, node: NodeId) -> String {
    HtmlSerializer::new(tree).outer(node)
}

/// Serialize a node's children
pub fn inner_html(tree: &DomTree, node: NodeId) -> String {
    HtmlSerializer::new(tree).inner(node)
}
