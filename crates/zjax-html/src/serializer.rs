//! innerHTML/outerHTML serialization
//!
//! Output is what swaps compare and what tests assert on, so it stays
//! canonical: attributes in stored order, empty values written bare.

use zjax_dom::{DomTree, Node, NodeData, NodeId};

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track", "wbr",
];

#[derive(Clone, Copy)]
enum Escape {
    Text,
    Attribute,
    Raw,
}

/// Writes nodes of one tree into a string buffer
pub struct HtmlSerializer<'a> {
    tree: &'a DomTree,
    out: String,
}

impl<'a> HtmlSerializer<'a> {
    pub fn new(tree: &'a DomTree) -> Self {
        Self { tree, out: String::new() }
    }

    /// The node itself and its subtree
    pub fn outer(mut self, node: NodeId) -> String {
        self.node(node, Escape::Text);
        self.out
    }

    /// The node's subtree, without the node
    pub fn inner(mut self, node: NodeId) -> String {
        let escape = self.content_escape(node);
        self.children(node, escape);
        self.out
    }

    fn content_escape(&self, node: NodeId) -> Escape {
        match self.tree.tag_name(node) {
            Some("script" | "style") => Escape::Raw,
            _ => Escape::Text,
        }
    }

    fn children(&mut self, parent: NodeId, escape: Escape) {
        let tree = self.tree;
        for child in tree.children(parent) {
            self.node(child, escape);
        }
    }

    fn node(&mut self, id: NodeId, escape: Escape) {
        let tree = self.tree;
        let Some(node) = tree.get(id) else {
            return;
        };
        match &node.data {
            NodeData::Document => self.children(id, Escape::Text),
            NodeData::Element(_) => self.element(id, node),
            NodeData::Text(text) => self.push(text, escape),
            NodeData::Comment(text) => {
                self.out.push_str("<!--");
                self.out.push_str(text);
                self.out.push_str("-->");
            }
            NodeData::Doctype { name } => {
                self.out.push_str("<!DOCTYPE ");
                self.out.push_str(name);
                self.out.push('>');
            }
        }
    }

    fn element(&mut self, id: NodeId, node: &'a Node) {
        let NodeData::Element(element) = &node.data else {
            return;
        };
        let tag = element.name.as_str();

        self.out.push('<');
        self.out.push_str(tag);
        for attr in &element.attrs {
            self.out.push(' ');
            self.out.push_str(&attr.name);
            if !attr.value.is_empty() {
                self.out.push_str("=\"");
                self.push(&attr.value, Escape::Attribute);
                self.out.push('"');
            }
        }
        self.out.push('>');

        if VOID_ELEMENTS.contains(&tag) {
            return;
        }
        let escape = self.content_escape(id);
        self.children(id, escape);
        self.out.push_str("</");
        self.out.push_str(tag);
        self.out.push('>');
    }

    fn push(&mut self, text: &str, escape: Escape) {
        if let Escape::Raw = escape {
            self.out.push_str(text);
            return;
        }
        for c in text.chars() {
            match (c, escape) {
                ('&', _) => self.out.push_str("&amp;"),
                ('<', _) => self.out.push_str("&lt;"),
                ('>', _) => self.out.push_str("&gt;"),
                ('"', Escape::Attribute) => self.out.push_str("&quot;"),
                _ => self.out.push(c),
            }
        }
    }
}
