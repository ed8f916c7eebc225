//! Document - High-level document API

use crate::{DomTree, NodeId};

/// HTML Document
#[derive(Debug, Clone)]
pub struct Document {
    /// The DOM tree
    pub tree: DomTree,
    /// Document URL
    url: String,
}

impl Document {
    /// Create a document with an `html`/`head`/`body` skeleton
    pub fn new(url: &str) -> Self {
        let mut tree = DomTree::new();
        let html = tree.create_element("html");
        let head = tree.create_element("head");
        let body = tree.create_element("body");

        // Fresh nodes under the root, cannot fail
        let _ = tree.append_child(NodeId::ROOT, html);
        let _ = tree.append_child(html, head);
        let _ = tree.append_child(html, body);
        tree.take_mutations();

        Self {
            tree,
            url: url.to_string(),
        }
    }

    /// Create an empty document (no structure)
    pub fn empty(url: &str) -> Self {
        Self {
            tree: DomTree::new(),
            url: url.to_string(),
        }
    }

    /// Get document URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Replace document URL
    pub fn set_url(&mut self, url: &str) {
        self.url = url.to_string();
    }

    /// The `<html>` element
    pub fn document_element(&self) -> Option<NodeId> {
        self.tree
            .children(NodeId::ROOT)
            .find(|&n| self.tree.tag_name(n) == Some("html"))
    }

    /// The `<head>` element
    pub fn head(&self) -> Option<NodeId> {
        self.html_child("head")
    }

    /// The `<body>` element
    pub fn body(&self) -> Option<NodeId> {
        self.html_child("body")
    }

    fn html_child(&self, tag: &str) -> Option<NodeId> {
        let html = self.document_element()?;
        self.tree.children(html).find(|&n| self.tree.tag_name(n) == Some(tag))
    }

    /// Get document title
    pub fn title(&self) -> String {
        self.head()
            .and_then(|head| self.tree.children(head).find(|&n| self.tree.tag_name(n) == Some("title")))
            .map(|title| self.tree.text_content(title).trim().to_string())
            .unwrap_or_default()
    }

    /// Get connected element by ID
    pub fn get_element_by_id(&self, id: &str) -> Option<NodeId> {
        self.tree.find_by_id(NodeId::ROOT, id)
    }

    /// First connected element matching `selector`; invalid selectors match nothing
    pub fn query(&self, selector: &str) -> Option<NodeId> {
        match self.tree.query_selector(NodeId::ROOT, selector) {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!("{}", e);
                None
            }
        }
    }

    /// Access the DOM tree
    pub fn tree(&self) -> &DomTree {
        &self.tree
    }

    /// Access the DOM tree mutably
    pub fn tree_mut(&mut self) -> &mut DomTree {
        &mut self.tree
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new("about:blank")
    }
}
