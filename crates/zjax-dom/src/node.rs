//! DOM Node
//!
//! Nodes link to their relatives by `NodeId` instead of pointers, so a
//! whole tree is one `Vec<Node>` and relationships are plain `Copy` values.

use crate::NodeId;

/// DOM Node - Core structure
#[derive(Debug, Clone)]
pub struct Node {
    /// Parent node (NONE if detached or root)
    pub parent: NodeId,
    /// First child
    pub first_child: NodeId,
    /// Last child (for O(1) append)
    pub last_child: NodeId,
    /// Previous sibling
    pub prev_sibling: NodeId,
    /// Next sibling
    pub next_sibling: NodeId,
    /// Node-specific data
    pub data: NodeData,
}

impl Node {
    fn with_data(data: NodeData) -> Self {
        Self {
            parent: NodeId::NONE,
            first_child: NodeId::NONE,
            last_child: NodeId::NONE,
            prev_sibling: NodeId::NONE,
            next_sibling: NodeId::NONE,
            data,
        }
    }

    /// Create a new element node
    pub fn element(name: &str) -> Self {
        Self::with_data(NodeData::Element(ElementData::new(name)))
    }

    /// Create a new text node
    pub fn text(content: &str) -> Self {
        Self::with_data(NodeData::Text(content.to_string()))
    }

    /// Create a new comment node
    pub fn comment(content: &str) -> Self {
        Self::with_data(NodeData::Comment(content.to_string()))
    }

    /// Create a doctype node
    pub fn doctype(name: &str) -> Self {
        Self::with_data(NodeData::Doctype { name: name.to_string() })
    }

    /// Create a document node
    pub fn document() -> Self {
        Self::with_data(NodeData::Document)
    }

    /// Check if this is an element
    #[inline]
    pub fn is_element(&self) -> bool {
        matches!(self.data, NodeData::Element(_))
    }

    /// Check if this is text
    #[inline]
    pub fn is_text(&self) -> bool {
        matches!(self.data, NodeData::Text(_))
    }

    /// Get element data if this is an element
    #[inline]
    pub fn as_element(&self) -> Option<&ElementData> {
        match &self.data {
            NodeData::Element(e) => Some(e),
            _ => None,
        }
    }

    /// Get mutable element data
    #[inline]
    pub fn as_element_mut(&mut self) -> Option<&mut ElementData> {
        match &mut self.data {
            NodeData::Element(e) => Some(e),
            _ => None,
        }
    }

    /// Get text content if this is a text node
    #[inline]
    pub fn as_text(&self) -> Option<&str> {
        match &self.data {
            NodeData::Text(t) => Some(t),
            _ => None,
        }
    }
}

/// Node-specific data
#[derive(Debug, Clone, PartialEq)]
pub enum NodeData {
    /// Document root
    Document,
    /// DOCTYPE
    Doctype { name: String },
    /// Element
    Element(ElementData),
    /// Text content
    Text(String),
    /// Comment
    Comment(String),
}

/// Element-specific data
#[derive(Debug, Clone, PartialEq)]
pub struct ElementData {
    /// Lowercase local tag name
    pub name: String,
    /// Attributes in source order
    pub attrs: Vec<Attribute>,
}

impl ElementData {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_ascii_lowercase(),
            attrs: Vec::new(),
        }
    }

    /// Get an attribute value
    pub fn get_attr(&self, name: &str) -> Option<&str> {
        self.attrs.iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Check for an attribute
    pub fn has_attr(&self, name: &str) -> bool {
        self.attrs.iter().any(|a| a.name == name)
    }

    /// Set an attribute, keeping its position if it already exists
    pub fn set_attr(&mut self, name: &str, value: &str) {
        if let Some(attr) = self.attrs.iter_mut().find(|a| a.name == name) {
            attr.value = value.to_string();
            return;
        }
        self.attrs.push(Attribute {
            name: name.to_string(),
            value: value.to_string(),
        });
    }

    /// Remove an attribute, returning its old value
    pub fn remove_attr(&mut self, name: &str) -> Option<String> {
        let pos = self.attrs.iter().position(|a| a.name == name)?;
        Some(self.attrs.remove(pos).value)
    }

    /// The `id` attribute
    pub fn id(&self) -> Option<&str> {
        self.get_attr("id")
    }

    /// Whitespace-separated classes
    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.get_attr("class").unwrap_or("").split_whitespace()
    }

    /// Check for a class
    pub fn has_class(&self, class: &str) -> bool {
        self.classes().any(|c| c == class)
    }
}

/// Attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

impl Attribute {
    pub fn new(name: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            value: value.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_attr_keeps_position() {
        let mut elem = ElementData::new("DIV");
        elem.set_attr("id", "a");
        elem.set_attr("class", "x");
        elem.set_attr("id", "b");

        assert_eq!(elem.name, "div");
        assert_eq!(elem.attrs[0], Attribute::new("id", "b"));
        assert_eq!(elem.attrs.len(), 2);
    }

    #[test]
    fn test_classes() {
        let mut elem = ElementData::new("p");
        elem.set_attr("class", "  one two  ");

        assert!(elem.has_class("two"));
        assert!(!elem.has_class("three"));
        assert_eq!(elem.remove_attr("class").as_deref(), Some("  one two  "));
        assert!(!elem.has_class("one"));
    }
}
