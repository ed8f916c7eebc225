//! DOM Tree (arena-based allocation)
//!
//! Core node manipulation: appendChild, removeChild, insertBefore, deep
//! import across trees, text content and attribute access.

use crate::{Attribute, DomError, DomResult, ElementData, MutationRecord, Node, NodeData, NodeId};

/// Arena-based DOM tree
#[derive(Debug, Clone)]
pub struct DomTree {
    nodes: Vec<Node>,
    /// Child-list changes under the document root, oldest first
    mutations: Vec<MutationRecord>,
}

impl DomTree {
    /// Create a tree holding only the document node
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::document()],
            mutations: Vec::new(),
        }
    }

    /// The document node
    #[inline]
    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    /// Get a node by ID
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0 as usize)
    }

    /// Get a mutable node by ID
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0 as usize)
    }

    /// Number of nodes in the arena (including detached ones)
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when only the document node exists
    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    fn node(&self, id: NodeId) -> DomResult<&Node> {
        self.get(id).ok_or(DomError::NotFound(id))
    }

    fn node_mut(&mut self, id: NodeId) -> DomResult<&mut Node> {
        self.get_mut(id).ok_or(DomError::NotFound(id))
    }

    /// Push a node into the arena (detached)
    pub fn push(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    pub fn create_element(&mut self, name: &str) -> NodeId {
        self.push(Node::element(name))
    }

    pub fn create_text(&mut self, content: &str) -> NodeId {
        self.push(Node::text(content))
    }

    pub fn create_comment(&mut self, content: &str) -> NodeId {
        self.push(Node::comment(content))
    }

    pub fn create_doctype(&mut self, name: &str) -> NodeId {
        self.push(Node::doctype(name))
    }

    // === Relationships ===

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.parent.some())
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.first_child.some())
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.last_child.some())
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.next_sibling.some())
    }

    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.prev_sibling.some())
    }

    /// Iterate direct children
    pub fn children(&self, id: NodeId) -> Children<'_> {
        Children {
            tree: self,
            next: self.first_child(id).unwrap_or(NodeId::NONE),
        }
    }

    /// Iterate descendants in document order, excluding `id` itself
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        Descendants {
            tree: self,
            root: id,
            next: self.first_child(id).unwrap_or(NodeId::NONE),
        }
    }

    /// Iterate ancestors, nearest first
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |&n| self.parent(n))
    }

    /// Inclusive containment: `node` is `ancestor` or lies beneath it
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        node == ancestor || self.ancestors(node).any(|a| a == ancestor)
    }

    /// Whether the node is reachable from the document node
    pub fn is_connected(&self, id: NodeId) -> bool {
        self.get(id).is_some() && self.contains(NodeId::ROOT, id)
    }

    // === Mutation ===

    /// Append a child node, moving it from its current parent if needed
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> DomResult<NodeId> {
        self.insert_before(parent, child, None)
    }

    /// Insert `new_child` before `reference` (or at the end when `None`)
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        new_child: NodeId,
        reference: Option<NodeId>,
    ) -> DomResult<NodeId> {
        self.node(parent)?;
        self.node(new_child)?;
        if self.contains(new_child, parent) {
            return Err(DomError::HierarchyRequest);
        }
        if let Some(reference) = reference {
            if self.node(reference)?.parent != parent {
                return Err(DomError::NotAChild(reference));
            }
            if reference == new_child {
                return Ok(new_child);
            }
        }

        self.detach(new_child);

        let prev = match reference {
            Some(r) => self.nodes[r.0 as usize].prev_sibling,
            None => self.nodes[parent.0 as usize].last_child,
        };
        let next = reference.unwrap_or(NodeId::NONE);

        {
            let node = &mut self.nodes[new_child.0 as usize];
            node.parent = parent;
            node.prev_sibling = prev;
            node.next_sibling = next;
        }
        if prev.is_valid() {
            self.nodes[prev.0 as usize].next_sibling = new_child;
        } else {
            self.nodes[parent.0 as usize].first_child = new_child;
        }
        if next.is_valid() {
            self.nodes[next.0 as usize].prev_sibling = new_child;
        } else {
            self.nodes[parent.0 as usize].last_child = new_child;
        }

        if self.is_connected(parent) {
            self.mutations.push(MutationRecord::added(parent, new_child));
        }
        Ok(new_child)
    }

    /// Insert `new_child` directly after `reference`
    pub fn insert_after(&mut self, parent: NodeId, new_child: NodeId, reference: NodeId) -> DomResult<NodeId> {
        if self.node(reference)?.parent != parent {
            return Err(DomError::NotAChild(reference));
        }
        let next = self.next_sibling(reference);
        self.insert_before(parent, new_child, next)
    }

    /// Remove a child node
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> DomResult<NodeId> {
        if self.node(child)?.parent != parent {
            return Err(DomError::NotAChild(child));
        }
        self.detach(child);
        Ok(child)
    }

    /// Unlink a node from its parent; no-op for parentless nodes
    pub fn detach(&mut self, id: NodeId) {
        let Some(node) = self.get(id) else { return };
        let (parent, prev, next) = (node.parent, node.prev_sibling, node.next_sibling);
        if !parent.is_valid() {
            return;
        }
        let connected = self.is_connected(parent);

        if prev.is_valid() {
            self.nodes[prev.0 as usize].next_sibling = next;
        } else {
            self.nodes[parent.0 as usize].first_child = next;
        }
        if next.is_valid() {
            self.nodes[next.0 as usize].prev_sibling = prev;
        } else {
            self.nodes[parent.0 as usize].last_child = prev;
        }

        let node = &mut self.nodes[id.0 as usize];
        node.parent = NodeId::NONE;
        node.prev_sibling = NodeId::NONE;
        node.next_sibling = NodeId::NONE;

        if connected {
            self.mutations.push(MutationRecord::removed(parent, id));
        }
    }

    /// Remove every child of `id`
    pub fn clear_children(&mut self, id: NodeId) {
        while let Some(child) = self.first_child(id) {
            self.detach(child);
        }
    }

    /// Deep-copy `source` from another tree into this arena (detached)
    pub fn import_node(&mut self, other: &DomTree, source: NodeId) -> DomResult<NodeId> {
        let node = other.node(source)?;
        if matches!(node.data, NodeData::Document) {
            return Err(DomError::HierarchyRequest);
        }
        let copy = self.push(Node {
            parent: NodeId::NONE,
            first_child: NodeId::NONE,
            last_child: NodeId::NONE,
            prev_sibling: NodeId::NONE,
            next_sibling: NodeId::NONE,
            data: node.data.clone(),
        });
        for child in other.children(source) {
            let imported = self.import_node(other, child)?;
            self.append_child(copy, imported)?;
        }
        Ok(copy)
    }

    /// Drain queued mutation records
    pub fn take_mutations(&mut self) -> Vec<MutationRecord> {
        std::mem::take(&mut self.mutations)
    }

    /// Whether mutation records are waiting to be drained
    pub fn has_pending_mutations(&self) -> bool {
        !self.mutations.is_empty()
    }

    // === Element data ===

    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        self.get(id).and_then(Node::as_element)
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut ElementData> {
        self.get_mut(id).and_then(Node::as_element_mut)
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.element(id).is_some()
    }

    /// Lowercase tag name
    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|e| e.name.as_str())
    }

    pub fn get_attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id).and_then(|e| e.get_attr(name))
    }

    pub fn has_attribute(&self, id: NodeId, name: &str) -> bool {
        self.element(id).is_some_and(|e| e.has_attr(name))
    }

    /// All attributes (empty for non-elements)
    pub fn attributes(&self, id: NodeId) -> &[Attribute] {
        self.element(id).map(|e| e.attrs.as_slice()).unwrap_or(&[])
    }

    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) -> DomResult<()> {
        let elem = self.node_mut(id)?.as_element_mut().ok_or(DomError::NotFound(id))?;
        elem.set_attr(name, value);
        Ok(())
    }

    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> Option<String> {
        self.element_mut(id).and_then(|e| e.remove_attr(name))
    }

    /// Add a class if missing
    pub fn add_class(&mut self, id: NodeId, class: &str) -> DomResult<()> {
        let elem = self.node_mut(id)?.as_element_mut().ok_or(DomError::NotFound(id))?;
        if elem.has_class(class) {
            return Ok(());
        }
        let joined = match elem.get_attr("class") {
            Some(existing) if !existing.trim().is_empty() => format!("{} {}", existing.trim(), class),
            _ => class.to_string(),
        };
        elem.set_attr("class", &joined);
        Ok(())
    }

    /// Remove a class if present
    pub fn remove_class(&mut self, id: NodeId, class: &str) -> DomResult<()> {
        let elem = self.node_mut(id)?.as_element_mut().ok_or(DomError::NotFound(id))?;
        if !elem.has_class(class) {
            return Ok(());
        }
        let remaining: Vec<&str> = elem.classes().filter(|c| *c != class).collect();
        let joined = remaining.join(" ");
        elem.set_attr("class", &joined);
        Ok(())
    }

    // === Text ===

    /// Concatenated text of the node and its descendants
    pub fn text_content(&self, id: NodeId) -> String {
        if let Some(text) = self.get(id).and_then(Node::as_text) {
            return text.to_string();
        }
        self.descendants(id)
            .filter_map(|d| self.get(d).and_then(Node::as_text))
            .collect()
    }

    /// Replace all children with a single text node (none for empty text)
    pub fn set_text_content(&mut self, id: NodeId, text: &str) -> DomResult<()> {
        if let NodeData::Text(content) = &mut self.node_mut(id)?.data {
            *content = text.to_string();
            return Ok(());
        }
        self.clear_children(id);
        if !text.is_empty() {
            let child = self.create_text(text);
            self.append_child(id, child)?;
        }
        Ok(())
    }

    /// Short name for diagnostics, e.g. `<div#main>`
    pub fn pretty_name(&self, id: NodeId) -> String {
        match self.get(id).map(|n| &n.data) {
            Some(NodeData::Document) => "#document".to_string(),
            Some(NodeData::Element(e)) => match e.id() {
                Some(elem_id) => format!("<{}#{}>", e.name, elem_id),
                None => format!("<{}>", e.name),
            },
            Some(NodeData::Text(_)) => "#text".to_string(),
            Some(NodeData::Comment(_)) => "#comment".to_string(),
            Some(NodeData::Doctype { .. }) => "#doctype".to_string(),
            None => format!("<missing {}>", id),
        }
    }
}

impl Default for DomTree {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over direct children
pub struct Children<'a> {
    tree: &'a DomTree,
    next: NodeId,
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next.some()?;
        self.next = self.tree.next_sibling(current).unwrap_or(NodeId::NONE);
        Some(current)
    }
}

/// Pre-order iterator over a subtree
pub struct Descendants<'a> {
    tree: &'a DomTree,
    root: NodeId,
    next: NodeId,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next.some()?;

        self.next = match self.tree.first_child(current) {
            Some(child) => child,
            None => {
                let mut node = current;
                loop {
                    if node == self.root {
                        break NodeId::NONE;
                    }
                    if let Some(sibling) = self.tree.next_sibling(node) {
                        break sibling;
                    }
                    match self.tree.parent(node) {
                        Some(parent) => node = parent,
                        None => break NodeId::NONE,
                    }
                }
            }
        };
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (DomTree, NodeId, NodeId, NodeId) {
        let mut tree = DomTree::new();
        let div = tree.create_element("div");
        let a = tree.create_element("a");
        let b = tree.create_element("b");
        tree.append_child(tree.root(), div).unwrap();
        tree.append_child(div, a).unwrap();
        tree.append_child(div, b).unwrap();
        (tree, div, a, b)
    }

    #[test]
    fn test_append_and_children() {
        let (tree, div, a, b) = sample();
        assert_eq!(tree.children(div).collect::<Vec<_>>(), vec![a, b]);
        assert_eq!(tree.parent(a), Some(div));
        assert_eq!(tree.next_sibling(a), Some(b));
        assert_eq!(tree.prev_sibling(b), Some(a));
    }

    #[test]
    fn test_insert_before_and_after() {
        let (mut tree, div, a, b) = sample();
        let c = tree.create_element("c");
        tree.insert_before(div, c, Some(b)).unwrap();
        assert_eq!(tree.children(div).collect::<Vec<_>>(), vec![a, c, b]);

        let d = tree.create_element("d");
        tree.insert_after(div, d, b).unwrap();
        assert_eq!(tree.children(div).collect::<Vec<_>>(), vec![a, c, b, d]);
        assert_eq!(tree.last_child(div), Some(d));
    }

    #[test]
    fn test_insert_before_wrong_parent() {
        let (mut tree, _div, a, _b) = sample();
        let other = tree.create_element("section");
        let x = tree.create_element("x");
        assert_eq!(tree.insert_before(other, x, Some(a)), Err(DomError::NotAChild(a)));
    }

    #[test]
    fn test_hierarchy_error() {
        let (mut tree, div, a, _b) = sample();
        assert_eq!(tree.append_child(a, div), Err(DomError::HierarchyRequest));
    }

    #[test]
    fn test_move_between_parents() {
        let (mut tree, div, a, b) = sample();
        tree.append_child(b, a).unwrap();
        assert_eq!(tree.children(div).collect::<Vec<_>>(), vec![b]);
        assert_eq!(tree.parent(a), Some(b));
    }

    #[test]
    fn test_descendants_order() {
        let (mut tree, div, a, b) = sample();
        let inner = tree.create_element("i");
        tree.append_child(a, inner).unwrap();
        assert_eq!(tree.descendants(div).collect::<Vec<_>>(), vec![a, inner, b]);
        assert_eq!(tree.descendants(a).collect::<Vec<_>>(), vec![inner]);
    }

    #[test]
    fn test_contains_and_connected() {
        let (mut tree, div, a, _b) = sample();
        assert!(tree.contains(div, a));
        assert!(tree.contains(a, a));
        assert!(!tree.contains(a, div));

        tree.detach(div);
        assert!(!tree.is_connected(a));
        assert!(tree.contains(div, a));
    }

    #[test]
    fn test_mutation_records_only_when_connected() {
        let (mut tree, div, a, _b) = sample();
        tree.take_mutations();

        let loose = tree.create_element("p");
        let inner = tree.create_element("span");
        tree.append_child(loose, inner).unwrap();
        assert!(!tree.has_pending_mutations());

        tree.detach(a);
        let records = tree.take_mutations();
        assert_eq!(records, vec![MutationRecord::removed(div, a)]);
    }

    #[test]
    fn test_text_content() {
        let (mut tree, div, a, _b) = sample();
        let t = tree.create_text("hello");
        tree.append_child(a, t).unwrap();
        assert_eq!(tree.text_content(div), "hello");

        tree.set_text_content(div, "").unwrap();
        assert_eq!(tree.first_child(div), None);
        tree.set_text_content(div, "new").unwrap();
        assert_eq!(tree.text_content(div), "new");
    }

    #[test]
    fn test_import_node_deep() {
        let (mut src, div, a, _b) = sample();
        src.set_attribute(a, "href", "/x").unwrap();

        let mut dst = DomTree::new();
        let copy = dst.import_node(&src, div).unwrap();
        assert_eq!(dst.children(copy).count(), 2);
        let first = dst.first_child(copy).unwrap();
        assert_eq!(dst.get_attribute(first, "href"), Some("/x"));
        assert!(!dst.is_connected(copy));
        assert_eq!(dst.import_node(&src, src.root()), Err(DomError::HierarchyRequest));
    }

    #[test]
    fn test_class_helpers() {
        let (mut tree, div, _a, _b) = sample();
        tree.add_class(div, "one").unwrap();
        tree.add_class(div, "two").unwrap();
        tree.add_class(div, "one").unwrap();
        assert_eq!(tree.get_attribute(div, "class"), Some("one two"));
        tree.remove_class(div, "one").unwrap();
        assert_eq!(tree.get_attribute(div, "class"), Some("two"));
    }

    #[test]
    fn test_pretty_name() {
        let (mut tree, div, _a, _b) = sample();
        tree.set_attribute(div, "id", "main").unwrap();
        assert_eq!(tree.pretty_name(div), "<div#main>");
        assert_eq!(tree.pretty_name(tree.root()), "#document");
    }
}
