//! zjax DOM - Document Object Model
//!
//! Arena-allocated DOM tree used both for the live page and for parsed
//! swap responses. Nodes never move in memory; a removed node simply loses
//! its parent link and stays in the arena until the tree is dropped.

mod node;
mod tree;
mod document;
mod operations;
mod observer;
mod selector;

pub use node::{Node, NodeData, ElementData, Attribute};
pub use tree::{DomTree, Children, Descendants};
pub use document::Document;
pub use operations::{DomError, DomResult};
pub use observer::{MutationRecord, MutationType};
pub use selector::{Selector, SelectorList, Compound, Combinator, AttrMatch};

/// Node identifier (index into arena)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Root (document) node ID
    pub const ROOT: NodeId = NodeId(0);

    /// Sentinel for "no node"
    pub const NONE: NodeId = NodeId(u32::MAX);

    /// Check whether this id points at a node
    #[inline]
    pub fn is_valid(self) -> bool {
        self != Self::NONE
    }

    /// Raw arena index
    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }

    /// Id for a raw arena index, as handed out by [`NodeId::index`]
    #[inline]
    pub fn from_index(index: u32) -> NodeId {
        NodeId(index)
    }

    #[inline]
    pub(crate) fn some(self) -> Option<NodeId> {
        if self.is_valid() { Some(self) } else { None }
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}
