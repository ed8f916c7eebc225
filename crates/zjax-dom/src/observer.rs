//! DOM Mutation Records
//!
//! The tree keeps a queue of child-list mutations. A single consumer drains
//! it and fans removals out to whatever holds per-node resources, instead of
//! each resource installing its own observer.

use crate::NodeId;

/// Mutation record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    pub mutation_type: MutationType,
    /// Parent whose child list changed
    pub target: NodeId,
    pub added_nodes: Vec<NodeId>,
    pub removed_nodes: Vec<NodeId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationType {
    ChildList,
}

impl MutationRecord {
    pub fn added(target: NodeId, node: NodeId) -> Self {
        Self {
            mutation_type: MutationType::ChildList,
            target,
            added_nodes: vec![node],
            removed_nodes: Vec::new(),
        }
    }

    pub fn removed(target: NodeId, node: NodeId) -> Self {
        Self {
            mutation_type: MutationType::ChildList,
            target,
            added_nodes: Vec::new(),
            removed_nodes: vec![node],
        }
    }
}
