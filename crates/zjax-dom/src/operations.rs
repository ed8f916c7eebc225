//! DOM Node Operations
//!
//! Error type shared by tree mutation and selector queries.

use crate::NodeId;

/// Result type for DOM operations
pub type DomResult<T> = Result<T, DomError>;

/// DOM operation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomError {
    /// Node id does not exist in this tree
    #[error("Node not found: {0}")]
    NotFound(NodeId),

    /// Inserting a node into itself or one of its descendants
    #[error("Hierarchy request error")]
    HierarchyRequest,

    /// Reference node is not a child of the given parent
    #[error("Node {0} is not a child")]
    NotAChild(NodeId),

    /// Selector could not be parsed
    #[error("'{selector}' is not a valid selector: {message}")]
    InvalidSelector { selector: String, message: String },
}
