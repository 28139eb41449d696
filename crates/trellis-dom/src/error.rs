//! DOM operation errors

use crate::NodeId;

/// Result type for DOM operations
pub type DomResult<T> = Result<T, DomError>;

/// DOM operation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomError {
    /// ID does not address a node of this tree
    #[error("node {0:?} not found")]
    NotFound(NodeId),

    /// Insertion would break the tree shape
    #[error("hierarchy request error: {0}")]
    HierarchyRequest(&'static str),

    /// Reference node is not a child of the given parent
    #[error("node {child:?} is not a child of {parent:?}")]
    NotAChild { parent: NodeId, child: NodeId },
}
