//! Error types for the tree arena.

use crate::node::NodeId;

/// Errors that can occur during tree operations.
#[derive(Debug, thiserror::Error)]
pub enum TreeError {
    /// A node handle does not resolve to a live arena entry.
    #[error("node not found: {0}")]
    NodeNotFound(NodeId),

    /// A JSON document used to build a tree was not an object at its root.
    #[error("state root must be an object, got {0}")]
    NonObjectRoot(&'static str),
}

/// Convenience alias for tree results.
pub type TreeResult<T> = Result<T, TreeError>;
