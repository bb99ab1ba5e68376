//! Error types for the merge engine.

use livegraph_tree::{NodeId, TreeError};

/// Errors that can occur while applying a diff.
///
/// `TypeMismatch` and `CyclicStructure` only surface in strict mode; the
/// default permissive mode mirrors the upstream protocol and skips over
/// malformed entries.
#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    /// The diff root (or a recursed-into diff entry) was not an object.
    #[error("diff must be an object, got {0}")]
    NonObjectDiff(&'static str),

    /// The diff provides an object for a field whose existing value is a
    /// leaf, so there is no node to merge into.
    #[error("type mismatch at field {key:?}: diff provides an object but the existing value is a leaf")]
    TypeMismatch {
        /// The offending field name.
        key: String,
    },

    /// The back-reference chain revisits a node, which would make later
    /// tree walks loop forever.
    #[error("cyclic structure detected through node {0}")]
    CyclicStructure(NodeId),

    /// A node handle went stale mid-merge.
    #[error(transparent)]
    Tree(#[from] TreeError),
}

/// Convenience alias for merge results.
pub type MergeResult<T> = Result<T, MergeError>;
