//! Error types for derived views.

use livegraph_tree::TreeError;

/// Errors that can occur while computing views.
#[derive(Debug, thiserror::Error)]
pub enum ViewError {
    /// A node handle went stale during a view walk.
    #[error(transparent)]
    Tree(#[from] TreeError),
}

/// Convenience alias for view results.
pub type ViewResult<T> = Result<T, ViewError>;
