use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("merge error: {0}")]
    Merge(#[from] livegraph_merge::MergeError),

    #[error("view error: {0}")]
    View(#[from] livegraph_view::ViewError),

    #[error("tree error: {0}")]
    Tree(#[from] livegraph_tree::TreeError),
}

pub type SdkResult<T> = Result<T, SdkError>;
