//! High-level SDK for LiveGraph.
//!
//! Provides the single externally consumed operation, [`apply`]: merge a
//! diff into the full-state tree, then rebind the collection list
//! accessors unless the caller opts out. [`LiveState`] wraps a tree with
//! that operation for applications embedding LiveGraph.

pub mod apply;
pub mod error;
pub mod state;

pub use apply::{apply, apply_with, ApplyOptions};
pub use error::{SdkError, SdkResult};
pub use state::LiveState;

// Re-export key types
pub use livegraph_merge::{MergeError, MergeOptions};
pub use livegraph_tree::{ChangeRecord, FieldValue, MergeClock, Node, NodeId, NodeMeta, Tree};
pub use livegraph_view::{collection_list, sort_collection, ViewError};
