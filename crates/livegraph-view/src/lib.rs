//! Derived views for LiveGraph.
//!
//! Collection nodes (those flagged `_isMap`) expose an ordered view of
//! their children, sorted by an explicit `order` field with a `name`
//! tie-break. The view is cached on the node and recomputed lazily after
//! the merge invalidates it.
//!
//! # Key Operations
//!
//! - [`sort_collection`] — Compute (or return the cached) sorted child list
//! - [`add_lists`] — Walk the tree and bind `<key>List` accessors
//! - [`collection_list`] — Invoke a bound accessor by name

pub mod error;
pub mod lists;
pub mod sort;

pub use error::{ViewError, ViewResult};
pub use lists::{add_lists, bound_accessors, collection_list, LIST_SUFFIX};
pub use sort::{sort_collection, NAME_FIELD, ORDER_FIELD};
