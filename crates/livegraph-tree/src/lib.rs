//! Foundation types for LiveGraph.
//!
//! This crate provides the node arena and structural types used throughout
//! the LiveGraph state-synchronization library. Every other LiveGraph crate
//! depends on `livegraph-tree`.
//!
//! # Key Types
//!
//! - [`Tree`] — Arena holding the full client-side state graph
//! - [`NodeId`] — Copyable, non-owning handle into the arena
//! - [`Node`] / [`NodeMeta`] — A state node: domain data plus attachment metadata
//! - [`FieldValue`] — Closed variant for a field: opaque leaf or nested node
//! - [`ChangeRecord`] — Previous value and timestamp of a field's last transition
//! - [`MergeClock`] — Non-decreasing wall-clock millisecond source

pub mod error;
pub mod node;
pub mod temporal;
pub mod tree;

pub use error::{TreeError, TreeResult};
pub use node::{
    is_reserved_key, ChangeRecord, FieldValue, Node, NodeId, NodeMeta, MAP_FLAG, STRUCT_FLAG,
};
pub use temporal::MergeClock;
pub use tree::{json_kind, Tree};
