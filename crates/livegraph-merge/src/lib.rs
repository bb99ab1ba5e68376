//! Merge engine for LiveGraph.
//!
//! Applies a partial update ("diff") onto the live full-state tree in place:
//! null entries delete fields, object entries merge recursively into
//! existing nodes, and everything else replaces, recording a per-field
//! change history as it goes.
//!
//! # Key Operations
//!
//! - [`merge`] / [`merge_with`] — Apply a diff object to a node
//! - [`MergeOptions`] — Opt-in strict mode for structural hardening
//! - [`MergeError`] — `TypeMismatch` / `CyclicStructure` failure kinds

pub mod error;
pub mod merge;

pub use error::{MergeError, MergeResult};
pub use merge::{merge, merge_with, MergeOptions};
