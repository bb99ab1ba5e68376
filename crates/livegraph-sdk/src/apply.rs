//! The public entry point: merge a diff, then rebind list accessors.

use serde_json::Value;
use tracing::debug;

use livegraph_merge::{merge_with, MergeOptions};
use livegraph_tree::Tree;
use livegraph_view::add_lists;

use crate::error::SdkResult;

/// Knobs for an [`apply_with`] call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ApplyOptions {
    /// Skip the list-accessor rebinding pass after the merge. Useful when
    /// re-applying diffs to an already annotated tree in a tight loop, or
    /// when the caller wants raw merge semantics without the collection
    /// sidecar.
    pub skip_lists: bool,
    /// Fail fast on malformed structure instead of skipping it; see
    /// [`MergeOptions::strict`].
    pub strict: bool,
}

/// Apply a diff to the tree's root with default options: merge, then walk
/// the tree and rebind every collection's `<key>List` accessor.
pub fn apply(tree: &mut Tree, diff: &Value) -> SdkResult<()> {
    apply_with(tree, diff, ApplyOptions::default())
}

/// Apply a diff to the tree's root with explicit options.
pub fn apply_with(tree: &mut Tree, diff: &Value, options: ApplyOptions) -> SdkResult<()> {
    let root = tree.root();
    merge_with(
        tree,
        root,
        diff,
        MergeOptions {
            strict: options.strict,
        },
    )?;
    if !options.skip_lists {
        add_lists(tree, root)?;
    }
    debug!(nodes = tree.len(), skip_lists = options.skip_lists, "diff applied");
    Ok(())
}
