//! List accessor bindings: `<key>List` entries on a collection's parent.
//!
//! The upstream protocol installs a closure named `<key>List` on the node
//! that owns a collection; invoking it returns the sorted child view. Here
//! the closure becomes an explicit binding in [`Node::lists`] from accessor
//! name to the collection's handle, invoked through [`collection_list`].
//! The binding closes over the live node, not a snapshot: repeated
//! invocations observe the current cache state.

use tracing::debug;

use livegraph_tree::{Node, NodeId, Tree};

use crate::error::ViewResult;
use crate::sort::sort_collection;

/// Suffix appended to a collection's key to form its accessor name.
pub const LIST_SUFFIX: &str = "List";

/// Recursively walk `parent` and bind a `<key>List` accessor on it for
/// every directly nested child flagged as a collection.
///
/// Every nested child is walked regardless of its own flag, so collections
/// at any depth get their accessors. Re-running the walk on an already
/// annotated tree reinstalls the same bindings; the pass is idempotent.
pub fn add_lists(tree: &mut Tree, parent: NodeId) -> ViewResult<()> {
    let children: Vec<(String, NodeId)> = tree
        .node(parent)?
        .children()
        .map(|(key, id)| (key.to_string(), id))
        .collect();

    for (key, child) in children {
        if tree.node(child)?.meta.is_map {
            let accessor = format!("{key}{LIST_SUFFIX}");
            debug!(parent = %parent, %accessor, collection = %child, "bound list accessor");
            tree.node_mut(parent)?.lists.insert(accessor, child);
        }
        add_lists(tree, child)?;
    }
    Ok(())
}

/// Invoke the accessor `name` bound on `owner`, returning the sorted view
/// of the collection it closes over, or `None` when no such accessor is
/// bound.
pub fn collection_list(
    tree: &mut Tree,
    owner: NodeId,
    name: &str,
) -> ViewResult<Option<Vec<NodeId>>> {
    let Some(collection) = tree.node(owner)?.lists.get(name).copied() else {
        return Ok(None);
    };
    if !tree.contains(collection) {
        return Ok(None);
    }
    Ok(Some(sort_collection(tree, collection)?))
}

/// The accessor names bound on a node, for callers enumerating views.
pub fn bound_accessors(node: &Node) -> impl Iterator<Item = &str> {
    node.lists.keys().map(String::as_str)
}
