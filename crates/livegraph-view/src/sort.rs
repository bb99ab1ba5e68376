//! Sorted-children views over collection nodes.

use std::cmp::Ordering;

use serde_json::Value;
use tracing::trace;

use livegraph_tree::{FieldValue, NodeId, Tree};

use crate::error::ViewResult;

/// Field carrying a child's explicit sort position.
pub const ORDER_FIELD: &str = "order";

/// Field used as the tie-break within equal orders.
pub const NAME_FIELD: &str = "name";

/// Return the ordered view of `parent`'s nested children.
///
/// A cached view is returned verbatim; the merge invalidates it whenever it
/// recurses into `parent`, so a cache hit is always current. On a miss the
/// children (nested, non-reserved fields, gathered in ascending key order)
/// are sorted by ascending numeric `order`, then ascending `name` when both
/// names are strings; every other pairing compares equal, so the stable
/// sort leaves fully tied children in attachment-key order.
///
/// A child with no `order` field gets `order: 0` written onto it, a
/// mutating side effect the upstream protocol relies on.
pub fn sort_collection(tree: &mut Tree, parent: NodeId) -> ViewResult<Vec<NodeId>> {
    if let Some(cached) = tree.node(parent)?.meta.cached_list.clone() {
        return Ok(cached);
    }

    let children: Vec<NodeId> = tree.node(parent)?.children().map(|(_, id)| id).collect();

    let mut keyed: Vec<(NodeId, f64, Option<String>)> = Vec::with_capacity(children.len());
    for id in children {
        let node = tree.node_mut(id)?;
        let order = match node.data.get(ORDER_FIELD) {
            Some(field) => field
                .as_leaf()
                .and_then(Value::as_f64)
                .unwrap_or(0.0),
            None => {
                node.data
                    .insert(ORDER_FIELD.to_string(), FieldValue::Leaf(Value::from(0)));
                0.0
            }
        };
        let name = node
            .data
            .get(NAME_FIELD)
            .and_then(FieldValue::as_leaf)
            .and_then(Value::as_str)
            .map(str::to_string);
        keyed.push((id, order, name));
    }

    keyed.sort_by(|x, y| compare_children(x, y));
    let list: Vec<NodeId> = keyed.into_iter().map(|(id, _, _)| id).collect();

    trace!(parent = %parent, len = list.len(), "sorted collection view computed");
    tree.node_mut(parent)?.meta.cached_list = Some(list.clone());
    Ok(list)
}

fn compare_children(
    (_, x_order, x_name): &(NodeId, f64, Option<String>),
    (_, y_order, y_name): &(NodeId, f64, Option<String>),
) -> Ordering {
    match x_order.partial_cmp(y_order) {
        Some(Ordering::Equal) | None => {}
        Some(ordering) => return ordering,
    }
    match (x_name, y_name) {
        (Some(x), Some(y)) => x.cmp(y),
        // Absent or non-string names never order a pair, mirroring the
        // upstream three-way comparator.
        _ => Ordering::Equal,
    }
}
