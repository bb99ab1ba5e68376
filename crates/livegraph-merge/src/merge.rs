//! The recursive merge: apply a diff object onto a live node.
//!
//! For every field in the diff: a null deletes, a non-array object merges
//! into an existing child node in place, and anything else replaces the
//! field outright. Replacements over a differing prior value record a
//! [`ChangeRecord`] carrying the previous value and the merge timestamp.
//!
//! Merge cost is proportional to the diff, never to the full tree. The
//! `&mut Tree` receiver gives the exclusive, single-threaded access the
//! contract requires.

use serde_json::{Map, Value};
use tracing::{debug, trace};

use livegraph_tree::{
    json_kind, ChangeRecord, FieldValue, NodeId, Tree, MAP_FLAG, STRUCT_FLAG,
};

use crate::error::{MergeError, MergeResult};

/// Knobs for a merge pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MergeOptions {
    /// Fail fast on type mismatches and back-reference cycles instead of
    /// skipping over them. Off by default, matching the permissive upstream
    /// protocol.
    pub strict: bool,
}

/// Apply a diff to `target` with default (permissive) options.
pub fn merge(tree: &mut Tree, target: NodeId, diff: &Value) -> MergeResult<()> {
    merge_with(tree, target, diff, MergeOptions::default())
}

/// Apply a diff to `target`, mutating the tree in place.
///
/// The diff must be a JSON object. Its entries are processed independently:
///
/// - `null` deletes the field, its change record, and (for a nested node)
///   the whole subtree plus any list accessor that pointed at it.
/// - A non-array object entry whose field already holds a nested node
///   merges into that same node recursively, recomputing its
///   back-references and invalidating its cached child list first.
/// - Anything else replaces the field: nested objects are built fresh and
///   assigned (never merged), scalars and arrays are stored verbatim.
pub fn merge_with(
    tree: &mut Tree,
    target: NodeId,
    diff: &Value,
    options: MergeOptions,
) -> MergeResult<()> {
    let Value::Object(entries) = diff else {
        return Err(MergeError::NonObjectDiff(json_kind(diff)));
    };
    merge_object(tree, target, entries, options)
}

fn merge_object(
    tree: &mut Tree,
    target: NodeId,
    entries: &Map<String, Value>,
    options: MergeOptions,
) -> MergeResult<()> {
    for (key, entry) in entries {
        if entry.is_null() {
            delete_field(tree, target, key)?;
            continue;
        }

        // Boolean struct/collection markers travel the metadata channel.
        if key == STRUCT_FLAG || key == MAP_FLAG {
            if let Some(flag) = entry.as_bool() {
                let meta = &mut tree.node_mut(target)?.meta;
                if key == STRUCT_FLAG {
                    meta.is_struct = flag;
                } else {
                    meta.is_map = flag;
                }
                continue;
            }
        }

        if let Value::Object(nested) = entry {
            let existing = tree.node(target)?.data.get(key).map(FieldValue::as_child);
            match existing {
                Some(Some(child)) => {
                    merge_into_child(tree, target, child, key, nested, options)?;
                    continue;
                }
                Some(None) => {
                    // No node to merge into. The upstream protocol silently
                    // no-ops here; strict mode surfaces it.
                    if options.strict {
                        return Err(MergeError::TypeMismatch { key: key.clone() });
                    }
                    debug!(node = %target, %key, "skipping object diff over leaf field");
                    continue;
                }
                None => {}
            }
        }

        replace_field(tree, target, key, entry)?;
    }
    Ok(())
}

/// Recursive-merge branch: the field already holds a node, so the diff
/// updates it in place instead of replacing it.
fn merge_into_child(
    tree: &mut Tree,
    target: NodeId,
    child: NodeId,
    key: &str,
    nested: &Map<String, Value>,
    options: MergeOptions,
) -> MergeResult<()> {
    if options.strict && chain_reaches(tree, target, child) {
        return Err(MergeError::CyclicStructure(child));
    }

    // A struct boundary in the diff resets the chain to the merged-into
    // node; otherwise the chain continues from its collection.
    let chain = if nested.get(STRUCT_FLAG).map_or(false, truthy) {
        Some(target)
    } else {
        tree.node(target)?.meta.collection
    };

    let node = tree.node_mut(child)?;
    node.meta.collection = Some(target);
    node.meta.parent = chain;
    node.meta.key = Some(key.to_string());
    // The child's contents are about to change; any sorted view is stale.
    node.meta.cached_list = None;

    trace!(node = %target, %key, child = %child, "recursive merge");
    merge_object(tree, child, nested, options)
}

/// Replacement branch: assign the new value, recording a change when a
/// differing prior value existed.
fn replace_field(tree: &mut Tree, target: NodeId, key: &str, entry: &Value) -> MergeResult<()> {
    let previous = tree.node(target)?.data.get(key).cloned();

    let changed = match &previous {
        None => false,
        // A replaced node or any array involves a fresh reference, which
        // the upstream inequality always treats as a change.
        Some(FieldValue::Child(_)) => true,
        Some(FieldValue::Leaf(old)) => leaf_differs(old, entry),
    };

    // Snapshot the outgoing value before the old subtree is freed.
    let previous_value = match (&previous, changed) {
        (Some(FieldValue::Child(old)), true) => Some(tree.to_value(*old)?),
        (Some(FieldValue::Leaf(old)), true) => Some(old.clone()),
        _ => None,
    };

    let new_field = match entry {
        Value::Object(fields) => FieldValue::Child(tree.attach_object(target, key, fields)?),
        other => FieldValue::Leaf(other.clone()),
    };
    tree.node_mut(target)?.data.insert(key.to_string(), new_field);

    if let Some(previous) = previous_value {
        let changed_at = tree.now_ms();
        trace!(node = %target, %key, changed_at, "field changed");
        tree.node_mut(target)?
            .changes
            .insert(key.to_string(), ChangeRecord { previous, changed_at });
    }

    if let Some(FieldValue::Child(old)) = previous {
        tree.remove_subtree(old);
    }
    Ok(())
}

/// Deletion branch: a null diff entry removes the field and every piece of
/// metadata attached to it.
fn delete_field(tree: &mut Tree, target: NodeId, key: &str) -> MergeResult<()> {
    let removed_child = {
        let node = tree.node_mut(target)?;
        let removed = node.data.remove(key);
        node.changes.remove(key);
        if key == STRUCT_FLAG {
            node.meta.is_struct = false;
        } else if key == MAP_FLAG {
            node.meta.is_map = false;
        }
        if let Some(FieldValue::Child(child)) = removed {
            // Drop accessors that closed over the removed collection.
            node.lists.retain(|_, id| *id != child);
            Some(child)
        } else {
            None
        }
    };

    if let Some(child) = removed_child {
        tree.remove_subtree(child);
        debug!(node = %target, %key, "deleted nested field");
    }
    Ok(())
}

/// Upstream change detection: scalars compare by value; anything involving
/// an array compares by reference, and a diff always carries fresh
/// references.
fn leaf_differs(old: &Value, new: &Value) -> bool {
    if old.is_array() || new.is_array() {
        return true;
    }
    old != new
}

/// JavaScript-style truthiness, used for the `_isStruct` chain decision.
fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(false, |f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Walk the parent chain upward from `start`. Reaching `needle` means the
/// node about to be merged into is an ancestor of its own owner; a repeated
/// node means the chain itself loops. Either way later tree walks would
/// never terminate.
fn chain_reaches(tree: &Tree, start: NodeId, needle: NodeId) -> bool {
    let mut seen = std::collections::BTreeSet::new();
    let mut current = Some(start);
    while let Some(id) = current {
        if id == needle || !seen.insert(id) {
            return true;
        }
        current = tree.get(id).and_then(|node| node.meta.parent);
    }
    false
}
