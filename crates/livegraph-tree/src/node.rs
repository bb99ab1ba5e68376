//! Node structure: domain data, attachment metadata, and change records.
//!
//! The upstream protocol carries bookkeeping inside the same JSON object as
//! domain data, under underscore-prefixed keys. Here the two channels are
//! separated: domain fields live in [`Node::data`], attachment bookkeeping in
//! [`NodeMeta`], and per-field change history in [`Node::changes`]. The
//! underscore prefix is still honored as the reserved namespace on input.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Reserved key marking a node as a struct (fixed-shape record) boundary.
pub const STRUCT_FLAG: &str = "_isStruct";

/// Reserved key marking a node as a collection container of sortable items.
pub const MAP_FLAG: &str = "_isMap";

/// Returns `true` for keys in the reserved metadata namespace.
///
/// Reserved keys never participate in child collection or list walks.
pub fn is_reserved_key(key: &str) -> bool {
    key.starts_with('_')
}

/// Handle to a node in a [`Tree`](crate::Tree) arena.
///
/// Handles are non-owning: back-references (`parent`, `collection`) and
/// cached lists hold `NodeId`s, so the ownership tree stays acyclic and
/// tears down structurally.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(u64);

impl NodeId {
    pub(crate) const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw arena index.
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A single field value on a node.
///
/// Scalars and arrays are opaque leaves; arrays are never recursed into by
/// the merge. Nested objects are separate arena nodes referenced by handle.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    /// Scalar or array, stored verbatim.
    Leaf(Value),
    /// Nested object node.
    Child(NodeId),
}

impl FieldValue {
    /// Returns the child handle if this field holds a nested node.
    pub fn as_child(&self) -> Option<NodeId> {
        match self {
            Self::Child(id) => Some(*id),
            Self::Leaf(_) => None,
        }
    }

    /// Returns the leaf value if this field holds one.
    pub fn as_leaf(&self) -> Option<&Value> {
        match self {
            Self::Leaf(v) => Some(v),
            Self::Child(_) => None,
        }
    }

    /// Returns `true` if this field holds a nested node.
    pub fn is_child(&self) -> bool {
        matches!(self, Self::Child(_))
    }
}

/// The most recent transition recorded for a field.
///
/// Exists iff the field has been overwritten at least once with a differing
/// non-null value; only the latest transition is kept, not a history chain.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChangeRecord {
    /// The value the field held before the transition, materialized to JSON.
    pub previous: Value,
    /// Wall-clock milliseconds at the moment of the merge.
    pub changed_at: u64,
}

/// Attachment metadata for a node.
///
/// `parent`, `collection`, and `key` are recomputed on every merge that
/// touches the node, and set when a fresh subtree is attached.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeMeta {
    /// The logical parent: the nearest collection ancestor, or the owning
    /// node itself when that node marks a struct boundary.
    pub parent: Option<NodeId>,
    /// The node this one is directly attached under.
    pub collection: Option<NodeId>,
    /// The field name this node is attached under.
    pub key: Option<String>,
    /// Struct marker: resets the collection chain for descendants.
    pub is_struct: bool,
    /// Collection marker: children are sortable sibling items.
    pub is_map: bool,
    /// Cached sorted-children view (invalidated on every merge into this node).
    pub cached_list: Option<Vec<NodeId>>,
}

/// A state node: domain data plus the separated metadata channels.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Domain fields, keyed by name.
    pub data: BTreeMap<String, FieldValue>,
    /// Attachment metadata.
    pub meta: NodeMeta,
    /// Per-field change records, keyed by field name.
    pub changes: BTreeMap<String, ChangeRecord>,
    /// Installed list accessors: accessor name (`"<key>List"`) to the
    /// collection node it closes over.
    pub lists: BTreeMap<String, NodeId>,
}

impl Node {
    /// Create an empty, detached node.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a nested child by field name.
    pub fn child(&self, key: &str) -> Option<NodeId> {
        self.data.get(key).and_then(FieldValue::as_child)
    }

    /// Iterate the node's nested children outside the reserved namespace,
    /// in ascending key order.
    pub fn children(&self) -> impl Iterator<Item = (&str, NodeId)> {
        self.data
            .iter()
            .filter(|(key, _)| !is_reserved_key(key))
            .filter_map(|(key, value)| value.as_child().map(|id| (key.as_str(), id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reserved_prefix_detection() {
        assert!(is_reserved_key("_isMap"));
        assert!(is_reserved_key("_key"));
        assert!(!is_reserved_key("name"));
        assert!(!is_reserved_key("items_with_underscores"));
    }

    #[test]
    fn field_value_accessors() {
        let leaf = FieldValue::Leaf(json!([1, 2, 3]));
        assert!(!leaf.is_child());
        assert_eq!(leaf.as_leaf(), Some(&json!([1, 2, 3])));
        assert_eq!(leaf.as_child(), None);

        let child = FieldValue::Child(NodeId::from_raw(7));
        assert!(child.is_child());
        assert_eq!(child.as_child(), Some(NodeId::from_raw(7)));
        assert_eq!(child.as_leaf(), None);
    }

    #[test]
    fn children_skip_reserved_and_leaf_fields() {
        let mut node = Node::new();
        node.data
            .insert("alpha".into(), FieldValue::Child(NodeId::from_raw(1)));
        node.data
            .insert("_hidden".into(), FieldValue::Child(NodeId::from_raw(2)));
        node.data
            .insert("count".into(), FieldValue::Leaf(json!(3)));

        let children: Vec<_> = node.children().collect();
        assert_eq!(children, vec![("alpha", NodeId::from_raw(1))]);
    }

    #[test]
    fn node_id_display() {
        let id = NodeId::from_raw(42);
        assert_eq!(format!("{id}"), "#42");
        assert_eq!(format!("{id:?}"), "NodeId(42)");
    }

    #[test]
    fn serde_roundtrip() {
        let record = ChangeRecord {
            previous: json!("old"),
            changed_at: 1_700_000_000_000,
        };
        let encoded = serde_json::to_string(&record).unwrap();
        let decoded: ChangeRecord = serde_json::from_str(&encoded).unwrap();
        assert_eq!(record, decoded);
    }
}
