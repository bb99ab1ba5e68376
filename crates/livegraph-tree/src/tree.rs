//! The arena holding the full client-side state graph.
//!
//! All nodes live in a `BTreeMap<NodeId, Node>`; fields reference nested
//! nodes by handle. Back-references are handles too, so the ownership
//! relation (arena entry plus parent-to-child field edges) stays acyclic and
//! a subtree is destroyed by plain structural teardown.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::error::{TreeError, TreeResult};
use crate::node::{ChangeRecord, FieldValue, Node, NodeId, NodeMeta, MAP_FLAG, STRUCT_FLAG};
use crate::temporal::MergeClock;

/// The full-state tree: node arena, root handle, and merge clock.
#[derive(Clone, Debug, PartialEq)]
pub struct Tree {
    nodes: BTreeMap<NodeId, Node>,
    root: NodeId,
    next_id: u64,
    clock: MergeClock,
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

impl Tree {
    /// Create an empty tree with a fresh root node.
    pub fn new() -> Self {
        let mut tree = Self {
            nodes: BTreeMap::new(),
            root: NodeId::from_raw(0),
            next_id: 0,
            clock: MergeClock::new(),
        };
        tree.root = tree.insert(Node::new());
        tree
    }

    /// Create an empty tree driven by the given clock.
    pub fn with_clock(clock: MergeClock) -> Self {
        let mut tree = Self::new();
        tree.clock = clock;
        tree
    }

    /// Build a tree from a JSON snapshot.
    ///
    /// The root must be an object. Nested objects become arena nodes with
    /// back-references set for their attachment point; `_isStruct` and
    /// `_isMap` boolean entries are routed into [`NodeMeta`] flags. Other
    /// underscore-prefixed fields are kept as ordinary data (the reserved
    /// namespace excludes them from child walks downstream).
    pub fn from_value(value: &Value) -> TreeResult<Self> {
        let Value::Object(fields) = value else {
            return Err(TreeError::NonObjectRoot(json_kind(value)));
        };
        let mut tree = Self::new();
        let root = tree.root;
        tree.populate(root, fields)?;
        let meta = &mut tree.node_mut(root)?.meta;
        meta.is_struct = flag_set(fields, STRUCT_FLAG);
        meta.is_map = flag_set(fields, MAP_FLAG);
        Ok(tree)
    }

    /// The root node handle.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of live nodes in the arena (including the root).
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if only the empty root exists.
    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1 && self.nodes.get(&self.root).map_or(true, |n| n.data.is_empty())
    }

    /// Returns `true` if the handle resolves to a live node.
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Look up a node.
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Look up a node mutably.
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    /// Look up a node, failing if the handle is dangling.
    pub fn node(&self, id: NodeId) -> TreeResult<&Node> {
        self.nodes.get(&id).ok_or(TreeError::NodeNotFound(id))
    }

    /// Look up a node mutably, failing if the handle is dangling.
    pub fn node_mut(&mut self, id: NodeId) -> TreeResult<&mut Node> {
        self.nodes.get_mut(&id).ok_or(TreeError::NodeNotFound(id))
    }

    /// A node's field by name.
    pub fn field(&self, id: NodeId, key: &str) -> Option<&FieldValue> {
        self.nodes.get(&id).and_then(|n| n.data.get(key))
    }

    /// A node's nested child by field name.
    pub fn child(&self, id: NodeId, key: &str) -> Option<NodeId> {
        self.field(id, key).and_then(FieldValue::as_child)
    }

    /// A node's leaf value by field name.
    pub fn leaf(&self, id: NodeId, key: &str) -> Option<&Value> {
        self.field(id, key).and_then(FieldValue::as_leaf)
    }

    /// A node's change record by field name.
    pub fn change(&self, id: NodeId, key: &str) -> Option<&ChangeRecord> {
        self.nodes.get(&id).and_then(|n| n.changes.get(key))
    }

    /// Current merge timestamp in milliseconds.
    pub fn now_ms(&mut self) -> u64 {
        self.clock.now_ms()
    }

    /// Mutable access to the merge clock.
    pub fn clock_mut(&mut self) -> &mut MergeClock {
        &mut self.clock
    }

    /// Allocate a fresh, detached, empty node.
    pub fn alloc(&mut self) -> NodeId {
        self.insert(Node::new())
    }

    /// Build a node from a JSON object and attach metadata for the position
    /// `owner.key`. The new node's `collection` is the owner; its `parent`
    /// is the owner's own `collection`, or the owner itself when the object
    /// carries `_isStruct: true` (a struct boundary resets the chain).
    ///
    /// The node is not inserted into the owner's data; the caller installs
    /// the returned handle.
    pub fn attach_object(
        &mut self,
        owner: NodeId,
        key: &str,
        fields: &Map<String, Value>,
    ) -> TreeResult<NodeId> {
        let owner_collection = self.node(owner)?.meta.collection;
        let is_struct = flag_set(fields, STRUCT_FLAG);
        let mut node = Node::new();
        node.meta = NodeMeta {
            parent: if is_struct {
                Some(owner)
            } else {
                owner_collection
            },
            collection: Some(owner),
            key: Some(key.to_string()),
            is_struct,
            is_map: flag_set(fields, MAP_FLAG),
            cached_list: None,
        };
        let id = self.insert(node);
        self.populate(id, fields)?;
        Ok(id)
    }

    /// Remove a node and every descendant reachable through its fields.
    pub fn remove_subtree(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.remove(&current) {
                for value in node.data.values() {
                    if let FieldValue::Child(child) = value {
                        stack.push(*child);
                    }
                }
            }
        }
    }

    /// Export a node's domain data (plus its struct/collection flags) back
    /// to JSON. Attachment metadata, change records, and installed list
    /// accessors are not part of the snapshot.
    pub fn to_value(&self, id: NodeId) -> TreeResult<Value> {
        let node = self.node(id)?;
        let mut out = Map::new();
        if node.meta.is_struct {
            out.insert(STRUCT_FLAG.to_string(), Value::Bool(true));
        }
        if node.meta.is_map {
            out.insert(MAP_FLAG.to_string(), Value::Bool(true));
        }
        for (key, value) in &node.data {
            let exported = match value {
                FieldValue::Leaf(v) => v.clone(),
                FieldValue::Child(child) => self.to_value(*child)?,
            };
            out.insert(key.clone(), exported);
        }
        Ok(Value::Object(out))
    }

    fn insert(&mut self, node: Node) -> NodeId {
        let id = NodeId::from_raw(self.next_id);
        self.next_id += 1;
        self.nodes.insert(id, node);
        id
    }

    /// Fill a node's data from a JSON object, attaching nested objects as
    /// child nodes. Boolean struct/collection flags are consumed by the
    /// metadata channel rather than stored as data.
    fn populate(&mut self, id: NodeId, fields: &Map<String, Value>) -> TreeResult<()> {
        for (key, value) in fields {
            if (key == STRUCT_FLAG || key == MAP_FLAG) && value.is_boolean() {
                continue;
            }
            let field = match value {
                Value::Object(inner) => FieldValue::Child(self.attach_object(id, key, inner)?),
                other => FieldValue::Leaf(other.clone()),
            };
            self.node_mut(id)?.data.insert(key.clone(), field);
        }
        Ok(())
    }
}

fn flag_set(fields: &Map<String, Value>, flag: &str) -> bool {
    fields.get(flag).and_then(Value::as_bool).unwrap_or(false)
}

/// Human-readable JSON value kind, for error messages.
pub fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn empty_tree_has_root() {
        let tree = Tree::new();
        assert!(tree.contains(tree.root()));
        assert!(tree.is_empty());
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn from_value_rejects_non_object() {
        let err = Tree::from_value(&json!([1, 2])).unwrap_err();
        assert!(matches!(err, TreeError::NonObjectRoot("array")));
    }

    #[test]
    fn import_builds_nested_nodes_with_backrefs() {
        let tree = Tree::from_value(&json!({
            "title": "home",
            "items": {
                "_isMap": true,
                "a": { "name": "a", "order": 1 }
            }
        }))
        .unwrap();

        let root = tree.root();
        let items = tree.child(root, "items").expect("items node");
        let a = tree.child(items, "a").expect("item a");

        let items_node = tree.node(items).unwrap();
        assert!(items_node.meta.is_map);
        assert_eq!(items_node.meta.collection, Some(root));
        assert_eq!(items_node.meta.key.as_deref(), Some("items"));
        // Root has no collection, so a non-struct child's parent is unset.
        assert_eq!(items_node.meta.parent, None);

        let a_node = tree.node(a).unwrap();
        assert_eq!(a_node.meta.collection, Some(items));
        assert_eq!(a_node.meta.key.as_deref(), Some("a"));
        assert_eq!(tree.leaf(a, "order"), Some(&json!(1)));
    }

    #[test]
    fn struct_flag_resets_parent_chain() {
        let tree = Tree::from_value(&json!({
            "items": {
                "_isMap": true,
                "a": {
                    "score": { "_isStruct": true, "home": 1 }
                }
            }
        }))
        .unwrap();

        let items = tree.child(tree.root(), "items").unwrap();
        let a = tree.child(items, "a").unwrap();
        let score = tree.child(a, "score").unwrap();

        // Non-struct child: parent follows the owner's collection.
        assert_eq!(tree.node(a).unwrap().meta.parent, Some(tree.root()));
        // Struct child: parent is the owner itself.
        assert_eq!(tree.node(score).unwrap().meta.parent, Some(a));
        assert_eq!(tree.node(score).unwrap().meta.collection, Some(a));
        assert!(tree.node(score).unwrap().meta.is_struct);
    }

    #[test]
    fn boolean_flags_leave_data_channel() {
        let tree = Tree::from_value(&json!({
            "items": { "_isMap": true, "_tag": "x" }
        }))
        .unwrap();
        let items = tree.child(tree.root(), "items").unwrap();
        let node = tree.node(items).unwrap();
        assert!(node.meta.is_map);
        assert!(!node.data.contains_key("_isMap"));
        // Non-flag reserved keys stay as plain data.
        assert_eq!(tree.leaf(items, "_tag"), Some(&json!("x")));
    }

    #[test]
    fn export_roundtrips_flags_and_data() {
        let snapshot = json!({
            "items": {
                "_isMap": true,
                "a": { "name": "a", "tags": ["x", "y"] }
            },
            "title": "home"
        });
        let tree = Tree::from_value(&snapshot).unwrap();
        assert_eq!(tree.to_value(tree.root()).unwrap(), snapshot);
    }

    #[test]
    fn remove_subtree_frees_descendants() {
        let mut tree = Tree::from_value(&json!({
            "a": { "b": { "c": { "deep": true } } }
        }))
        .unwrap();
        let a = tree.child(tree.root(), "a").unwrap();
        let b = tree.child(a, "b").unwrap();
        let c = tree.child(b, "c").unwrap();
        assert_eq!(tree.len(), 4);

        tree.remove_subtree(a);
        assert!(!tree.contains(a));
        assert!(!tree.contains(b));
        assert!(!tree.contains(c));
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn arrays_stay_opaque() {
        let tree = Tree::from_value(&json!({
            "rows": [{ "not": "a node" }, 2, 3]
        }))
        .unwrap();
        // The array leaf holds the object verbatim; no node was allocated.
        assert_eq!(tree.len(), 1);
        assert_eq!(
            tree.leaf(tree.root(), "rows"),
            Some(&json!([{ "not": "a node" }, 2, 3]))
        );
    }

    fn scalar_strategy() -> impl Strategy<Value = serde_json::Value> {
        prop_oneof![
            any::<bool>().prop_map(serde_json::Value::Bool),
            any::<i64>().prop_map(|n| json!(n)),
            "[a-z]{0,8}".prop_map(serde_json::Value::String),
        ]
    }

    fn object_strategy() -> impl Strategy<Value = serde_json::Value> {
        let flat = prop::collection::btree_map("[a-z]{1,6}", scalar_strategy(), 0..6)
            .prop_map(|m| serde_json::Value::Object(m.into_iter().collect()));
        prop::collection::btree_map(
            "[a-z]{1,6}",
            prop_oneof![scalar_strategy(), flat],
            0..6,
        )
        .prop_map(|m| serde_json::Value::Object(m.into_iter().collect()))
    }

    proptest! {
        #[test]
        fn import_export_roundtrip(snapshot in object_strategy()) {
            let tree = Tree::from_value(&snapshot).unwrap();
            prop_assert_eq!(tree.to_value(tree.root()).unwrap(), snapshot);
        }
    }
}
