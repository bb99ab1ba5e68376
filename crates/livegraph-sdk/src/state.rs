//! The `LiveState` facade: a full-state tree plus the apply operation.

use serde_json::Value;

use livegraph_tree::{NodeId, Tree};
use livegraph_view::collection_list;

use crate::apply::{apply_with, ApplyOptions};
use crate::error::SdkResult;

/// A client-held synchronized state: the live tree and the operations the
/// synchronization layer drives it with.
///
/// The surrounding application owns message framing and transport; this
/// type only consumes already-decoded diff objects.
#[derive(Clone, Debug, Default)]
pub struct LiveState {
    tree: Tree,
}

impl LiveState {
    /// An empty state awaiting its first full snapshot.
    pub fn new() -> Self {
        Self { tree: Tree::new() }
    }

    /// Start from a full snapshot, as delivered by the remote source on
    /// (re)connect.
    pub fn from_snapshot(snapshot: &Value) -> SdkResult<Self> {
        Ok(Self {
            tree: Tree::from_value(snapshot)?,
        })
    }

    /// Apply a diff with default options (merge plus accessor rebinding).
    pub fn apply(&mut self, diff: &Value) -> SdkResult<()> {
        self.apply_with(diff, ApplyOptions::default())
    }

    /// Apply a diff with explicit options.
    pub fn apply_with(&mut self, diff: &Value, options: ApplyOptions) -> SdkResult<()> {
        apply_with(&mut self.tree, diff, options)
    }

    /// Invoke a root-level list accessor (for example `"itemsList"`),
    /// returning the sorted handles of the collection it is bound to.
    pub fn list(&mut self, name: &str) -> SdkResult<Option<Vec<NodeId>>> {
        let root = self.tree.root();
        Ok(collection_list(&mut self.tree, root, name)?)
    }

    /// Like [`LiveState::list`], but materializing each item to JSON.
    pub fn list_values(&mut self, name: &str) -> SdkResult<Option<Vec<Value>>> {
        let Some(ids) = self.list(name)? else {
            return Ok(None);
        };
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            out.push(self.tree.to_value(id)?);
        }
        Ok(Some(out))
    }

    /// Export the current domain data as JSON.
    pub fn snapshot(&self) -> SdkResult<Value> {
        Ok(self.tree.to_value(self.tree.root())?)
    }

    /// The underlying tree.
    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// Mutable access to the underlying tree.
    pub fn tree_mut(&mut self) -> &mut Tree {
        &mut self.tree
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use livegraph_tree::MergeClock;

    fn items_state() -> LiveState {
        let mut state = LiveState::from_snapshot(&json!({
            "items": {
                "_isMap": true,
                "a": { "name": "a", "order": 0 },
                "b": { "name": "b", "order": 1 }
            }
        }))
        .unwrap();
        *state.tree_mut().clock_mut() = MergeClock::fixed(1000);
        state
    }

    #[test]
    fn end_to_end_insert_and_list() {
        let mut state = items_state();
        state
            .apply(&json!({ "items": { "c": { "name": "c", "order": 0 } } }))
            .unwrap();

        let root = state.tree().root();
        let items = state.tree().child(root, "items").unwrap();
        // The accessor is bound on the collection's parent, not on the
        // collection itself.
        assert!(state.tree().node(items).unwrap().lists.is_empty());
        assert!(state.tree().node(root).unwrap().lists.contains_key("itemsList"));

        let names: Vec<_> = state
            .list("itemsList")
            .unwrap()
            .expect("accessor bound")
            .iter()
            .map(|id| state.tree().leaf(*id, "name").unwrap().clone())
            .collect();
        assert_eq!(names, vec![json!("a"), json!("c"), json!("b")]);
    }

    #[test]
    fn accessor_reflects_later_merges() {
        let mut state = items_state();
        state
            .apply(&json!({ "items": { "c": { "name": "c", "order": 0 } } }))
            .unwrap();
        assert_eq!(state.list("itemsList").unwrap().unwrap().len(), 3);

        // The binding closes over the live collection: removing an item and
        // re-invoking observes the recomputed view.
        state.apply(&json!({ "items": { "b": null } })).unwrap();
        let names: Vec<_> = state
            .list_values("itemsList")
            .unwrap()
            .unwrap()
            .iter()
            .map(|item| item["name"].clone())
            .collect();
        assert_eq!(names, vec![json!("a"), json!("c")]);
    }

    #[test]
    fn skip_lists_suppresses_accessor_binding() {
        let mut state = items_state();
        state
            .apply_with(
                &json!({ "items": { "c": { "name": "c", "order": 0 } } }),
                ApplyOptions {
                    skip_lists: true,
                    ..Default::default()
                },
            )
            .unwrap();
        let root = state.tree().root();
        assert!(state.tree().node(root).unwrap().lists.is_empty());
        assert!(state.list("itemsList").unwrap().is_none());
        // The merge itself still happened.
        let items = state.tree().child(root, "items").unwrap();
        assert!(state.tree().child(items, "c").is_some());
    }

    #[test]
    fn strict_mode_propagates() {
        let mut state = LiveState::from_snapshot(&json!({ "count": 1 })).unwrap();
        let err = state
            .apply_with(
                &json!({ "count": { "x": 1 } }),
                ApplyOptions {
                    strict: true,
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, crate::SdkError::Merge(_)));
    }

    #[test]
    fn snapshot_roundtrips_through_apply() {
        let mut state = LiveState::new();
        state
            .apply(&json!({ "title": "home", "meta": { "version": 2 } }))
            .unwrap();
        assert_eq!(
            state.snapshot().unwrap(),
            json!({ "title": "home", "meta": { "version": 2 } })
        );
    }

    #[test]
    fn deleting_a_collection_unbinds_its_accessor() {
        let mut state = items_state();
        state.apply(&json!({ "extra": "x" })).unwrap();
        assert!(state.list("itemsList").unwrap().is_some());

        state.apply(&json!({ "items": null })).unwrap();
        assert!(state.list("itemsList").unwrap().is_none());
    }
}
