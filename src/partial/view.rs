//! Partial view construction and its store implementation.

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use super::cache::MemoRecord;
use crate::error::Result;
use crate::state::assemble;
use crate::store::Store;
use crate::subscriptions::{Multiplexer, Subscription};
use crate::types::{FieldPath, Listener, Selection, Transform};

/// What a derived node exposes of its parent.
struct View {
    selection: Selection,
    /// Resolver output for `selection`, fixed at construction.
    paths: Vec<FieldPath>,
    transform: Option<Transform>,
    memo: Mutex<MemoRecord>,
}

enum NodeKind<A: 'static> {
    /// Transparent wrapper around the underlying store.
    Root {
        store: Arc<dyn Store<Action = A> + Send + Sync>,
    },
    /// Derived view over another node.
    View { parent: Arc<Node<A>>, view: View },
}

/// One level of a view hierarchy.
///
/// Each node owns the multiplexer its children register into, so sibling
/// views derived from the same parent share one registry and the parent
/// is observed through at most one subscription.
struct Node<A: 'static> {
    kind: NodeKind<A>,
    hub: Arc<Multiplexer>,
}

impl<A: 'static> Store for Node<A> {
    type Action = A;

    fn dispatch(&self, action: A) {
        match &self.kind {
            NodeKind::Root { store } => store.dispatch(action),
            NodeKind::View { parent, .. } => parent.dispatch(action),
        }
    }

    fn state(&self) -> Arc<Value> {
        match &self.kind {
            NodeKind::Root { store } => store.state(),
            NodeKind::View { parent, view } => {
                let full = parent.state();
                let current: Vec<Option<Value>> = view
                    .paths
                    .iter()
                    .map(|path| path.resolve(&full).cloned())
                    .collect();
                view.memo.lock().read(current, || {
                    let assembled = assemble(&full, &view.selection);
                    match &view.transform {
                        Some(transform) => transform(assembled),
                        None => assembled,
                    }
                })
            }
        }
    }

    fn subscribe(&self, listener: Listener) -> Subscription {
        match &self.kind {
            NodeKind::Root { store } => store.subscribe(listener),
            NodeKind::View { parent, view } => {
                // A view that tracks nothing can never change; handing out
                // an inert guard keeps the parent unobserved.
                if view.paths.is_empty() {
                    return Subscription::inert();
                }
                Multiplexer::register(&parent.hub, parent, &view.paths, &listener);
                let hub = Arc::clone(&parent.hub);
                let paths = view.paths.clone();
                Subscription::new(move || hub.unregister(&paths, &listener))
            }
        }
    }
}

/// Handle to one level of a partial view hierarchy.
///
/// [`wrap`](PartialStore::wrap) decorates a store without changing its
/// behavior; [`partial`](PartialStore::partial) derives a view exposing a
/// selection of the state. Views implement [`Store`] themselves, so they
/// nest indefinitely. Handles are cheap clones sharing one node; wrapping
/// the same store twice, by contrast, produces independent hierarchies
/// with nothing shared between them.
pub struct PartialStore<A: 'static = Value> {
    node: Arc<Node<A>>,
}

impl<A: 'static> Clone for PartialStore<A> {
    fn clone(&self) -> Self {
        PartialStore {
            node: Arc::clone(&self.node),
        }
    }
}

impl<A: 'static> PartialStore<A> {
    /// Decorate a store with view derivation.
    pub fn wrap<S>(store: S) -> Self
    where
        S: Store<Action = A> + Send + Sync + 'static,
    {
        PartialStore {
            node: Arc::new(Node {
                kind: NodeKind::Root {
                    store: Arc::new(store),
                },
                hub: Arc::new(Multiplexer::new()),
            }),
        }
    }

    /// Derive a view exposing `selection`.
    pub fn partial(&self, selection: impl Into<Selection>) -> PartialStore<A> {
        self.derive(selection.into(), None)
    }

    /// Derive a view exposing `selection` projected through `select`.
    ///
    /// The projection runs on the assembled value, only when some tracked
    /// field changed; its result is what [`Store::state`] returns and
    /// what memoization keeps stable.
    pub fn partial_with(
        &self,
        selection: impl Into<Selection>,
        select: impl Fn(Value) -> Value + Send + Sync + 'static,
    ) -> PartialStore<A> {
        self.derive(selection.into(), Some(Arc::new(select)))
    }

    fn derive(&self, selection: Selection, transform: Option<Transform>) -> PartialStore<A> {
        let paths = selection.field_paths();
        debug!(paths = paths.len(), "derived partial view");
        PartialStore {
            node: Arc::new(Node {
                kind: NodeKind::View {
                    parent: Arc::clone(&self.node),
                    view: View {
                        selection,
                        paths,
                        transform,
                        memo: Mutex::new(MemoRecord::new()),
                    },
                },
                hub: Arc::new(Multiplexer::new()),
            }),
        }
    }

    /// Decode the current snapshot into `T`.
    pub fn state_as<T: DeserializeOwned>(&self) -> Result<T> {
        let state = self.node.state();
        Ok(serde_json::from_value(state.as_ref().clone())?)
    }

    /// The selection this view derives; `None` on the root wrapper.
    pub fn selection(&self) -> Option<&Selection> {
        match &self.node.kind {
            NodeKind::Root { .. } => None,
            NodeKind::View { view, .. } => Some(&view.selection),
        }
    }
}

impl<A: 'static> Store for PartialStore<A> {
    type Action = A;

    fn dispatch(&self, action: A) {
        self.node.dispatch(action)
    }

    fn state(&self) -> Arc<Value> {
        self.node.state()
    }

    fn subscribe(&self, listener: Listener) -> Subscription {
        self.node.subscribe(listener)
    }
}

impl<A: 'static> fmt::Debug for PartialStore<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.node.kind {
            NodeKind::Root { .. } => write!(f, "PartialStore(root)"),
            NodeKind::View { view, .. } => {
                write!(f, "PartialStore({})", view.selection.to_value())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::types::FieldSpec;
    use serde::Deserialize;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn test_store() -> MemoryStore {
        MemoryStore::new(json!({
            "f1": { "value": "initial" },
            "f2": 0,
        }))
    }

    #[test]
    fn test_root_wrapper_is_transparent() {
        let store = test_store();
        let root = PartialStore::wrap(store.clone());

        assert!(Arc::ptr_eq(&root.state(), &store.state()));

        let sub = root.subscribe(Arc::new(|| {}));
        assert_eq!(store.listener_count(), 1);
        sub.unsubscribe();
        assert_eq!(store.listener_count(), 0);

        root.dispatch(json!({ "f1": null, "f2": 1 }));
        assert_eq!(*store.state(), json!({ "f1": null, "f2": 1 }));
    }

    #[test]
    fn test_key_view_unwraps_field() {
        let root = PartialStore::wrap(test_store());
        let view = root.partial("f1");
        assert_eq!(*view.state(), json!({ "value": "initial" }));
    }

    #[test]
    fn test_fields_view_mirrors_spec() {
        let root = PartialStore::wrap(test_store());
        let view = root.partial(
            FieldSpec::new()
                .nested("f1", FieldSpec::new().field("value"))
                .field("f2"),
        );
        assert_eq!(
            *view.state(),
            json!({ "f1": { "value": "initial" }, "f2": 0 })
        );
    }

    #[test]
    fn test_reads_are_reference_stable() {
        let store = test_store();
        let root = PartialStore::wrap(store.clone());
        let view = root.partial("f1");

        let before = view.state();
        assert!(Arc::ptr_eq(&before, &view.state()));

        // An untracked change leaves the derived value alone.
        store.dispatch(json!({ "f1": { "value": "initial" }, "f2": 5 }));
        assert!(Arc::ptr_eq(&before, &view.state()));

        store.dispatch(json!({ "f1": { "value": "changed" }, "f2": 5 }));
        let after = view.state();
        assert!(!Arc::ptr_eq(&before, &after));
        assert_eq!(*after, json!({ "value": "changed" }));
    }

    #[test]
    fn test_empty_selection_is_inert() {
        let store = test_store();
        let root = PartialStore::wrap(store.clone());
        let view = root.partial(FieldSpec::new());

        let first = view.state();
        assert_eq!(*first, json!({}));

        let sub = view.subscribe(Arc::new(|| {}));
        assert_eq!(store.listener_count(), 0);

        store.dispatch(json!({ "f1": null, "f2": 9 }));
        assert!(Arc::ptr_eq(&first, &view.state()));
        sub.unsubscribe();
    }

    #[test]
    fn test_transform_runs_only_on_change() {
        let store = test_store();
        let root = PartialStore::wrap(store.clone());

        let runs = Arc::new(AtomicUsize::new(0));
        let runs_inner = Arc::clone(&runs);
        let view = root.partial_with("f2", move |value| {
            runs_inner.fetch_add(1, Ordering::SeqCst);
            json!({ "doubled": value.as_i64().unwrap_or(0) * 2 })
        });

        assert_eq!(*view.state(), json!({ "doubled": 0 }));
        assert_eq!(*view.state(), json!({ "doubled": 0 }));
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        store.dispatch(json!({ "f1": { "value": "initial" }, "f2": 21 }));
        assert_eq!(*view.state(), json!({ "doubled": 42 }));
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_state_as_decodes() {
        #[derive(Deserialize)]
        struct F1 {
            value: String,
        }

        let root = PartialStore::wrap(test_store());
        let f1: F1 = root.partial("f1").state_as().unwrap();
        assert_eq!(f1.value, "initial");

        let broken: Result<F1> = root.partial("f2").state_as();
        assert!(broken.is_err());
    }

    #[test]
    fn test_selection_accessor() {
        let root = PartialStore::wrap(test_store());
        assert!(root.selection().is_none());
        assert_eq!(
            root.partial("f1").selection(),
            Some(&Selection::key("f1"))
        );
    }

    #[test]
    fn test_missing_field_view_is_null() {
        let root = PartialStore::wrap(test_store());
        let view = root.partial("missing");
        assert_eq!(*view.state(), Value::Null);
    }
}
