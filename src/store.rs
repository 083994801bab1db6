//! The store interface and an in-memory reference store.

use crossbeam_channel::bounded;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::sync::Arc;

use crate::subscriptions::{Subscription, Watch};
use crate::types::{same_listener, Listener};

/// An observable state container.
///
/// This is both the interface the crate consumes (anything observable can
/// be wrapped) and the one partial views expose, which is what lets views
/// derive from other views indefinitely.
pub trait Store {
    /// Dispatched through every view level to the root store unmodified.
    type Action;

    /// Forward an action to the underlying store.
    fn dispatch(&self, action: Self::Action);

    /// Current state snapshot. Stable between state-changing events: two
    /// reads with no change in between return the same `Arc`.
    fn state(&self) -> Arc<Value>;

    /// Register a change listener, called synchronously once per state
    /// transition the store reports.
    fn subscribe(&self, listener: Listener) -> Subscription;

    /// Channel-backed change ticks for this store.
    fn watch(&self) -> Watch
    where
        Self: Sized,
    {
        let (tx, rx) = bounded(1);
        let subscription = self.subscribe(Arc::new(move || {
            // Full buffer means a tick is already pending; coalesce.
            let _ = tx.try_send(());
        }));
        Watch::new(rx, subscription)
    }
}

impl<S: Store + ?Sized> Store for Arc<S> {
    type Action = S::Action;

    fn dispatch(&self, action: Self::Action) {
        (**self).dispatch(action)
    }

    fn state(&self) -> Arc<Value> {
        (**self).state()
    }

    fn subscribe(&self, listener: Listener) -> Subscription {
        (**self).subscribe(listener)
    }
}

type Reducer<A> = Box<dyn Fn(&Value, &A) -> Value + Send + Sync>;

/// In-memory reducer-driven store.
///
/// The reference [`Store`] implementation: dispatch folds the action into
/// the state and then notifies every listener, synchronously, in
/// registration order. Handles are cheap clones sharing one store.
pub struct MemoryStore<A = Value> {
    inner: Arc<MemoryInner<A>>,
}

struct MemoryInner<A> {
    reducer: Reducer<A>,
    state: RwLock<Arc<Value>>,
    listeners: Mutex<Vec<Listener>>,
}

impl<A> Clone for MemoryStore<A> {
    fn clone(&self) -> Self {
        MemoryStore {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl MemoryStore<Value> {
    /// Store whose actions replace the whole state.
    pub fn new(initial: Value) -> Self {
        MemoryStore::with_reducer(initial, |_, action: &Value| action.clone())
    }
}

impl<A> MemoryStore<A> {
    /// Store driven by an explicit reducer.
    pub fn with_reducer(
        initial: Value,
        reducer: impl Fn(&Value, &A) -> Value + Send + Sync + 'static,
    ) -> Self {
        MemoryStore {
            inner: Arc::new(MemoryInner {
                reducer: Box::new(reducer),
                state: RwLock::new(Arc::new(initial)),
                listeners: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Number of currently registered listeners.
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.lock().len()
    }
}

impl<A: 'static> Store for MemoryStore<A> {
    type Action = A;

    fn dispatch(&self, action: A) {
        {
            let mut state = self.inner.state.write();
            let next = (self.inner.reducer)(state.as_ref(), &action);
            *state = Arc::new(next);
        }
        // Snapshot outside the listener lock so callbacks are free to
        // subscribe, unsubscribe, or dispatch again.
        let listeners: Vec<Listener> = self.inner.listeners.lock().clone();
        for listener in listeners {
            listener();
        }
    }

    fn state(&self) -> Arc<Value> {
        self.inner.state.read().clone()
    }

    fn subscribe(&self, listener: Listener) -> Subscription {
        self.inner.listeners.lock().push(listener.clone());
        let inner = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = inner.upgrade() {
                let mut listeners = inner.listeners.lock();
                if let Some(pos) = listeners.iter().position(|l| same_listener(l, &listener)) {
                    listeners.remove(pos);
                }
            }
        })
    }
}
