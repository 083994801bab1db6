//! Path-keyed listener registry with lazy upstream attachment.

use indexmap::IndexMap;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, trace};

use super::types::Subscription;
use crate::store::Store;
use crate::types::{same_listener, FieldPath, Listener};

/// Listeners registered under one field path.
#[derive(Default)]
struct PathEntry {
    listeners: Vec<Listener>,
}

struct Registry {
    /// Entries in first-registration order; shared by every view that
    /// tracks the path through this multiplexer.
    entries: IndexMap<FieldPath, PathEntry>,
    /// Source snapshot the next notification diffs against.
    baseline: Option<Arc<Value>>,
    /// The single subscription held on the source while any path is
    /// registered.
    upstream: Option<Subscription>,
}

/// Fans one source subscription out to per-field listeners.
///
/// A multiplexer belongs to the store whose children register into it.
/// It stays detached from the source until the first path is registered,
/// holds exactly one upstream subscription while any path remains, and
/// releases it when the last listener is removed.
pub(crate) struct Multiplexer {
    registry: Mutex<Registry>,
}

impl Multiplexer {
    pub(crate) fn new() -> Self {
        Multiplexer {
            registry: Mutex::new(Registry {
                entries: IndexMap::new(),
                baseline: None,
                upstream: None,
            }),
        }
    }

    /// Register `listener` under every path in `paths`.
    ///
    /// The first registered path snapshots the source as the comparison
    /// baseline and attaches the upstream subscription. Registering an
    /// empty path set does nothing at all.
    pub(crate) fn register<S>(
        hub: &Arc<Multiplexer>,
        source: &Arc<S>,
        paths: &[FieldPath],
        listener: &Listener,
    ) where
        S: Store + Send + Sync + 'static,
    {
        if paths.is_empty() {
            return;
        }

        let mut registry = hub.registry.lock();
        if registry.entries.is_empty() {
            // Baseline first: a change landing between the snapshot and
            // the subscribe is caught by the next notification's diff.
            let baseline = source.state();

            let hub_notify = Arc::clone(hub);
            let source_notify = Arc::clone(source);
            let notifier: Listener = Arc::new(move || {
                let state = source_notify.state();
                hub_notify.fan_out(state);
            });

            let upstream = source.subscribe(notifier);
            registry.baseline = Some(baseline);
            registry.upstream = Some(upstream);
            debug!(paths = paths.len(), "attached upstream subscription");
        }

        for path in paths {
            registry
                .entries
                .entry(path.clone())
                .or_default()
                .listeners
                .push(listener.clone());
        }
    }

    /// Remove one occurrence of `listener` from each path in `paths`.
    ///
    /// Entries that empty are dropped; when the whole registry empties,
    /// the baseline is discarded and the upstream subscription released.
    pub(crate) fn unregister(&self, paths: &[FieldPath], listener: &Listener) {
        let released = {
            let mut registry = self.registry.lock();
            for path in paths {
                if let Some(entry) = registry.entries.get_mut(path) {
                    if let Some(pos) = entry
                        .listeners
                        .iter()
                        .position(|l| same_listener(l, listener))
                    {
                        entry.listeners.remove(pos);
                    }
                    if entry.listeners.is_empty() {
                        registry.entries.shift_remove(path);
                    }
                }
            }
            if registry.entries.is_empty() {
                registry.baseline = None;
                registry.upstream.take()
            } else {
                None
            }
        };

        if let Some(upstream) = released {
            debug!("released upstream subscription");
            upstream.unsubscribe();
        }
    }

    /// Diff `new_state` against the baseline and notify the listeners of
    /// every changed path, each at most once.
    ///
    /// The affected set is collected and the baseline replaced before any
    /// listener runs, so callbacks that (un)subscribe see a stable turn,
    /// and callbacks that dispatch diff against the state they observed.
    pub(crate) fn fan_out(&self, new_state: Arc<Value>) {
        let fired = {
            let mut registry = self.registry.lock();
            let Some(previous) = registry.baseline.clone() else {
                return;
            };
            if Arc::ptr_eq(&previous, &new_state) {
                return;
            }

            let mut changed = 0usize;
            let mut fired: Vec<Listener> = Vec::new();
            for (path, entry) in &registry.entries {
                if path.resolve(&previous) != path.resolve(&new_state) {
                    changed += 1;
                    for listener in &entry.listeners {
                        if !fired.iter().any(|f| same_listener(f, listener)) {
                            fired.push(listener.clone());
                        }
                    }
                }
            }
            registry.baseline = Some(new_state);
            trace!(changed, listeners = fired.len(), "fan-out");
            fired
        };

        for listener in fired {
            listener();
        }
    }

    /// Number of distinct paths currently registered.
    #[cfg(test)]
    pub(crate) fn tracked_path_count(&self) -> usize {
        self.registry.lock().entries.len()
    }

    /// Whether the upstream subscription is currently held.
    #[cfg(test)]
    pub(crate) fn is_attached(&self) -> bool {
        self.registry.lock().upstream.is_some()
    }
}
