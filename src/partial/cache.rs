//! Memoized derivation cache.

use serde_json::Value;
use std::sync::Arc;

/// Last observed inputs and output of one view's derivation.
pub(crate) struct MemoRecord {
    /// Value of each tracked path when the cache was last refreshed.
    tracked: Vec<Option<Value>>,
    /// The derived value handed out until some input changes.
    derived: Option<Arc<Value>>,
}

impl MemoRecord {
    pub(crate) fn new() -> Self {
        MemoRecord {
            tracked: Vec::new(),
            derived: None,
        }
    }

    /// Return the cached value while every tracked input still matches
    /// `current`, refreshing through `derive` otherwise.
    ///
    /// A view with no tracked paths hits the match arm on every read
    /// after the first, so its derived value is computed exactly once.
    pub(crate) fn read(
        &mut self,
        current: Vec<Option<Value>>,
        derive: impl FnOnce() -> Value,
    ) -> Arc<Value> {
        if let Some(cached) = &self.derived {
            let unchanged = self.tracked.len() == current.len()
                && self.tracked.iter().zip(&current).all(|(a, b)| a == b);
            if unchanged {
                return Arc::clone(cached);
            }
        }

        let value = Arc::new(derive());
        self.derived = Some(Arc::clone(&value));
        self.tracked = current;
        value
    }
}
