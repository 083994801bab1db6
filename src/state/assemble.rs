//! Partial-state assembly.

use serde_json::{Map, Value};

use crate::types::Selection;

/// Build the value a selection exposes over `full`.
///
/// The key form yields the named field's value as-is; the fields form
/// yields a fresh object mirroring the spec's nesting, built by merging
/// one leaf at a time. Missing fields become null.
pub fn assemble(full: &Value, selection: &Selection) -> Value {
    match selection {
        Selection::Key(name) => full.get(name.as_str()).cloned().unwrap_or(Value::Null),
        Selection::Fields(_) => {
            let mut root = Map::new();
            for path in selection.field_paths() {
                let leaf = path.resolve(full).cloned().unwrap_or(Value::Null);
                insert_at(&mut root, path.segments(), leaf);
            }
            Value::Object(root)
        }
    }
}

/// Insert `leaf` at `segments`, creating intermediate objects on demand.
fn insert_at(target: &mut Map<String, Value>, segments: &[String], leaf: Value) {
    match segments {
        [] => {}
        [last] => {
            target.insert(last.clone(), leaf);
        }
        [head, rest @ ..] => {
            let slot = target
                .entry(head.as_str())
                .or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(inner) = slot {
                insert_at(inner, rest, leaf);
            }
        }
    }
}
