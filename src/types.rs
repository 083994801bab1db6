//! Core types for the partial store.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

use crate::error::{Result, StoreError};

/// Callback invoked when a store notifies its subscribers.
///
/// Listeners take no arguments; they read the new state through the store
/// they subscribed to. The `Arc` identity is the registration token: the
/// same `Arc` registered twice is one listener for dedup purposes.
pub type Listener = Arc<dyn Fn() + Send + Sync>;

/// Projection applied to a derived state value before it is exposed.
pub type Transform = Arc<dyn Fn(Value) -> Value + Send + Sync>;

/// Whether two listeners are the same registration token.
pub(crate) fn same_listener(a: &Listener, b: &Listener) -> bool {
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}

/// Location of a tracked field inside a source state value.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct FieldPath {
    segments: Vec<String>,
}

impl FieldPath {
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FieldPath {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Walk the path through `root`. Missing fields and non-object
    /// intermediates yield `None`, the equivalent of `undefined`.
    pub fn resolve<'a>(&self, root: &'a Value) -> Option<&'a Value> {
        self.segments
            .iter()
            .try_fold(root, |value, segment| value.get(segment.as_str()))
    }
}

impl fmt::Debug for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FieldPath({})", self)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}

/// One entry in a field spec: take the field as-is, or recurse into it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldNode {
    Leaf,
    Nested(FieldSpec),
}

/// Ordered set of selected fields, possibly nested.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct FieldSpec {
    fields: IndexMap<String, FieldNode>,
}

impl FieldSpec {
    pub fn new() -> Self {
        FieldSpec::default()
    }

    /// Select a field wholesale.
    pub fn field(mut self, name: impl Into<String>) -> Self {
        self.fields.insert(name.into(), FieldNode::Leaf);
        self
    }

    /// Select parts of a field through a nested spec.
    pub fn nested(mut self, name: impl Into<String>, spec: FieldSpec) -> Self {
        self.fields.insert(name.into(), FieldNode::Nested(spec));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }
}

/// What a partial view selects from its source state.
///
/// The key form exposes the field's value unwrapped; the fields form
/// exposes an object mirroring the spec shape. `"name"` and JSON values
/// like `{ "name": true, "inner": { "part": true } }` convert into this.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Selection {
    Key(String),
    Fields(FieldSpec),
}

impl Selection {
    pub fn key(name: impl Into<String>) -> Self {
        Selection::Key(name.into())
    }

    pub fn fields(spec: FieldSpec) -> Self {
        Selection::Fields(spec)
    }

    /// The tracked paths, one per selected leaf, in spec order.
    pub fn field_paths(&self) -> Vec<FieldPath> {
        match self {
            Selection::Key(name) => vec![FieldPath::new([name.clone()])],
            Selection::Fields(spec) => {
                let mut paths = Vec::new();
                collect_paths(spec, &mut Vec::new(), &mut paths);
                paths
            }
        }
    }

    /// Parse the JSON form: a field name string, or an object whose leaves
    /// are `true` and whose sub-objects are nested specs.
    pub fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::String(name) => Ok(Selection::Key(name.clone())),
            Value::Object(map) => Ok(Selection::Fields(spec_from_map(map)?)),
            other => Err(StoreError::InvalidSelection(format!(
                "expected a field name or an object of fields, got {other}"
            ))),
        }
    }

    /// Render back to the JSON form accepted by [`Selection::from_value`].
    pub fn to_value(&self) -> Value {
        match self {
            Selection::Key(name) => Value::String(name.clone()),
            Selection::Fields(spec) => spec_to_value(spec),
        }
    }
}

fn collect_paths(spec: &FieldSpec, prefix: &mut Vec<String>, out: &mut Vec<FieldPath>) {
    for (name, node) in &spec.fields {
        prefix.push(name.clone());
        match node {
            FieldNode::Leaf => out.push(FieldPath {
                segments: prefix.clone(),
            }),
            FieldNode::Nested(inner) => collect_paths(inner, prefix, out),
        }
        prefix.pop();
    }
}

fn spec_from_map(map: &Map<String, Value>) -> Result<FieldSpec> {
    let mut fields = IndexMap::new();
    for (name, node) in map {
        let node = match node {
            Value::Bool(true) => FieldNode::Leaf,
            Value::Object(inner) => FieldNode::Nested(spec_from_map(inner)?),
            other => {
                return Err(StoreError::InvalidSelection(format!(
                    "field {name:?} must map to true or a nested object, got {other}"
                )))
            }
        };
        fields.insert(name.clone(), node);
    }
    Ok(FieldSpec { fields })
}

fn spec_to_value(spec: &FieldSpec) -> Value {
    let mut map = Map::new();
    for (name, node) in &spec.fields {
        let value = match node {
            FieldNode::Leaf => Value::Bool(true),
            FieldNode::Nested(inner) => spec_to_value(inner),
        };
        map.insert(name.clone(), value);
    }
    Value::Object(map)
}

impl From<&str> for Selection {
    fn from(name: &str) -> Self {
        Selection::Key(name.to_owned())
    }
}

impl From<String> for Selection {
    fn from(name: String) -> Self {
        Selection::Key(name)
    }
}

impl From<FieldSpec> for Selection {
    fn from(spec: FieldSpec) -> Self {
        Selection::Fields(spec)
    }
}

impl TryFrom<&Value> for Selection {
    type Error = StoreError;

    fn try_from(value: &Value) -> Result<Self> {
        Selection::from_value(value)
    }
}

impl TryFrom<Value> for Selection {
    type Error = StoreError;

    fn try_from(value: Value) -> Result<Self> {
        Selection::from_value(&value)
    }
}

impl Serialize for Selection {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Selection {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Selection::from_value(&value).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_field_paths_in_spec_order() {
        let selection = Selection::fields(
            FieldSpec::new()
                .field("f2")
                .nested("f1", FieldSpec::new().field("value").field("extra")),
        );

        let paths = selection.field_paths();
        assert_eq!(
            paths,
            vec![
                FieldPath::new(["f2"]),
                FieldPath::new(["f1", "value"]),
                FieldPath::new(["f1", "extra"]),
            ]
        );
    }

    #[test]
    fn test_key_selection_single_path() {
        let selection = Selection::key("f1");
        assert_eq!(selection.field_paths(), vec![FieldPath::new(["f1"])]);
    }

    #[test]
    fn test_empty_spec_no_paths() {
        let selection = Selection::fields(FieldSpec::new());
        assert!(selection.field_paths().is_empty());
    }

    #[test]
    fn test_from_value_object() {
        let parsed = Selection::from_value(&json!({
            "f2": true,
            "f1": { "value": true },
        }))
        .unwrap();

        let built = Selection::fields(
            FieldSpec::new()
                .field("f2")
                .nested("f1", FieldSpec::new().field("value")),
        );
        assert_eq!(parsed, built);
    }

    #[test]
    fn test_from_value_string() {
        let parsed = Selection::from_value(&json!("f1")).unwrap();
        assert_eq!(parsed, Selection::key("f1"));
    }

    #[test]
    fn test_from_value_rejects_bad_leaf() {
        assert!(Selection::from_value(&json!({ "f1": false })).is_err());
        assert!(Selection::from_value(&json!({ "f1": 1 })).is_err());
        assert!(Selection::from_value(&json!(42)).is_err());
    }

    #[test]
    fn test_value_roundtrip() {
        let value = json!({ "f1": { "value": true }, "f2": true });
        let selection = Selection::from_value(&value).unwrap();
        assert_eq!(selection.to_value(), value);
    }

    #[test]
    fn test_resolve() {
        let state = json!({ "a": { "b": 1 }, "s": "x" });

        assert_eq!(
            FieldPath::new(["a", "b"]).resolve(&state),
            Some(&json!(1))
        );
        assert_eq!(FieldPath::new(["a", "c"]).resolve(&state), None);
        assert_eq!(FieldPath::new(["missing", "b"]).resolve(&state), None);
        // Paths through non-objects resolve to nothing rather than failing.
        assert_eq!(FieldPath::new(["s", "b"]).resolve(&state), None);
    }

    #[test]
    fn test_path_display() {
        let path = FieldPath::new(["f1", "value"]);
        assert_eq!(path.to_string(), "f1.value");
        assert_eq!(format!("{:?}", path), "FieldPath(f1.value)");
    }
}
