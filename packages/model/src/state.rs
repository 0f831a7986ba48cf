//! Typed state slice.
//!
//! The schema is a flat map from dotted field path to a shallow [`TypeTag`].
//! When no schema is declared, one is inferred from the initial values.

use crate::error::ModelError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Shallow JSON type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeTag {
    String,
    Number,
    Boolean,
    Object,
    Array,
    Null,
}

impl TypeTag {
    pub fn of(value: &Value) -> TypeTag {
        match value {
            Value::String(_) => TypeTag::String,
            Value::Number(_) => TypeTag::Number,
            Value::Bool(_) => TypeTag::Boolean,
            Value::Object(_) => TypeTag::Object,
            Value::Array(_) => TypeTag::Array,
            Value::Null => TypeTag::Null,
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TypeTag::String => "string",
            TypeTag::Number => "number",
            TypeTag::Boolean => "boolean",
            TypeTag::Object => "object",
            TypeTag::Array => "array",
            TypeTag::Null => "null",
        };
        f.write_str(name)
    }
}

/// `state` section of a screen document
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateDefinition {
    #[serde(default)]
    pub schema: BTreeMap<String, TypeTag>,

    #[serde(default)]
    pub initial_values: Map<String, Value>,
}

impl StateDefinition {
    /// Declared schema, or one inferred from the initial values when none was declared
    pub fn effective_schema(&self) -> BTreeMap<String, TypeTag> {
        if self.schema.is_empty() {
            infer_schema(&self.initial_values)
        } else {
            self.schema.clone()
        }
    }

    pub fn value_at_path(&self, path: &str) -> Option<&Value> {
        let mut segments = split_state_path(path).ok()?.into_iter();
        let first = segments.next()?;
        let mut current = self.initial_values.get(first)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }

    /// Write `value` at a dotted path, creating intermediate objects.
    ///
    /// A leading `state.` is accepted and ignored. Non-object values found on
    /// the way are replaced by objects.
    pub fn set_value_at_path(&mut self, path: &str, value: Value) -> Result<(), ModelError> {
        let segments = split_state_path(path)?;
        let (last, parents) = segments
            .split_last()
            .ok_or_else(|| ModelError::InvalidStatePath(path.to_string()))?;

        let mut current = &mut self.initial_values;
        for segment in parents {
            let slot = current
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !slot.is_object() {
                *slot = Value::Object(Map::new());
            }
            current = match slot {
                Value::Object(map) => map,
                _ => return Err(ModelError::InvalidStatePath(path.to_string())),
            };
        }
        current.insert(last.to_string(), value);
        Ok(())
    }

    /// Merge an incremental patch into the initial values.
    ///
    /// Objects merge recursively; any other value replaces; `null` removes the key.
    pub fn merge_state_patch(&mut self, patch: &Map<String, Value>) {
        merge_maps(&mut self.initial_values, patch);
    }
}

fn merge_maps(target: &mut Map<String, Value>, patch: &Map<String, Value>) {
    for (key, value) in patch {
        match value {
            Value::Null => {
                target.remove(key);
            }
            Value::Object(patch_obj) => match target.get_mut(key) {
                Some(Value::Object(existing)) => merge_maps(existing, patch_obj),
                _ => {
                    let mut fresh = Map::new();
                    merge_maps(&mut fresh, patch_obj);
                    target.insert(key.clone(), Value::Object(fresh));
                }
            },
            other => {
                target.insert(key.clone(), other.clone());
            }
        }
    }
}

/// Split a dotted state path, dropping an optional `state.` prefix
pub fn split_state_path(path: &str) -> Result<Vec<&str>, ModelError> {
    let trimmed = path.strip_prefix("state.").unwrap_or(path);
    let segments: Vec<&str> = trimmed.split('.').collect();
    if trimmed.is_empty() || segments.iter().any(|s| s.is_empty()) {
        return Err(ModelError::InvalidStatePath(path.to_string()));
    }
    Ok(segments)
}

/// Infer a schema structurally: objects recurse, arrays are leaves,
/// primitives map to their tag.
pub fn infer_schema(values: &Map<String, Value>) -> BTreeMap<String, TypeTag> {
    let mut schema = BTreeMap::new();
    infer_into(values, "", &mut schema);
    schema
}

fn infer_into(values: &Map<String, Value>, prefix: &str, schema: &mut BTreeMap<String, TypeTag>) {
    for (key, value) in values {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };
        schema.insert(path.clone(), TypeTag::of(value));
        if let Value::Object(children) = value {
            infer_into(children, &path, schema);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn state(values: Value) -> StateDefinition {
        StateDefinition {
            schema: BTreeMap::new(),
            initial_values: values.as_object().cloned().unwrap(),
        }
    }

    #[test]
    fn test_infer_schema_recurses_into_objects_only() {
        let def = state(json!({
            "user": { "name": "Ada", "roles": ["admin"] },
            "count": 3,
            "items": [{ "id": 1 }]
        }));

        let schema = def.effective_schema();
        assert_eq!(schema["user"], TypeTag::Object);
        assert_eq!(schema["user.name"], TypeTag::String);
        assert_eq!(schema["user.roles"], TypeTag::Array);
        assert_eq!(schema["count"], TypeTag::Number);
        assert_eq!(schema["items"], TypeTag::Array);
        assert!(!schema.contains_key("items.id"));
    }

    #[test]
    fn test_declared_schema_wins_over_inference() {
        let mut def = state(json!({ "count": 3 }));
        def.schema.insert("total".to_string(), TypeTag::Number);
        let schema = def.effective_schema();
        assert!(schema.contains_key("total"));
        assert!(!schema.contains_key("count"));
    }

    #[test]
    fn test_set_value_creates_intermediate_objects() {
        let mut def = state(json!({ "metrics": 5 }));
        def.set_value_at_path("state.metrics.cpu.load", json!(0.75)).unwrap();
        assert_eq!(def.value_at_path("metrics.cpu.load"), Some(&json!(0.75)));

        assert!(def.set_value_at_path("state.", json!(1)).is_err());
        assert!(def.set_value_at_path("a..b", json!(1)).is_err());
    }

    #[test]
    fn test_merge_patch_is_recursive_and_null_deletes() {
        let mut def = state(json!({
            "user": { "name": "Ada", "email": "ada@example.com" },
            "stale": true
        }));

        def.merge_state_patch(
            json!({ "user": { "name": "Grace" }, "stale": null, "fresh": [1, 2] })
                .as_object()
                .unwrap(),
        );

        assert_eq!(
            Value::Object(def.initial_values.clone()),
            json!({
                "user": { "name": "Grace", "email": "ada@example.com" },
                "fresh": [1, 2]
            })
        );
    }
}
