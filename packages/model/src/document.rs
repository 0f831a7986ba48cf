//! # Screen document
//!
//! Root aggregate describing one screen. Invariant: every component id in
//! the tree (nested ones included) is unique within the document. The model
//! does not enforce it; the tree engine and the validator do.

use crate::action::ScreenAction;
use crate::component::{count_nodes, find_node, flatten_ids, ComponentNode};
use crate::state::StateDefinition;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Page layout, discriminated by `kind`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Layout {
    Stack {
        #[serde(default)]
        gap: u32,
    },
    Grid {
        columns: u32,
        #[serde(default)]
        gap: u32,
    },
    Split {
        ratio: f64,
    },
    Fullscreen,
}

impl Default for Layout {
    fn default() -> Self {
        Layout::Stack { gap: 16 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenDocument {
    pub id: String,

    #[serde(default)]
    pub display_name: String,

    #[serde(default)]
    pub layout: Layout,

    /// Root-level nodes; containers nest further through `props.components`
    #[serde(default)]
    pub components: Vec<ComponentNode>,

    #[serde(default)]
    pub actions: Vec<ScreenAction>,

    /// target path -> source expression
    #[serde(default)]
    pub bindings: BTreeMap<String, String>,

    #[serde(default)]
    pub state: StateDefinition,

    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

impl ScreenDocument {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            layout: Layout::default(),
            components: Vec::new(),
            actions: Vec::new(),
            bindings: BTreeMap::new(),
            state: StateDefinition::default(),
            metadata: Map::new(),
        }
    }

    /// Every component id, depth-first
    pub fn component_ids(&self) -> Vec<String> {
        flatten_ids(&self.components)
    }

    pub fn find_component(&self, id: &str) -> Option<&ComponentNode> {
        find_node(&self.components, id)
    }

    pub fn node_count(&self) -> usize {
        count_nodes(&self.components)
    }

    /// JSON view of the document keyed by top-level field name.
    ///
    /// Used for whole-field structural comparison.
    pub fn top_level_fields(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::ComponentType;
    use serde_json::json;

    #[test]
    fn test_document_deserializes_with_defaults() {
        let doc: ScreenDocument = serde_json::from_value(json!({
            "id": "screen-1",
            "displayName": "Orders",
            "layout": { "kind": "grid", "columns": 2 },
            "components": [
                { "id": "row_1", "type": "row", "props": { "components": [
                    { "id": "text_1", "type": "text", "props": { "text": "Hi" } }
                ] } }
            ],
            "bindings": { "selected": "{{state.orders}}" },
            "state": { "initialValues": { "orders": [] } }
        }))
        .unwrap();

        assert_eq!(doc.layout, Layout::Grid { columns: 2, gap: 0 });
        assert_eq!(doc.component_ids(), vec!["row_1", "text_1"]);
        assert_eq!(doc.node_count(), 2);
        assert_eq!(doc.find_component("text_1").unwrap().kind, ComponentType::Text);
        assert!(doc.actions.is_empty());
    }

    #[test]
    fn test_top_level_fields_are_camel_case() {
        let doc = ScreenDocument::new("screen-1", "Orders");
        let fields = doc.top_level_fields();
        assert!(fields.contains_key("displayName"));
        assert!(fields.contains_key("components"));
        assert!(fields.contains_key("state"));
        assert_eq!(fields["layout"], json!({ "kind": "stack", "gap": 16 }));
    }
}
