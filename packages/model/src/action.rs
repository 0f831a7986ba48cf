//! Action bindings.
//!
//! Handlers are opaque identifiers resolved by an external executor. Payload
//! template string leaves may hold binding expressions.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Fields shared by screen-level actions and per-component action refs
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionSpec {
    pub handler: String,

    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub payload_template: Map<String, Value>,

    #[serde(default)]
    pub retry_count: u32,

    #[serde(default)]
    pub retry_delay_ms: u64,

    /// Indexes (in the owning action list) to run when this action fails
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub on_error_action_indexes: Vec<usize>,

    /// Guard expression; the action is skipped when it resolves falsy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_if: Option<String>,
}

impl ActionSpec {
    pub fn new(handler: impl Into<String>) -> Self {
        Self {
            handler: handler.into(),
            ..Self::default()
        }
    }

    pub fn with_payload(mut self, key: impl Into<String>, value: Value) -> Self {
        self.payload_template.insert(key.into(), value);
        self
    }
}

/// Screen-level action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenAction {
    pub id: String,

    #[serde(flatten)]
    pub spec: ActionSpec,
}

impl ScreenAction {
    pub fn new(id: impl Into<String>, spec: ActionSpec) -> Self {
        Self { id: id.into(), spec }
    }
}

/// Action attached to a component event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentActionRef {
    pub id: String,

    /// Component event that fires the action (`click`, `submit`, `change`...)
    #[serde(default = "default_event")]
    pub event: String,

    #[serde(flatten)]
    pub spec: ActionSpec,
}

fn default_event() -> String {
    "click".to_string()
}

impl ComponentActionRef {
    pub fn new(id: impl Into<String>, spec: ActionSpec) -> Self {
        Self {
            id: id.into(),
            event: default_event(),
            spec,
        }
    }
}
