//! Component tree nodes.
//!
//! Nesting happens through exactly one slot: `props.components` on container
//! types. Everything else in `props` is an open map checked against the
//! per-type [`PropSchema`](crate::props::PropSchema).

use crate::action::ComponentActionRef;
use crate::error::ModelError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Closed set of component kinds the renderer understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentType {
    Text,
    Button,
    Input,
    Select,
    Checkbox,
    Table,
    Chart,
    Badge,
    Tabs,
    Modal,
    Keyvalue,
    Divider,
    Image,
    Markdown,
    Row,
    Column,
    Form,
    Accordion,
}

impl ComponentType {
    pub const ALL: [ComponentType; 18] = [
        ComponentType::Text,
        ComponentType::Button,
        ComponentType::Input,
        ComponentType::Select,
        ComponentType::Checkbox,
        ComponentType::Table,
        ComponentType::Chart,
        ComponentType::Badge,
        ComponentType::Tabs,
        ComponentType::Modal,
        ComponentType::Keyvalue,
        ComponentType::Divider,
        ComponentType::Image,
        ComponentType::Markdown,
        ComponentType::Row,
        ComponentType::Column,
        ComponentType::Form,
        ComponentType::Accordion,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentType::Text => "text",
            ComponentType::Button => "button",
            ComponentType::Input => "input",
            ComponentType::Select => "select",
            ComponentType::Checkbox => "checkbox",
            ComponentType::Table => "table",
            ComponentType::Chart => "chart",
            ComponentType::Badge => "badge",
            ComponentType::Tabs => "tabs",
            ComponentType::Modal => "modal",
            ComponentType::Keyvalue => "keyvalue",
            ComponentType::Divider => "divider",
            ComponentType::Image => "image",
            ComponentType::Markdown => "markdown",
            ComponentType::Row => "row",
            ComponentType::Column => "column",
            ComponentType::Form => "form",
            ComponentType::Accordion => "accordion",
        }
    }

    /// Whether `props.components` holds child nodes for this type
    pub fn is_container(&self) -> bool {
        matches!(
            self,
            ComponentType::Row
                | ComponentType::Column
                | ComponentType::Form
                | ComponentType::Modal
                | ComponentType::Accordion
        )
    }

    /// Human label given to freshly created nodes
    pub fn default_label(&self) -> String {
        let name = self.as_str();
        let mut chars = name.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComponentType {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ComponentType::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ModelError::UnknownComponentType(s.to_string()))
    }
}

/// Props bag: typed child slot plus the open value map
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ComponentProps {
    /// Child nodes (containers only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub components: Option<Vec<ComponentNode>>,

    /// Every other prop, keyed by name
    #[serde(flatten)]
    pub values: BTreeMap<String, Value>,
}

impl ComponentProps {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }
}

/// One node of the screen's component tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentNode {
    pub id: String,

    #[serde(rename = "type")]
    pub kind: ComponentType,

    #[serde(default)]
    pub label: String,

    #[serde(default)]
    pub props: ComponentProps,

    /// Rule expression deciding whether the node renders
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<ComponentActionRef>,

    /// Single state path the node reads and writes (inputs, selects...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bind: Option<String>,
}

impl ComponentNode {
    /// Create a node with the type's default label and props
    pub fn new(id: impl Into<String>, kind: ComponentType) -> Self {
        Self {
            id: id.into(),
            kind,
            label: kind.default_label(),
            props: kind.prop_schema().default_props(),
            visibility: None,
            actions: Vec::new(),
            bind: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_prop(mut self, name: impl Into<String>, value: Value) -> Self {
        self.props.values.insert(name.into(), value);
        self
    }

    /// Append a child (no-op unless the node is a container)
    pub fn with_child(mut self, child: ComponentNode) -> Self {
        if let Some(children) = self.children_mut() {
            children.push(child);
        }
        self
    }

    pub fn is_container(&self) -> bool {
        self.kind.is_container()
    }

    pub fn children(&self) -> &[ComponentNode] {
        self.props.components.as_deref().unwrap_or(&[])
    }

    pub fn children_mut(&mut self) -> Option<&mut Vec<ComponentNode>> {
        if !self.kind.is_container() {
            return None;
        }
        Some(self.props.components.get_or_insert_with(Vec::new))
    }

    /// Whether `id` names this node or any node below it
    pub fn contains(&self, id: &str) -> bool {
        self.id == id || self.children().iter().any(|child| child.contains(id))
    }
}

/// Depth-first, pre-order list of every id in the forest
pub fn flatten_ids(nodes: &[ComponentNode]) -> Vec<String> {
    let mut ids = Vec::new();
    collect_ids(nodes, &mut ids);
    ids
}

fn collect_ids(nodes: &[ComponentNode], ids: &mut Vec<String>) {
    for node in nodes {
        ids.push(node.id.clone());
        collect_ids(node.children(), ids);
    }
}

/// Find a node anywhere in the forest
pub fn find_node<'a>(nodes: &'a [ComponentNode], id: &str) -> Option<&'a ComponentNode> {
    for node in nodes {
        if node.id == id {
            return Some(node);
        }
        if let Some(found) = find_node(node.children(), id) {
            return Some(found);
        }
    }
    None
}

pub fn count_nodes(nodes: &[ComponentNode]) -> usize {
    nodes
        .iter()
        .map(|node| 1 + count_nodes(node.children()))
        .sum()
}
