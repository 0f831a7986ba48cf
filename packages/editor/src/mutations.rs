//! # Document Mutations
//!
//! Structural operations on a screen document, expressed as values.
//!
//! ## Semantics
//!
//! - `apply` is pure: it reads the current document and returns a new one.
//!   A rejected mutation leaves nothing behind.
//! - A result equal to the input is a no-op; the editor records no history
//!   for it.
//!
//! ### Move
//! - `MoveComponent` swaps root-level siblings; a boundary or nested node is
//!   a no-op
//! - `MoveToParent` and `ReorderComponent` detach then attach atomically
//! - Fails if the target is the node itself or one of its descendants
//! - Fails if the target is not a container
//!
//! ### Delete
//! - Removes the node and all descendants, wherever the id occurs

use crate::tree;
use screenkit_model::component::flatten_ids;
use screenkit_model::state::split_state_path;
use screenkit_model::{
    ComponentActionRef, ComponentNode, Layout, ModelError, ScreenAction, ScreenDocument, TypeTag,
};
use screenkit_validator::expression::scan;
use screenkit_validator::{BindingExpression, ExpressionError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoveDirection {
    Up,
    Down,
}

/// Structural edits (each one is a single undo step)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Mutation {
    /// Insert already-built nodes (fresh components, pasted copies)
    InsertComponents {
        parent_id: Option<String>,
        index: Option<usize>,
        components: Vec<ComponentNode>,
    },

    /// Remove nodes and their subtrees
    DeleteComponents { ids: Vec<String> },

    /// Swap a root-level node with its neighbour
    MoveComponent { id: String, direction: MoveDirection },

    /// Move a node to the end of a container's children
    MoveToParent { id: String, parent_id: String },

    /// Move a node to a clamped index under a container, or at the root
    ReorderComponent {
        id: String,
        index: usize,
        parent_id: Option<String>,
    },

    /// Shallow-merge props; `null` clears a prop
    UpdateProps { id: String, props: Map<String, Value> },

    UpdateLabel { id: String, label: String },

    UpdateVisibility { id: String, visibility: Option<String> },

    SetComponentActions {
        id: String,
        actions: Vec<ComponentActionRef>,
    },

    SetComponentBind { id: String, bind: Option<String> },

    SetBinding { target: String, source: String },

    RemoveBinding { target: String },

    /// Declare a state field, optionally with an initial value
    SetStateField {
        path: String,
        tag: TypeTag,
        initial_value: Option<Value>,
    },

    RemoveStateField { path: String },

    SetLayout { layout: Layout },

    SetDisplayName { display_name: String },

    AddScreenAction {
        action: ScreenAction,
        index: Option<usize>,
    },

    RemoveScreenAction { id: String },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MutationError {
    #[error("No document loaded")]
    NoDocument,

    #[error("Node not found: {0}")]
    NodeNotFound(String),

    #[error("Parent not found: {0}")]
    ParentNotFound(String),

    #[error("Would create cycle: {0}")]
    CycleDetected(String),

    #[error("Invalid structure: {0}")]
    InvalidStructure(String),

    #[error("Prop '{prop}' expects {expected}, got {found}")]
    PropType {
        prop: String,
        expected: TypeTag,
        found: TypeTag,
    },

    #[error("State field '{path}' is declared {expected}, got {found}")]
    StateType {
        path: String,
        expected: TypeTag,
        found: TypeTag,
    },

    #[error("Unknown component type: {0}")]
    UnknownComponentType(String),

    #[error("Invalid state path: {0}")]
    InvalidStatePath(String),

    #[error("Invalid binding expression: {0}")]
    InvalidExpression(#[from] ExpressionError),

    #[error("Action not found: {0}")]
    ActionNotFound(String),
}

impl From<ModelError> for MutationError {
    fn from(e: ModelError) -> Self {
        match e {
            ModelError::UnknownComponentType(name) => MutationError::UnknownComponentType(name),
            ModelError::InvalidStatePath(path) => MutationError::InvalidStatePath(path),
        }
    }
}

impl Mutation {
    /// Short name for logs
    pub fn name(&self) -> &'static str {
        match self {
            Mutation::InsertComponents { .. } => "insert_components",
            Mutation::DeleteComponents { .. } => "delete_components",
            Mutation::MoveComponent { .. } => "move_component",
            Mutation::MoveToParent { .. } => "move_to_parent",
            Mutation::ReorderComponent { .. } => "reorder_component",
            Mutation::UpdateProps { .. } => "update_props",
            Mutation::UpdateLabel { .. } => "update_label",
            Mutation::UpdateVisibility { .. } => "update_visibility",
            Mutation::SetComponentActions { .. } => "set_component_actions",
            Mutation::SetComponentBind { .. } => "set_component_bind",
            Mutation::SetBinding { .. } => "set_binding",
            Mutation::RemoveBinding { .. } => "remove_binding",
            Mutation::SetStateField { .. } => "set_state_field",
            Mutation::RemoveStateField { .. } => "remove_state_field",
            Mutation::SetLayout { .. } => "set_layout",
            Mutation::SetDisplayName { .. } => "set_display_name",
            Mutation::AddScreenAction { .. } => "add_screen_action",
            Mutation::RemoveScreenAction { .. } => "remove_screen_action",
        }
    }

    /// Apply to a document, producing the next document
    pub fn apply(&self, doc: &ScreenDocument) -> Result<ScreenDocument, MutationError> {
        match self {
            Mutation::InsertComponents {
                parent_id,
                index,
                components,
            } => Self::apply_insert(doc, parent_id.as_deref(), *index, components),

            Mutation::DeleteComponents { ids } => Self::apply_delete(doc, ids),

            Mutation::MoveComponent { id, direction } => Self::apply_move(doc, id, *direction),

            Mutation::MoveToParent { id, parent_id } => {
                Self::apply_reparent(doc, id, Some(parent_id), None)
            }

            Mutation::ReorderComponent {
                id,
                index,
                parent_id,
            } => Self::apply_reparent(doc, id, parent_id.as_deref(), Some(*index)),

            Mutation::UpdateProps { id, props } => Self::apply_update_props(doc, id, props),

            Mutation::UpdateLabel { id, label } => Self::update_node(doc, id, |node| {
                node.label = label.clone();
            }),

            Mutation::UpdateVisibility { id, visibility } => {
                let visibility = visibility.as_ref().filter(|rule| !rule.trim().is_empty());
                if let Some(rule) = visibility {
                    if let Some(Err(err)) = scan(rule).into_iter().find(Result::is_err) {
                        return Err(err.into());
                    }
                }
                Self::update_node(doc, id, |node| {
                    node.visibility = visibility.cloned();
                })
            }

            Mutation::SetComponentActions { id, actions } => {
                let mut seen = HashSet::new();
                if let Some(dup) = actions.iter().find(|a| !seen.insert(a.id.as_str())) {
                    return Err(MutationError::InvalidStructure(format!(
                        "Action id '{}' appears twice",
                        dup.id
                    )));
                }
                Self::update_node(doc, id, |node| {
                    node.actions = actions.clone();
                })
            }

            Mutation::SetComponentBind { id, bind } => {
                if let Some(path) = bind {
                    parse_bind(path)?;
                }
                Self::update_node(doc, id, |node| {
                    node.bind = bind.clone();
                })
            }

            Mutation::SetBinding { target, source } => {
                split_state_path(target)?;
                BindingExpression::parse(source)?;
                let mut next = doc.clone();
                next.bindings.insert(target.clone(), source.clone());
                Ok(next)
            }

            Mutation::RemoveBinding { target } => {
                let mut next = doc.clone();
                next.bindings.remove(target);
                Ok(next)
            }

            Mutation::SetStateField {
                path,
                tag,
                initial_value,
            } => Self::apply_set_state_field(doc, path, *tag, initial_value.as_ref()),

            Mutation::RemoveStateField { path } => Self::apply_remove_state_field(doc, path),

            Mutation::SetLayout { layout } => {
                let mut next = doc.clone();
                next.layout = layout.clone();
                Ok(next)
            }

            Mutation::SetDisplayName { display_name } => {
                let mut next = doc.clone();
                next.display_name = display_name.clone();
                Ok(next)
            }

            Mutation::AddScreenAction { action, index } => {
                if doc.actions.iter().any(|a| a.id == action.id) {
                    return Err(MutationError::InvalidStructure(format!(
                        "Screen action '{}' already exists",
                        action.id
                    )));
                }
                let mut next = doc.clone();
                let at = index.unwrap_or(next.actions.len()).min(next.actions.len());
                next.actions.insert(at, action.clone());
                Ok(next)
            }

            Mutation::RemoveScreenAction { id } => {
                let position = doc
                    .actions
                    .iter()
                    .position(|a| &a.id == id)
                    .ok_or_else(|| MutationError::ActionNotFound(id.clone()))?;
                let mut next = doc.clone();
                next.actions.remove(position);
                Ok(next)
            }
        }
    }

    fn apply_insert(
        doc: &ScreenDocument,
        parent_id: Option<&str>,
        index: Option<usize>,
        components: &[ComponentNode],
    ) -> Result<ScreenDocument, MutationError> {
        let mut taken = tree::collect_ids(&doc.components);
        for id in flatten_ids(components) {
            if id.trim().is_empty() {
                return Err(MutationError::InvalidStructure(
                    "Component id must not be empty".to_string(),
                ));
            }
            if !taken.insert(id.clone()) {
                return Err(MutationError::InvalidStructure(format!(
                    "Component id '{}' already exists",
                    id
                )));
            }
        }

        let next = tree::insert_nodes(&doc.components, parent_id, index, components.to_vec())?;
        Ok(with_components(doc, next))
    }

    fn apply_delete(doc: &ScreenDocument, ids: &[String]) -> Result<ScreenDocument, MutationError> {
        let targets: HashSet<&str> = ids.iter().map(String::as_str).collect();
        let mut removed = Vec::new();
        let next = tree::remove_nodes(&doc.components, &targets, &mut removed);

        if removed.is_empty() {
            return Err(MutationError::NodeNotFound(ids.join(", ")));
        }
        Ok(with_components(doc, next))
    }

    fn apply_move(
        doc: &ScreenDocument,
        id: &str,
        direction: MoveDirection,
    ) -> Result<ScreenDocument, MutationError> {
        let Some(index) = tree::root_index(&doc.components, id) else {
            // nested nodes only move through reparenting
            return match doc.find_component(id) {
                Some(_) => Ok(doc.clone()),
                None => Err(MutationError::NodeNotFound(id.to_string())),
            };
        };

        let neighbour = match direction {
            MoveDirection::Up => index.checked_sub(1),
            MoveDirection::Down => Some(index + 1).filter(|i| *i < doc.components.len()),
        };

        match neighbour {
            Some(other) => {
                let mut components = doc.components.clone();
                components.swap(index, other);
                Ok(with_components(doc, components))
            }
            None => Ok(doc.clone()),
        }
    }

    fn apply_reparent(
        doc: &ScreenDocument,
        id: &str,
        parent_id: Option<&str>,
        index: Option<usize>,
    ) -> Result<ScreenDocument, MutationError> {
        let node = doc
            .find_component(id)
            .ok_or_else(|| MutationError::NodeNotFound(id.to_string()))?;

        if let Some(parent_id) = parent_id {
            if parent_id == id {
                return Err(MutationError::CycleDetected(format!(
                    "'{}' cannot be moved into itself",
                    id
                )));
            }
            if node.contains(parent_id) {
                return Err(MutationError::CycleDetected(format!(
                    "'{}' is inside '{}'",
                    parent_id, id
                )));
            }
            let parent = doc
                .find_component(parent_id)
                .ok_or_else(|| MutationError::ParentNotFound(parent_id.to_string()))?;
            if !parent.is_container() {
                return Err(MutationError::InvalidStructure(format!(
                    "'{}' is a {} and cannot hold children",
                    parent_id, parent.kind
                )));
            }
        }

        let (rest, node) = tree::detach_node(&doc.components, id)?;
        let next = tree::insert_nodes(&rest, parent_id, index, vec![node])?;
        Ok(with_components(doc, next))
    }

    fn apply_update_props(
        doc: &ScreenDocument,
        id: &str,
        props: &Map<String, Value>,
    ) -> Result<ScreenDocument, MutationError> {
        let node = doc
            .find_component(id)
            .ok_or_else(|| MutationError::NodeNotFound(id.to_string()))?;

        if props.contains_key("components") {
            return Err(MutationError::InvalidStructure(
                "Children are edited through tree operations, not props".to_string(),
            ));
        }

        let schema = node.kind.prop_schema();
        for (name, value) in props {
            schema
                .check(name, value)
                .map_err(|expected| MutationError::PropType {
                    prop: name.clone(),
                    expected,
                    found: TypeTag::of(value),
                })?;
        }

        Self::update_node(doc, id, |node| {
            for (name, value) in props {
                if value.is_null() {
                    node.props.values.remove(name);
                } else {
                    node.props.values.insert(name.clone(), value.clone());
                }
            }
        })
    }

    fn apply_set_state_field(
        doc: &ScreenDocument,
        path: &str,
        tag: TypeTag,
        initial_value: Option<&Value>,
    ) -> Result<ScreenDocument, MutationError> {
        let key = split_state_path(path)?.join(".");

        if let Some(value) = initial_value {
            let found = TypeTag::of(value);
            if !value.is_null() && found != tag {
                return Err(MutationError::StateType {
                    path: key,
                    expected: tag,
                    found,
                });
            }
        }

        let mut next = doc.clone();
        next.state.schema.insert(key.clone(), tag);
        if let Some(value) = initial_value {
            next.state.set_value_at_path(&key, value.clone())?;
        }
        Ok(next)
    }

    fn apply_remove_state_field(
        doc: &ScreenDocument,
        path: &str,
    ) -> Result<ScreenDocument, MutationError> {
        let segments = split_state_path(path)?;
        let key = segments.join(".");
        let nested = format!("{}.", key);

        let mut next = doc.clone();
        next.state
            .schema
            .retain(|field, _| field != &key && !field.starts_with(&nested));

        if let Some((last, parents)) = segments.split_last() {
            let mut current = Some(&mut next.state.initial_values);
            for segment in parents {
                current = current
                    .and_then(|map| map.get_mut(*segment))
                    .and_then(Value::as_object_mut);
            }
            if let Some(map) = current {
                map.remove(*last);
            }
        }
        Ok(next)
    }

    /// Locate a node and replace it with an edited copy
    fn update_node<F>(doc: &ScreenDocument, id: &str, edit: F) -> Result<ScreenDocument, MutationError>
    where
        F: Fn(&mut ComponentNode),
    {
        let next = tree::replace_node(&doc.components, id, &mut |node| {
            let mut fresh = node.clone();
            edit(&mut fresh);
            fresh
        })
        .ok_or_else(|| MutationError::NodeNotFound(id.to_string()))?;
        Ok(with_components(doc, next))
    }
}

/// A `bind` is `source.path`, with or without the braces
fn parse_bind(bind: &str) -> Result<BindingExpression, ExpressionError> {
    if bind.contains("{{") || bind.contains("}}") {
        BindingExpression::parse(bind)
    } else {
        BindingExpression::parse(&format!("{{{{{}}}}}", bind.trim()))
    }
}

/// New document sharing everything but the component forest
fn with_components(doc: &ScreenDocument, components: Vec<ComponentNode>) -> ScreenDocument {
    ScreenDocument {
        id: doc.id.clone(),
        display_name: doc.display_name.clone(),
        layout: doc.layout.clone(),
        components,
        actions: doc.actions.clone(),
        bindings: doc.bindings.clone(),
        state: doc.state.clone(),
        metadata: doc.metadata.clone(),
    }
}
