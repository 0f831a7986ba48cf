//! Copy/cut/paste buffer.
//!
//! The clipboard holds deep copies, so later edits (deletes included) never
//! reach it. Deleting the copied node leaves the entry in place: a cut has
//! already removed its originals and still needs to paste them, and a copy
//! behaves the same so the two only differ in what happens to the source.
//! Pasted copies get fresh ids for every node in the subtree, distinct from
//! the ids the clipboard itself holds, and rewritten action ids.

use crate::tree;
use screenkit_model::{ComponentActionRef, ComponentNode};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipboardOperation {
    Copy,
    Cut,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Clipboard {
    components: Option<Vec<ComponentNode>>,
    operation: Option<ClipboardOperation>,
}

impl Clipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&mut self, components: Vec<ComponentNode>, operation: ClipboardOperation) {
        self.components = Some(components);
        self.operation = Some(operation);
    }

    pub fn components(&self) -> Option<&[ComponentNode]> {
        self.components.as_deref()
    }

    pub fn operation(&self) -> Option<ClipboardOperation> {
        self.operation
    }

    pub fn is_empty(&self) -> bool {
        self.components.as_ref().map_or(true, Vec::is_empty)
    }

    pub fn clear(&mut self) {
        self.components = None;
        self.operation = None;
    }

    /// Fresh copies of the stored nodes with ids unique against `taken`.
    ///
    /// Generated ids are added to `taken`.
    pub fn instantiate(&self, taken: &mut HashSet<String>) -> Vec<ComponentNode> {
        self.components
            .iter()
            .flatten()
            .map(|node| regenerate_ids(node, taken))
            .collect()
    }
}

/// Top-most selected nodes in tree order.
///
/// A node whose ancestor is also selected travels with that ancestor.
pub fn collect_selected(nodes: &[ComponentNode], selected: &HashSet<&str>) -> Vec<ComponentNode> {
    let mut found = Vec::new();
    let mut stack: Vec<&ComponentNode> = nodes.iter().rev().collect();
    while let Some(node) = stack.pop() {
        if selected.contains(node.id.as_str()) {
            found.push(node.clone());
        } else {
            stack.extend(node.children().iter().rev());
        }
    }
    found
}

/// Deep copy of `node` with a new id everywhere in the subtree
pub fn regenerate_ids(node: &ComponentNode, taken: &mut HashSet<String>) -> ComponentNode {
    let id = tree::generate_id(node.kind, taken);
    taken.insert(id.clone());

    let mut copy = node.clone();
    copy.actions = node
        .actions
        .iter()
        .map(|action| ComponentActionRef {
            id: rewrite_action_id(&action.id, &id),
            ..action.clone()
        })
        .collect();
    copy.id = id;

    if let Some(children) = copy.children_mut() {
        let fresh: Vec<ComponentNode> = children
            .iter()
            .map(|child| regenerate_ids(child, taken))
            .collect();
        *children = fresh;
    }
    copy
}

/// `submit__button_1` pasted as `button_4` becomes `submit__button_4`
fn rewrite_action_id(action_id: &str, node_id: &str) -> String {
    let prefix = action_id
        .rsplit_once("__")
        .map(|(prefix, _)| prefix)
        .unwrap_or(action_id);
    format!("{}__{}", prefix, node_id)
}
