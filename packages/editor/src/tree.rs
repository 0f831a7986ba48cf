//! # Copy-on-write tree operations
//!
//! Every function takes the current forest by reference and returns a new
//! one. The input is never modified, so a snapshot kept in history stays
//! valid after any later edit. A rebuilt node gets a fresh children vector;
//! untouched siblings are cloned.

use crate::mutations::MutationError;
use screenkit_model::{ComponentNode, ComponentProps, ComponentType};
use std::collections::HashSet;

/// `{type}_{n}` with the smallest positive `n` not present in `taken`
pub fn generate_id(kind: ComponentType, taken: &HashSet<String>) -> String {
    (1..)
        .map(|n| format!("{}_{}", kind.as_str(), n))
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or_else(|| format!("{}_{}", kind.as_str(), taken.len() + 1))
}

/// Every id in the forest, nested nodes included
pub fn collect_ids(nodes: &[ComponentNode]) -> HashSet<String> {
    let mut ids = HashSet::new();
    let mut stack: Vec<&ComponentNode> = nodes.iter().collect();
    while let Some(node) = stack.pop() {
        ids.insert(node.id.clone());
        stack.extend(node.children());
    }
    ids
}

/// Copy of `node` with its children replaced
fn with_children(node: &ComponentNode, children: Vec<ComponentNode>) -> ComponentNode {
    ComponentNode {
        id: node.id.clone(),
        kind: node.kind,
        label: node.label.clone(),
        props: ComponentProps {
            components: Some(children),
            values: node.props.values.clone(),
        },
        visibility: node.visibility.clone(),
        actions: node.actions.clone(),
        bind: node.bind.clone(),
    }
}

/// Rebuild the path to `id`, replacing the node with `f(node)`.
///
/// Returns `None` when no node has that id.
pub fn replace_node<F>(nodes: &[ComponentNode], id: &str, f: &mut F) -> Option<Vec<ComponentNode>>
where
    F: FnMut(&ComponentNode) -> ComponentNode,
{
    for (index, node) in nodes.iter().enumerate() {
        let replacement = if node.id == id {
            Some(f(node))
        } else {
            replace_node(node.children(), id, f).map(|children| with_children(node, children))
        };

        if let Some(replacement) = replacement {
            let mut next = nodes.to_vec();
            next[index] = replacement;
            return Some(next);
        }
    }
    None
}

/// Remove every node whose id is in `ids`, wherever it occurs.
///
/// Removed subtrees are appended to `removed` in depth-first order.
pub fn remove_nodes(
    nodes: &[ComponentNode],
    ids: &HashSet<&str>,
    removed: &mut Vec<ComponentNode>,
) -> Vec<ComponentNode> {
    let mut next = Vec::with_capacity(nodes.len());
    for node in nodes {
        if ids.contains(node.id.as_str()) {
            removed.push(node.clone());
        } else if node.is_container() && !node.children().is_empty() {
            let children = remove_nodes(node.children(), ids, removed);
            next.push(with_children(node, children));
        } else {
            next.push(node.clone());
        }
    }
    next
}

/// Detach one node, returning the remaining forest and the detached subtree
pub fn detach_node(
    nodes: &[ComponentNode],
    id: &str,
) -> Result<(Vec<ComponentNode>, ComponentNode), MutationError> {
    let mut removed = Vec::new();
    let ids: HashSet<&str> = [id].into_iter().collect();
    let next = remove_nodes(nodes, &ids, &mut removed);
    match removed.into_iter().next() {
        Some(node) => Ok((next, node)),
        None => Err(MutationError::NodeNotFound(id.to_string())),
    }
}

/// Insert `new_nodes` at `index` (clamped) under `parent_id`, or at the root.
///
/// `None` index appends.
pub fn insert_nodes(
    nodes: &[ComponentNode],
    parent_id: Option<&str>,
    index: Option<usize>,
    new_nodes: Vec<ComponentNode>,
) -> Result<Vec<ComponentNode>, MutationError> {
    let splice = |list: &mut Vec<ComponentNode>, new_nodes: Vec<ComponentNode>| {
        let at = index.unwrap_or(list.len()).min(list.len());
        let tail = list.split_off(at);
        list.extend(new_nodes);
        list.extend(tail);
    };

    let Some(parent_id) = parent_id else {
        let mut next = nodes.to_vec();
        splice(&mut next, new_nodes);
        return Ok(next);
    };

    let parent = screenkit_model::component::find_node(nodes, parent_id)
        .ok_or_else(|| MutationError::ParentNotFound(parent_id.to_string()))?;
    if !parent.is_container() {
        return Err(MutationError::InvalidStructure(format!(
            "'{}' is a {} and cannot hold children",
            parent_id, parent.kind
        )));
    }

    let mut pending = Some(new_nodes);
    replace_node(nodes, parent_id, &mut |parent| {
        let mut children = parent.children().to_vec();
        if let Some(new_nodes) = pending.take() {
            splice(&mut children, new_nodes);
        }
        with_children(parent, children)
    })
    .ok_or_else(|| MutationError::ParentNotFound(parent_id.to_string()))
}

/// Position of a root-level node
pub fn root_index(nodes: &[ComponentNode], id: &str) -> Option<usize> {
    nodes.iter().position(|node| node.id == id)
}
