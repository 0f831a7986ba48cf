//! # Editor
//!
//! Single-writer editing state: the live document, its history, selection,
//! clipboard and the latest validation findings.
//!
//! Every structural edit goes through [`Editor::apply`]:
//!
//! 1. Apply the mutation to the current document (pure)
//! 2. Skip everything when the result is unchanged
//! 3. Record the previous document in history
//! 4. Mark modified, revalidate, prune the selection
//!
//! State writes from streams and action results bypass history.

use crate::clipboard::{self, Clipboard, ClipboardOperation};
use crate::mutations::{MoveDirection, Mutation, MutationError};
use crate::selection::Selection;
use crate::tree;
use crate::undo_stack::{HistoryStack, DEFAULT_HISTORY_LIMIT};
use screenkit_model::{ComponentNode, ComponentType, ScreenDocument};
use screenkit_validator::{ValidationReport, Validator, ValidatorOptions};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EditorConfig {
    pub history_limit: usize,
    pub validator: ValidatorOptions,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            history_limit: DEFAULT_HISTORY_LIMIT,
            validator: ValidatorOptions::default(),
        }
    }
}

#[derive(Debug)]
pub struct Editor {
    validator: Validator,
    document: Option<ScreenDocument>,
    history: HistoryStack<ScreenDocument>,
    selection: Selection,
    clipboard: Clipboard,
    report: ValidationReport,
    modified: bool,
}

impl Default for Editor {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}

impl Editor {
    pub fn new(config: EditorConfig) -> Self {
        Self {
            validator: Validator::new(config.validator),
            document: None,
            history: HistoryStack::new(config.history_limit),
            selection: Selection::new(),
            clipboard: Clipboard::new(),
            report: ValidationReport::default(),
            modified: false,
        }
    }

    /// Editor with `document` already loaded
    pub fn with_document(config: EditorConfig, document: ScreenDocument) -> Self {
        let mut editor = Self::new(config);
        editor.load(document);
        editor
    }

    // ---- Document lifecycle ----

    /// Replace the working document, resetting history and selection.
    ///
    /// The clipboard survives so nodes can be pasted across documents.
    pub fn load(&mut self, document: ScreenDocument) {
        tracing::debug!(document = %document.id, nodes = document.node_count(), "loaded document");
        self.document = Some(document);
        self.history.clear();
        self.selection.clear();
        self.modified = false;
        self.revalidate();
    }

    pub fn unload(&mut self) {
        self.document = None;
        self.history.clear();
        self.selection.clear();
        self.report = ValidationReport::default();
        self.modified = false;
    }

    /// Replace the working document as one undoable edit (marked modified)
    pub fn stage_document(&mut self, document: ScreenDocument) {
        if self.document.as_ref() == Some(&document) {
            return;
        }
        if let Some(previous) = self.document.replace(document) {
            self.history.record(previous);
        }
        self.modified = true;
        self.after_change();
    }

    pub fn document(&self) -> Option<&ScreenDocument> {
        self.document.as_ref()
    }

    pub fn has_document(&self) -> bool {
        self.document.is_some()
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn mark_saved(&mut self) {
        self.modified = false;
    }

    pub fn findings(&self) -> &ValidationReport {
        &self.report
    }

    pub fn can_publish(&self) -> bool {
        self.document.is_some() && self.report.can_publish()
    }

    pub fn history(&self) -> &HistoryStack<ScreenDocument> {
        &self.history
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn clipboard(&self) -> &Clipboard {
        &self.clipboard
    }

    // ---- Mutation ----

    /// Apply one mutation as a single undo step.
    ///
    /// Returns `Ok(false)` when the mutation changed nothing.
    pub fn apply(&mut self, mutation: Mutation) -> Result<bool, MutationError> {
        let Some(current) = self.document.as_ref() else {
            tracing::error!(mutation = mutation.name(), "mutation issued with no document loaded");
            return Err(MutationError::NoDocument);
        };

        let next = match mutation.apply(current) {
            Ok(next) => next,
            Err(err) => {
                tracing::debug!(mutation = mutation.name(), error = %err, "mutation rejected");
                return Err(err);
            }
        };

        if &next == current {
            tracing::trace!(mutation = mutation.name(), "mutation changed nothing");
            return Ok(false);
        }

        if let Some(previous) = self.document.replace(next) {
            self.history.record(previous);
        }
        self.modified = true;
        self.after_change();

        tracing::debug!(
            mutation = mutation.name(),
            history = self.history.len(),
            "applied mutation"
        );
        Ok(true)
    }

    fn after_change(&mut self) {
        self.revalidate();
        if let Some(document) = &self.document {
            self.selection.prune(&tree::collect_ids(&document.components));
        }
    }

    fn revalidate(&mut self) {
        self.report = match &self.document {
            Some(document) => self.validator.validate(document),
            None => ValidationReport::default(),
        };
    }

    fn current(&self) -> Result<&ScreenDocument, MutationError> {
        self.document.as_ref().ok_or_else(|| {
            tracing::error!("editor operation issued with no document loaded");
            MutationError::NoDocument
        })
    }

    // ---- Components ----

    /// Add a new node at the root, returning its id. The node becomes selected.
    pub fn add_component(
        &mut self,
        kind: ComponentType,
        index: Option<usize>,
    ) -> Result<String, MutationError> {
        self.insert_new(kind, None, index)
    }

    /// Like [`Editor::add_component`] with the type given by name
    pub fn add_component_named(
        &mut self,
        type_name: &str,
        index: Option<usize>,
    ) -> Result<String, MutationError> {
        let kind: ComponentType = type_name.parse()?;
        self.add_component(kind, index)
    }

    /// Append a new node to a container's children
    pub fn add_component_to_parent(
        &mut self,
        kind: ComponentType,
        parent_id: &str,
    ) -> Result<String, MutationError> {
        self.insert_new(kind, Some(parent_id.to_string()), None)
    }

    fn insert_new(
        &mut self,
        kind: ComponentType,
        parent_id: Option<String>,
        index: Option<usize>,
    ) -> Result<String, MutationError> {
        let taken = tree::collect_ids(&self.current()?.components);
        let id = tree::generate_id(kind, &taken);

        self.apply(Mutation::InsertComponents {
            parent_id,
            index,
            components: vec![ComponentNode::new(id.clone(), kind)],
        })?;
        self.selection.select(id.clone());
        Ok(id)
    }

    pub fn delete_component(&mut self, id: &str) -> Result<bool, MutationError> {
        self.apply(Mutation::DeleteComponents {
            ids: vec![id.to_string()],
        })
    }

    pub fn delete_selected_components(&mut self) -> Result<bool, MutationError> {
        if self.selection.is_empty() {
            return Ok(false);
        }
        let ids = self.selection.ids().to_vec();
        self.apply(Mutation::DeleteComponents { ids })
    }

    pub fn move_component(&mut self, id: &str, direction: MoveDirection) -> Result<bool, MutationError> {
        self.apply(Mutation::MoveComponent {
            id: id.to_string(),
            direction,
        })
    }

    pub fn move_component_to_parent(&mut self, id: &str, parent_id: &str) -> Result<bool, MutationError> {
        self.apply(Mutation::MoveToParent {
            id: id.to_string(),
            parent_id: parent_id.to_string(),
        })
    }

    pub fn reorder_component_at_index(
        &mut self,
        id: &str,
        index: usize,
        parent_id: Option<&str>,
    ) -> Result<bool, MutationError> {
        self.apply(Mutation::ReorderComponent {
            id: id.to_string(),
            index,
            parent_id: parent_id.map(str::to_string),
        })
    }

    pub fn update_component_props(
        &mut self,
        id: &str,
        props: Map<String, Value>,
    ) -> Result<bool, MutationError> {
        self.apply(Mutation::UpdateProps {
            id: id.to_string(),
            props,
        })
    }

    pub fn update_component_label(&mut self, id: &str, label: &str) -> Result<bool, MutationError> {
        self.apply(Mutation::UpdateLabel {
            id: id.to_string(),
            label: label.to_string(),
        })
    }

    pub fn update_component_visibility(
        &mut self,
        id: &str,
        visibility: Option<&str>,
    ) -> Result<bool, MutationError> {
        self.apply(Mutation::UpdateVisibility {
            id: id.to_string(),
            visibility: visibility.map(str::to_string),
        })
    }

    // ---- Selection ----

    /// Select a single node. Unknown ids leave the selection untouched.
    pub fn select(&mut self, id: &str) -> bool {
        let known = self
            .document
            .as_ref()
            .map_or(false, |doc| doc.find_component(id).is_some());
        if known {
            self.selection.select(id);
        }
        known
    }

    pub fn toggle_selection(&mut self, id: &str) -> bool {
        let known = self
            .document
            .as_ref()
            .map_or(false, |doc| doc.find_component(id).is_some());
        if known {
            self.selection.toggle(id);
        }
        known
    }

    /// Extend from the primary selection to `id` in depth-first tree order
    pub fn select_range(&mut self, id: &str) {
        if let Some(document) = &self.document {
            let order = document.component_ids();
            self.selection.select_range(&order, id);
        }
    }

    pub fn select_all(&mut self) {
        if let Some(document) = &self.document {
            let order = document.component_ids();
            self.selection.select_all(&order);
        }
    }

    pub fn deselect_all(&mut self) {
        self.selection.clear();
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn selected_ids(&self) -> &[String] {
        self.selection.ids()
    }

    /// The primary selected node
    pub fn selected_component(&self) -> Option<&ComponentNode> {
        let id = self.selection.primary()?;
        self.document.as_ref()?.find_component(id)
    }

    // ---- History ----

    pub fn undo(&mut self) -> bool {
        let Some(live) = self.document.clone() else {
            return false;
        };
        match self.history.undo(live) {
            Some(previous) => {
                self.document = Some(previous);
                self.modified = true;
                self.after_change();
                tracing::debug!(index = self.history.index(), "undo");
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        if self.document.is_none() {
            return false;
        }
        match self.history.redo() {
            Some(next) => {
                self.document = Some(next);
                self.modified = true;
                self.after_change();
                tracing::debug!(index = self.history.index(), "redo");
                true
            }
            None => false,
        }
    }

    // ---- Clipboard ----

    /// Copy the selected nodes, returning how many top-level nodes were taken
    pub fn copy(&mut self) -> usize {
        self.fill_clipboard(ClipboardOperation::Copy)
    }

    /// Copy then delete the selected nodes
    pub fn cut(&mut self) -> Result<usize, MutationError> {
        let count = self.fill_clipboard(ClipboardOperation::Cut);
        if count > 0 {
            let ids = self
                .clipboard
                .components()
                .map(|nodes| nodes.iter().map(|node| node.id.clone()).collect())
                .unwrap_or_default();
            self.apply(Mutation::DeleteComponents { ids })?;
        }
        Ok(count)
    }

    fn fill_clipboard(&mut self, operation: ClipboardOperation) -> usize {
        let Some(document) = &self.document else {
            return 0;
        };
        let selected: HashSet<&str> = self.selection.ids().iter().map(String::as_str).collect();
        let nodes = clipboard::collect_selected(&document.components, &selected);
        if nodes.is_empty() {
            return 0;
        }

        let count = nodes.len();
        self.clipboard.store(nodes, operation);
        tracing::debug!(count, ?operation, "filled clipboard");
        count
    }

    /// Append fresh copies of the clipboard at the root and select them.
    ///
    /// Pasted ids avoid both the live tree and the clipboard's own ids, so a
    /// cut never hands its ids back. The clipboard is emptied after pasting
    /// a cut.
    pub fn paste(&mut self) -> Result<Vec<String>, MutationError> {
        let mut taken = tree::collect_ids(&self.current()?.components);
        let Some(held) = self.clipboard.components().filter(|held| !held.is_empty()) else {
            return Ok(Vec::new());
        };
        taken.extend(tree::collect_ids(held));

        let copies = self.clipboard.instantiate(&mut taken);
        let ids: Vec<String> = copies.iter().map(|node| node.id.clone()).collect();

        self.apply(Mutation::InsertComponents {
            parent_id: None,
            index: None,
            components: copies,
        })?;

        if self.clipboard.operation() == Some(ClipboardOperation::Cut) {
            self.clipboard.clear();
        }
        self.selection.set(ids.clone());
        Ok(ids)
    }

    pub fn duplicate(&mut self) -> Result<Vec<String>, MutationError> {
        if self.copy() == 0 {
            return Ok(Vec::new());
        }
        self.paste()
    }

    // ---- State writes (no history) ----

    /// Write a value at a dotted state path
    pub fn apply_state_update(&mut self, target_path: &str, value: Value) -> Result<(), MutationError> {
        let document = self.document.as_mut().ok_or(MutationError::NoDocument)?;
        document.state.set_value_at_path(target_path, value)?;
        Ok(())
    }

    /// Merge an incremental patch into the state's initial values
    pub fn merge_state_patch(&mut self, patch: &Map<String, Value>) -> Result<(), MutationError> {
        let document = self.document.as_mut().ok_or(MutationError::NoDocument)?;
        document.state.merge_state_patch(patch);
        Ok(())
    }
}
