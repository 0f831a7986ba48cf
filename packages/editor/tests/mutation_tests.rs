//! Editor operations exercised through the public API

use screenkit_editor::{ClipboardOperation, Editor, EditorConfig, MoveDirection, MutationError};
use screenkit_model::component::flatten_ids;
use screenkit_model::{ActionSpec, ComponentActionRef, ComponentType, ScreenDocument};
use serde_json::json;
use std::collections::HashSet;

fn editor() -> Editor {
    Editor::with_document(EditorConfig::default(), ScreenDocument::new("orders", "Orders"))
}

fn root_ids(editor: &Editor) -> Vec<String> {
    editor
        .document()
        .unwrap()
        .components
        .iter()
        .map(|c| c.id.clone())
        .collect()
}

#[test]
fn test_containers_start_with_children_slot() {
    let mut editor = editor();
    let form = editor.add_component(ComponentType::Form, None).unwrap();
    let accordion = editor.add_component(ComponentType::Accordion, None).unwrap();

    let doc = editor.document().unwrap();
    let form = doc.find_component(&form).unwrap();
    assert_eq!(form.props.components, Some(vec![]));

    let accordion = doc.find_component(&accordion).unwrap();
    assert_eq!(accordion.props.get("sections"), Some(&json!([{ "title": "Section 1" }])));
}

#[test]
fn test_ids_are_unique_across_nesting() {
    let mut editor = editor();
    let row = editor.add_component(ComponentType::Row, None).unwrap();
    let inner = editor.add_component_to_parent(ComponentType::Text, &row).unwrap();
    let outer = editor.add_component(ComponentType::Text, None).unwrap();

    assert_eq!(inner, "text_1");
    assert_eq!(outer, "text_2");
}

#[test]
fn test_add_at_index_and_unknown_type() {
    let mut editor = editor();
    editor.add_component(ComponentType::Text, None).unwrap();
    editor.add_component(ComponentType::Badge, None).unwrap();
    editor.add_component_named("divider", Some(1)).unwrap();
    assert_eq!(root_ids(&editor), vec!["text_1", "divider_1", "badge_1"]);

    assert_eq!(
        editor.add_component_named("carousel", None),
        Err(MutationError::UnknownComponentType("carousel".to_string()))
    );
}

#[test]
fn test_add_to_leaf_parent_fails() {
    let mut editor = editor();
    let text = editor.add_component(ComponentType::Text, None).unwrap();
    let result = editor.add_component_to_parent(ComponentType::Button, &text);
    assert!(matches!(result, Err(MutationError::InvalidStructure(_))));

    let result = editor.add_component_to_parent(ComponentType::Button, "nowhere");
    assert!(matches!(result, Err(MutationError::ParentNotFound(_))));
    assert_eq!(editor.document().unwrap().node_count(), 1);
}

#[test]
fn test_delete_removes_subtree() {
    let mut editor = editor();
    let column = editor.add_component(ComponentType::Column, None).unwrap();
    let row = editor.add_component_to_parent(ComponentType::Row, &column).unwrap();
    editor.add_component_to_parent(ComponentType::Button, &row).unwrap();
    editor.add_component(ComponentType::Text, None).unwrap();
    assert_eq!(editor.document().unwrap().node_count(), 4);

    editor.delete_component(&row).unwrap();
    assert_eq!(editor.document().unwrap().node_count(), 2);

    assert!(matches!(
        editor.delete_component(&row),
        Err(MutationError::NodeNotFound(_))
    ));
}

#[test]
fn test_delete_selected_components() {
    let mut editor = editor();
    let a = editor.add_component(ComponentType::Text, None).unwrap();
    let b = editor.add_component(ComponentType::Text, None).unwrap();
    let c = editor.add_component(ComponentType::Text, None).unwrap();

    editor.select(&a);
    editor.toggle_selection(&c);
    assert!(editor.delete_selected_components().unwrap());
    assert_eq!(root_ids(&editor), vec![b]);
    assert!(editor.selected_ids().is_empty());
    assert!(editor.selected_component().is_none());

    assert!(!editor.delete_selected_components().unwrap());
}

#[test]
fn test_move_up_and_down() {
    let mut editor = editor();
    let a = editor.add_component(ComponentType::Text, None).unwrap();
    let b = editor.add_component(ComponentType::Badge, None).unwrap();

    assert!(editor.move_component(&b, MoveDirection::Up).unwrap());
    assert_eq!(root_ids(&editor), vec![b.clone(), a.clone()]);

    assert!(!editor.move_component(&a, MoveDirection::Down).unwrap());
    assert!(matches!(
        editor.move_component("ghost", MoveDirection::Up),
        Err(MutationError::NodeNotFound(_))
    ));
}

#[test]
fn test_reorder_into_container_and_back() {
    let mut editor = editor();
    let form = editor.add_component(ComponentType::Form, None).unwrap();
    let first = editor.add_component_to_parent(ComponentType::Input, &form).unwrap();
    let text = editor.add_component(ComponentType::Text, None).unwrap();

    editor.reorder_component_at_index(&text, 0, Some(&form)).unwrap();
    let children: Vec<_> = editor
        .document()
        .unwrap()
        .find_component(&form)
        .unwrap()
        .children()
        .iter()
        .map(|c| c.id.clone())
        .collect();
    assert_eq!(children, vec![text.clone(), first.clone()]);
    assert_eq!(root_ids(&editor), vec![form.clone()]);

    editor.reorder_component_at_index(&first, 0, None).unwrap();
    assert_eq!(root_ids(&editor), vec![first, form]);
}

#[test]
fn test_move_into_own_descendant_is_rejected() {
    let mut editor = editor();
    let outer = editor.add_component(ComponentType::Column, None).unwrap();
    let inner = editor.add_component_to_parent(ComponentType::Row, &outer).unwrap();
    let history = editor.history().len();

    assert!(matches!(
        editor.move_component_to_parent(&outer, &inner),
        Err(MutationError::CycleDetected(_))
    ));
    assert!(matches!(
        editor.reorder_component_at_index(&outer, 0, Some(&outer)),
        Err(MutationError::CycleDetected(_))
    ));
    assert_eq!(editor.history().len(), history);
}

#[test]
fn test_update_props_label_visibility() {
    let mut editor = editor();
    let button = editor.add_component(ComponentType::Button, None).unwrap();

    let props = json!({ "text": "Submit", "disabled": "{{state.form.locked}}" });
    editor
        .update_component_props(&button, props.as_object().cloned().unwrap())
        .unwrap();
    editor.update_component_label(&button, "Submit button").unwrap();
    editor
        .update_component_visibility(&button, Some("{{state.form.visible}}"))
        .unwrap();

    let node = editor.document().unwrap().find_component(&button).unwrap();
    assert_eq!(node.props.get("text"), Some(&json!("Submit")));
    assert_eq!(node.label, "Submit button");
    assert_eq!(node.visibility.as_deref(), Some("{{state.form.visible}}"));

    let result = editor.update_component_visibility(&button, Some("{{state.form.visible"));
    assert!(matches!(result, Err(MutationError::InvalidExpression(_))));

    editor.update_component_visibility(&button, None).unwrap();
    let node = editor.document().unwrap().find_component(&button).unwrap();
    assert!(node.visibility.is_none());
}

#[test]
fn test_select_range_follows_tree_order() {
    let mut editor = editor();
    let a = editor.add_component(ComponentType::Text, None).unwrap();
    let row = editor.add_component(ComponentType::Row, None).unwrap();
    let nested = editor.add_component_to_parent(ComponentType::Badge, &row).unwrap();
    let last = editor.add_component(ComponentType::Divider, None).unwrap();

    editor.select(&a);
    editor.select_range(&last);
    assert_eq!(editor.selected_ids(), [a, row, nested, last.clone()]);
    assert_eq!(editor.selected_component().unwrap().id, last);

    editor.deselect_all();
    assert!(editor.selected_ids().is_empty());

    editor.select_all();
    assert_eq!(editor.selected_ids().len(), 4);
}

#[test]
fn test_cut_paste_keeps_node_count_with_new_ids() {
    let mut editor = editor();
    let row = editor.add_component(ComponentType::Row, None).unwrap();
    editor.add_component_to_parent(ComponentType::Button, &row).unwrap();
    editor.add_component(ComponentType::Text, None).unwrap();
    let count = editor.document().unwrap().node_count();

    editor.select(&row);
    assert_eq!(editor.cut().unwrap(), 1);
    assert_eq!(editor.clipboard().operation(), Some(ClipboardOperation::Cut));
    assert_eq!(editor.document().unwrap().node_count(), count - 2);
    let cut_ids: HashSet<String> = flatten_ids(editor.clipboard().components().unwrap())
        .into_iter()
        .collect();
    assert_eq!(cut_ids.len(), 2);

    let pasted = editor.paste().unwrap();
    assert_eq!(editor.document().unwrap().node_count(), count);
    assert_eq!(pasted.len(), 1);
    assert_eq!(editor.selected_ids(), pasted.as_slice());
    assert!(editor.clipboard().is_empty());

    let ids = editor.document().unwrap().component_ids();
    let unique: HashSet<_> = ids.iter().collect();
    assert_eq!(unique.len(), ids.len());

    // the pasted subtree reuses none of the cut ids
    let pasted_root = editor.document().unwrap().find_component(&pasted[0]).unwrap();
    let pasted_ids = flatten_ids(std::slice::from_ref(pasted_root));
    assert_eq!(pasted_ids.len(), 2);
    assert!(pasted_ids.iter().all(|id| !cut_ids.contains(id)));
}

#[test]
fn test_cut_then_paste_single_node_gets_new_id() {
    let mut editor = editor();
    let first = editor.add_component(ComponentType::Text, None).unwrap();
    editor.add_component(ComponentType::Text, None).unwrap();

    editor.select(&first);
    editor.cut().unwrap();
    let pasted = editor.paste().unwrap();

    assert_eq!(editor.document().unwrap().node_count(), 2);
    assert_eq!(pasted, vec!["text_3"]);
    assert_ne!(pasted[0], first);
}

#[test]
fn test_copy_paste_is_repeatable() {
    let mut editor = editor();
    let badge = editor.add_component(ComponentType::Badge, None).unwrap();
    editor.select(&badge);
    assert_eq!(editor.copy(), 1);

    let first = editor.paste().unwrap();
    let second = editor.paste().unwrap();
    assert_eq!(first, vec!["badge_2"]);
    assert_eq!(second, vec!["badge_3"]);
    assert!(!editor.clipboard().is_empty());
}

#[test]
fn test_clipboard_survives_delete_of_original() {
    let mut editor = editor();
    let text = editor.add_component(ComponentType::Text, None).unwrap();
    editor
        .update_component_label(&text, "Greeting")
        .unwrap();
    editor.select(&text);
    editor.copy();
    editor.delete_component(&text).unwrap();
    assert!(!editor.clipboard().is_empty());

    let pasted = editor.paste().unwrap();
    assert_ne!(pasted[0], text);
    let node = editor.document().unwrap().find_component(&pasted[0]).unwrap();
    assert_eq!(node.label, "Greeting");
}

#[test]
fn test_paste_rewrites_action_ids() {
    let mut editor = editor();
    let button = editor.add_component(ComponentType::Button, None).unwrap();
    editor
        .apply(screenkit_editor::Mutation::SetComponentActions {
            id: button.clone(),
            actions: vec![ComponentActionRef::new(
                format!("submit__{}", button),
                ActionSpec::new("orders.submit"),
            )],
        })
        .unwrap();

    editor.select(&button);
    let copies = editor.duplicate().unwrap();
    let copy = editor.document().unwrap().find_component(&copies[0]).unwrap();
    assert_eq!(copy.actions[0].id, format!("submit__{}", copies[0]));
    assert_eq!(copy.actions[0].spec.handler, "orders.submit");
}

#[test]
fn test_copy_with_nothing_selected() {
    let mut editor = editor();
    editor.add_component(ComponentType::Text, None).unwrap();
    assert_eq!(editor.copy(), 0);
    assert_eq!(editor.paste().unwrap(), Vec::<String>::new());
    assert_eq!(editor.duplicate().unwrap(), Vec::<String>::new());
}
