use crate::action::{ComponentActionRef, ScreenAction};
use crate::component::ComponentNode;
use crate::document::ScreenDocument;

/// Visitor pattern for traversing a screen document immutably
///
/// Default implementations walk the entire tree. Override specific visit_*
/// methods to act on the nodes you care about.
pub trait Visitor: Sized {
    fn visit_document(&mut self, doc: &ScreenDocument) {
        walk_document(self, doc);
    }

    fn visit_component(&mut self, component: &ComponentNode) {
        walk_component(self, component);
    }

    fn visit_component_action(
        &mut self,
        _owner: &ComponentNode,
        _index: usize,
        _action: &ComponentActionRef,
    ) {
        // Leaf node, no children to walk
    }

    fn visit_screen_action(&mut self, _index: usize, _action: &ScreenAction) {
        // Leaf node, no children to walk
    }

    fn visit_binding(&mut self, _target: &str, _source: &str) {
        // Leaf node, no children to walk
    }
}

pub fn walk_document<V: Visitor>(visitor: &mut V, doc: &ScreenDocument) {
    for component in &doc.components {
        visitor.visit_component(component);
    }
    for (index, action) in doc.actions.iter().enumerate() {
        visitor.visit_screen_action(index, action);
    }
    for (target, source) in &doc.bindings {
        visitor.visit_binding(target, source);
    }
}

pub fn walk_component<V: Visitor>(visitor: &mut V, component: &ComponentNode) {
    for (index, action) in component.actions.iter().enumerate() {
        visitor.visit_component_action(component, index, action);
    }
    for child in component.children() {
        visitor.visit_component(child);
    }
}
