use crate::diagnostic::{Finding, FindingKind};
use crate::rules::{RuleContext, ValidationRule};
use screenkit_model::{ActionSpec, ScreenDocument};

/// Actions need a handler, and error routing must point at a sibling action
pub struct ActionReferenceRule;

impl ValidationRule for ActionReferenceRule {
    fn name(&self) -> &'static str {
        "action-references"
    }

    fn description(&self) -> &'static str {
        "Actions must name a handler and route errors to other actions in the same list"
    }

    fn check(&self, document: &ScreenDocument, _ctx: &RuleContext<'_>) -> Vec<Finding> {
        let mut findings = Vec::new();

        let screen: Vec<(String, &ActionSpec)> = document
            .actions
            .iter()
            .map(|a| (format!("actions[{}]", a.id), &a.spec))
            .collect();
        check_list(&screen, &mut findings);

        let mut stack: Vec<_> = document.components.iter().collect();
        while let Some(node) = stack.pop() {
            let list: Vec<(String, &ActionSpec)> = node
                .actions
                .iter()
                .map(|a| (format!("components[{}].actions[{}]", node.id, a.id), &a.spec))
                .collect();
            check_list(&list, &mut findings);
            stack.extend(node.children().iter().rev());
        }

        findings
    }
}

fn check_list(actions: &[(String, &ActionSpec)], findings: &mut Vec<Finding>) {
    for (index, (path, spec)) in actions.iter().enumerate() {
        if spec.handler.trim().is_empty() {
            findings.push(Finding::error(
                FindingKind::InvalidActionReference,
                format!("{}.handler", path),
                "Action has no handler",
            ));
        }

        for &target in &spec.on_error_action_indexes {
            if target == index {
                findings.push(Finding::error(
                    FindingKind::InvalidActionReference,
                    format!("{}.onErrorActionIndexes", path),
                    format!("Action routes its own errors to itself (index {})", target),
                ));
            } else if target >= actions.len() {
                findings.push(
                    Finding::error(
                        FindingKind::InvalidActionReference,
                        format!("{}.onErrorActionIndexes", path),
                        format!(
                            "Error handler index {} is out of range ({} actions)",
                            target,
                            actions.len()
                        ),
                    )
                    .with_suggestion(format!("Use an index below {}", actions.len())),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::ValidatorOptions;
    use screenkit_model::{ComponentActionRef, ComponentNode, ComponentType, ScreenAction};

    fn run(doc: &ScreenDocument) -> Vec<Finding> {
        let options = ValidatorOptions::default();
        let ctx = RuleContext::new(doc, &options);
        ActionReferenceRule.check(doc, &ctx)
    }

    #[test]
    fn test_valid_error_routing_passes() {
        let mut doc = ScreenDocument::new("s", "S");
        let mut save = ActionSpec::new("orders.save");
        save.on_error_action_indexes = vec![1];
        doc.actions.push(ScreenAction::new("save", save));
        doc.actions.push(ScreenAction::new("notify", ActionSpec::new("toast.error")));

        assert!(run(&doc).is_empty());
    }

    #[test]
    fn test_bad_references_are_errors() {
        let mut spec = ActionSpec::new("");
        spec.on_error_action_indexes = vec![0, 4];

        let mut button = ComponentNode::new("button_1", ComponentType::Button);
        button.actions.push(ComponentActionRef::new("click", spec));

        let mut doc = ScreenDocument::new("s", "S");
        doc.components
            .push(ComponentNode::new("form_1", ComponentType::Form).with_child(button));

        let findings = run(&doc);
        assert_eq!(findings.len(), 3);
        assert!(findings.iter().all(|f| f.is_error()));
        assert_eq!(findings[0].path, "components[button_1].actions[click].handler");
    }
}
