use crate::diagnostic::{Finding, FindingKind};
use crate::rules::{RuleContext, ValidationRule};
use screenkit_model::ScreenDocument;
use std::collections::HashSet;

/// Component ids must be present and unique across the whole tree
pub struct ComponentIdRule;

impl ValidationRule for ComponentIdRule {
    fn name(&self) -> &'static str {
        "component-ids"
    }

    fn description(&self) -> &'static str {
        "Every component id must be non-empty and unique within the document"
    }

    fn check(&self, document: &ScreenDocument, _ctx: &RuleContext<'_>) -> Vec<Finding> {
        let mut findings = Vec::new();
        let mut seen = HashSet::new();
        let mut reported = HashSet::new();

        for id in document.component_ids() {
            if id.trim().is_empty() {
                findings.push(Finding::error(
                    FindingKind::DuplicateId,
                    "components[]",
                    "Component has an empty id",
                ));
                continue;
            }
            if !seen.insert(id.clone()) && reported.insert(id.clone()) {
                findings.push(
                    Finding::error(
                        FindingKind::DuplicateId,
                        format!("components[{}]", id),
                        format!("Component id '{}' is used more than once", id),
                    )
                    .with_suggestion("Paste or duplicate the node instead of copying ids by hand"),
                );
            }
        }

        findings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::ValidatorOptions;
    use screenkit_model::{ComponentNode, ComponentType};

    #[test]
    fn test_nested_duplicate_reported_once() {
        let mut doc = ScreenDocument::new("s", "S");
        doc.components.push(ComponentNode::new("text_1", ComponentType::Text));
        doc.components.push(
            ComponentNode::new("row_1", ComponentType::Row)
                .with_child(ComponentNode::new("text_1", ComponentType::Text))
                .with_child(ComponentNode::new("text_1", ComponentType::Text)),
        );

        let options = ValidatorOptions::default();
        let ctx = RuleContext::new(&doc, &options);
        let findings = ComponentIdRule.check(&doc, &ctx);

        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].path, "components[text_1]");
    }
}
