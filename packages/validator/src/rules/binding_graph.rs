use crate::diagnostic::{Finding, FindingKind};
use crate::graph::BindingGraph;
use crate::rules::{RuleContext, ValidationRule};
use screenkit_model::ScreenDocument;

/// Reports every dependency cycle among top-level bindings
pub struct BindingGraphRule;

impl ValidationRule for BindingGraphRule {
    fn name(&self) -> &'static str {
        "binding-graph"
    }

    fn description(&self) -> &'static str {
        "Top-level bindings must not depend on each other in a cycle"
    }

    fn check(&self, document: &ScreenDocument, _ctx: &RuleContext<'_>) -> Vec<Finding> {
        let graph = BindingGraph::from_bindings(&document.bindings);

        graph
            .find_cycles()
            .into_iter()
            .map(|cycle| {
                let first = cycle.first().cloned().unwrap_or_default();
                Finding::error(
                    FindingKind::CircularDependency,
                    format!("bindings.{}", first),
                    format!("Circular dependency: {}", cycle.join(" -> ")),
                )
                .with_suggestion("Break the cycle by binding one of these targets to a value outside it")
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::ValidatorOptions;

    fn run(doc: &ScreenDocument) -> Vec<Finding> {
        let options = ValidatorOptions::default();
        let ctx = RuleContext::new(doc, &options);
        BindingGraphRule.check(doc, &ctx)
    }

    #[test]
    fn test_two_target_cycle_reported_once() {
        let mut doc = ScreenDocument::new("s", "S");
        doc.bindings.insert("a".to_string(), "{{state.b}}".to_string());
        doc.bindings.insert("b".to_string(), "{{state.a}}".to_string());

        let findings = run(&doc);
        assert_eq!(findings.len(), 1);
        assert!(findings[0].is_error());
        assert_eq!(findings[0].message, "Circular dependency: a -> b -> a");
    }

    #[test]
    fn test_chain_without_cycle_is_clean() {
        let mut doc = ScreenDocument::new("s", "S");
        doc.bindings.insert("total".to_string(), "{{state.subtotal}}".to_string());
        doc.bindings.insert("subtotal".to_string(), "{{state.items.sum}}".to_string());

        assert!(run(&doc).is_empty());
    }
}
