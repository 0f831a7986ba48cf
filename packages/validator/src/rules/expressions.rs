use crate::diagnostic::{Finding, FindingKind};
use crate::expression::{scan, BindingExpression, BindingSource, ExpressionError};
use crate::rules::{RuleContext, ValidationRule};
use screenkit_model::{
    walk_component, ComponentActionRef, ComponentNode, ScreenAction, ScreenDocument, Visitor,
};
use serde_json::Value;

/// Checks every binding expression in the document.
///
/// String leaves of component props, visibility rules, `bind` paths, action
/// payload templates and `runIf` conditions are scanned; top-level binding
/// sources must be exactly one expression.
pub struct ExpressionRule;

impl ValidationRule for ExpressionRule {
    fn name(&self) -> &'static str {
        "expressions"
    }

    fn description(&self) -> &'static str {
        "Binding expressions must parse and reference known state and context fields"
    }

    fn check(&self, document: &ScreenDocument, ctx: &RuleContext<'_>) -> Vec<Finding> {
        let mut checker = ExpressionChecker {
            ctx,
            findings: Vec::new(),
        };
        checker.visit_document(document);
        checker.findings
    }
}

struct ExpressionChecker<'r, 'a> {
    ctx: &'r RuleContext<'a>,
    findings: Vec<Finding>,
}

impl ExpressionChecker<'_, '_> {
    fn check_text(&mut self, path: &str, text: &str) {
        for parsed in scan(text) {
            self.check_parsed(path, parsed);
        }
    }

    fn check_value(&mut self, path: &str, value: &Value) {
        match value {
            Value::String(text) => self.check_text(path, text),
            Value::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    self.check_value(&format!("{}[{}]", path, i), item);
                }
            }
            Value::Object(map) => {
                for (key, item) in map {
                    self.check_value(&format!("{}.{}", path, key), item);
                }
            }
            _ => {}
        }
    }

    fn check_parsed(&mut self, path: &str, parsed: Result<BindingExpression, ExpressionError>) {
        match parsed {
            Ok(expr) => self.check_expression(path, &expr),
            Err(err) => self.findings.push(
                Finding::error(FindingKind::InvalidExpression, path, err.to_string())
                    .with_suggestion("Use the form {{source.path}} with source state, context, inputs or trace_id"),
            ),
        }
    }

    fn check_expression(&mut self, path: &str, expr: &BindingExpression) {
        match expr.source {
            BindingSource::State => {
                if !self.ctx.schema.contains(&expr.path) {
                    self.findings.push(
                        Finding::warning(
                            FindingKind::BindingNotFound,
                            path,
                            format!("State path '{}' is not declared in the state schema", expr.path_string()),
                        )
                        .with_suggestion(format!("Add '{}' to the state schema", expr.path_string())),
                    );
                }
            }
            BindingSource::Context => {
                let field = expr.path.first().map(String::as_str).unwrap_or("");
                if !self.ctx.is_context_field(field) {
                    self.findings.push(
                        Finding::warning(
                            FindingKind::UnknownContextField,
                            path,
                            format!("Unknown context field '{}'", field),
                        )
                        .with_suggestion(format!(
                            "Available context fields: {}",
                            self.ctx.options.context_fields.join(", ")
                        )),
                    );
                }
            }
            BindingSource::Inputs | BindingSource::TraceId => {}
        }
    }

    fn check_bind(&mut self, path: &str, bind: &str) {
        if bind.contains("{{") || bind.contains("}}") {
            self.check_text(path, bind);
        } else {
            let parsed = BindingExpression::parse(&format!("{{{{{}}}}}", bind.trim()));
            self.check_parsed(path, parsed);
        }
    }
}

impl Visitor for ExpressionChecker<'_, '_> {
    fn visit_component(&mut self, component: &ComponentNode) {
        let base = format!("components[{}]", component.id);

        for (key, value) in &component.props.values {
            self.check_value(&format!("{}.props.{}", base, key), value);
        }
        if let Some(rule) = &component.visibility {
            self.check_text(&format!("{}.visibility", base), rule);
        }
        if let Some(bind) = &component.bind {
            self.check_bind(&format!("{}.bind", base), bind);
        }

        walk_component(self, component);
    }

    fn visit_component_action(
        &mut self,
        owner: &ComponentNode,
        _index: usize,
        action: &ComponentActionRef,
    ) {
        let base = format!("components[{}].actions[{}]", owner.id, action.id);
        for (key, value) in &action.spec.payload_template {
            self.check_value(&format!("{}.payloadTemplate.{}", base, key), value);
        }
        if let Some(condition) = &action.spec.run_if {
            self.check_text(&format!("{}.runIf", base), condition);
        }
    }

    fn visit_screen_action(&mut self, _index: usize, action: &ScreenAction) {
        let base = format!("actions[{}]", action.id);
        for (key, value) in &action.spec.payload_template {
            self.check_value(&format!("{}.payloadTemplate.{}", base, key), value);
        }
        if let Some(condition) = &action.spec.run_if {
            self.check_text(&format!("{}.runIf", base), condition);
        }
    }

    fn visit_binding(&mut self, target: &str, source: &str) {
        let path = format!("bindings.{}", target);
        let parsed = BindingExpression::parse(source);
        self.check_parsed(&path, parsed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::Severity;
    use crate::validator::ValidatorOptions;
    use screenkit_model::{ActionSpec, ComponentType, TypeTag};
    use serde_json::json;

    fn run(doc: &ScreenDocument) -> Vec<Finding> {
        let options = ValidatorOptions::default();
        let ctx = RuleContext::new(doc, &options);
        ExpressionRule.check(doc, &ctx)
    }

    fn document() -> ScreenDocument {
        let mut doc = ScreenDocument::new("orders", "Orders");
        doc.state
            .schema
            .insert("user.name".to_string(), TypeTag::String);
        doc
    }

    #[test]
    fn test_malformed_prop_expression_is_error() {
        let mut doc = document();
        doc.components.push(
            ComponentNode::new("text_1", ComponentType::Text).with_prop("content", json!("{{state.items[0]}}")),
        );

        let findings = run(&doc);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Error);
        assert_eq!(findings[0].kind, FindingKind::InvalidExpression);
        assert_eq!(findings[0].path, "components[text_1].props.content");
    }

    #[test]
    fn test_missing_state_path_is_warning() {
        let mut doc = document();
        doc.components.push(
            ComponentNode::new("text_1", ComponentType::Text)
                .with_prop("content", json!("Hi {{state.user.name}}, {{state.user.email}}")),
        );

        let findings = run(&doc);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].kind, FindingKind::BindingNotFound);
        assert_eq!(findings[0].severity, Severity::Warning);
    }

    #[test]
    fn test_unknown_context_field_is_warning() {
        let mut doc = document();
        doc.actions.push(ScreenAction::new(
            "load",
            ActionSpec::new("orders.load")
                .with_payload("tenant", json!("{{context.tenant_id}}"))
                .with_payload("secret", json!({"nested": ["{{context.api_key}}"]})),
        ));

        let findings = run(&doc);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].kind, FindingKind::UnknownContextField);
        assert_eq!(findings[0].path, "actions[load].payloadTemplate.secret.nested[0]");
    }

    #[test]
    fn test_nested_component_actions_and_bind_are_scanned() {
        let mut button = ComponentNode::new("button_1", ComponentType::Button);
        let mut spec = ActionSpec::new("orders.save").with_payload("id", json!("{{inputs.order_id}}"));
        spec.run_if = Some("{{state.missing}}".to_string());
        button.actions.push(ComponentActionRef::new("save", spec));

        let mut input = ComponentNode::new("input_1", ComponentType::Input);
        input.bind = Some("state.user.name".to_string());

        let mut doc = document();
        doc.components.push(
            ComponentNode::new("form_1", ComponentType::Form)
                .with_child(button)
                .with_child(input),
        );

        let findings = run(&doc);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].path, "components[button_1].actions[save].runIf");
    }

    #[test]
    fn test_binding_source_must_be_single_expression() {
        let mut doc = document();
        doc.bindings
            .insert("greeting".to_string(), "Hello {{state.user.name}}".to_string());

        let findings = run(&doc);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].path, "bindings.greeting");
        assert!(findings[0].is_error());
    }
}
