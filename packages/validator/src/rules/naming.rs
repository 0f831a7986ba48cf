use crate::diagnostic::{Finding, FindingKind};
use crate::graph::normalize_target;
use crate::rules::{RuleContext, ValidationRule};
use once_cell::sync::Lazy;
use regex::Regex;
use screenkit_model::ScreenDocument;

static SEGMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z_][A-Za-z0-9_]*$").expect("naming segment pattern"));

/// State fields and binding targets should be snake_case or camelCase paths
pub struct NamingConventionRule;

impl ValidationRule for NamingConventionRule {
    fn name(&self) -> &'static str {
        "naming-convention"
    }

    fn description(&self) -> &'static str {
        "State fields and binding targets should use lower snake_case or camelCase segments"
    }

    fn check(&self, document: &ScreenDocument, ctx: &RuleContext<'_>) -> Vec<Finding> {
        if !ctx.options.naming_conventions {
            return Vec::new();
        }

        let mut findings = Vec::new();

        for (field, _) in ctx.schema.fields() {
            if !is_conventional(field) {
                findings.push(naming_warning(format!("state.schema.{}", field), field));
            }
        }

        for target in document.bindings.keys() {
            let normalized = normalize_target(target);
            if !is_conventional(&normalized) {
                findings.push(naming_warning(format!("bindings.{}", target), &normalized));
            }
        }

        findings
    }
}

fn is_conventional(path: &str) -> bool {
    path.split('.').all(|segment| SEGMENT.is_match(segment))
}

fn naming_warning(path: String, name: &str) -> Finding {
    Finding::warning(
        FindingKind::NamingConvention,
        path,
        format!("'{}' does not follow the naming convention", name),
    )
    .with_suggestion("Use lower snake_case or camelCase identifiers separated by dots")
}
