mod action_refs;
mod binding_graph;
mod component_ids;
mod expressions;
mod naming;

pub use action_refs::ActionReferenceRule;
pub use binding_graph::BindingGraphRule;
pub use component_ids::ComponentIdRule;
pub use expressions::ExpressionRule;
pub use naming::NamingConventionRule;

use crate::diagnostic::Finding;
use crate::schema::SchemaIndex;
use crate::validator::ValidatorOptions;
use screenkit_model::ScreenDocument;

/// Shared inputs every rule can consult
pub struct RuleContext<'a> {
    pub options: &'a ValidatorOptions,

    /// Effective state schema of the document under validation
    pub schema: SchemaIndex,
}

impl<'a> RuleContext<'a> {
    pub fn new(document: &ScreenDocument, options: &'a ValidatorOptions) -> Self {
        Self {
            options,
            schema: SchemaIndex::from_state(&document.state),
        }
    }

    pub fn is_context_field(&self, field: &str) -> bool {
        self.options.context_fields.iter().any(|f| f == field)
    }
}

/// Trait for implementing validation rules
pub trait ValidationRule: Send + Sync {
    /// Unique identifier for this rule
    fn name(&self) -> &'static str;

    /// Human-readable description
    fn description(&self) -> &'static str;

    /// Check the whole document
    fn check(&self, document: &ScreenDocument, ctx: &RuleContext<'_>) -> Vec<Finding>;
}

/// Registry of all available validation rules
pub struct RuleRegistry {
    rules: Vec<Box<dyn ValidationRule>>,
}

impl RuleRegistry {
    /// Create a new registry with all built-in rules
    pub fn new() -> Self {
        Self {
            rules: vec![
                Box::new(ComponentIdRule),
                Box::new(ExpressionRule),
                Box::new(BindingGraphRule),
                Box::new(ActionReferenceRule),
                Box::new(NamingConventionRule),
            ],
        }
    }

    /// Get all registered rules
    pub fn rules(&self) -> &[Box<dyn ValidationRule>] {
        &self.rules
    }

    /// Create an empty registry
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Add a custom rule to the registry
    pub fn add_rule(&mut self, rule: Box<dyn ValidationRule>) {
        self.rules.push(rule);
    }
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleRegistry")
            .field("rules", &format!("{} rules", self.rules.len()))
            .finish()
    }
}
