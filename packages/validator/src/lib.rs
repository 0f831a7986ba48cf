//! # Screenkit binding validator
//!
//! Checks the cross-references inside a screen document:
//!
//! - binding expressions (`{{source.path}}`) are well formed
//! - `state.*` paths exist in the (declared or inferred) state schema
//! - `context.*` paths name an allowed context field
//! - top-level bindings contain no dependency cycles
//!
//! Findings are values. Only `error` findings block publishing.

mod diagnostic;
pub mod expression;
pub mod graph;
mod rules;
pub mod schema;
mod validator;

pub use diagnostic::{Finding, FindingKind, Severity};
pub use expression::{BindingExpression, BindingSource, ExpressionError};
pub use graph::{BindingGraph, GraphError};
pub use rules::{
    ActionReferenceRule, BindingGraphRule, ComponentIdRule, ExpressionRule, NamingConventionRule,
    RuleContext, RuleRegistry, ValidationRule,
};
pub use schema::SchemaIndex;
pub use validator::{
    validate_document, ValidationReport, Validator, ValidatorOptions, DEFAULT_CONTEXT_FIELDS,
};
