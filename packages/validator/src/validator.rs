use crate::diagnostic::{Finding, Severity};
use crate::rules::{RuleContext, RuleRegistry};
use screenkit_model::ScreenDocument;
use serde::{Deserialize, Serialize};

/// Context fields a binding may read when nothing else is configured
pub const DEFAULT_CONTEXT_FIELDS: [&str; 4] = ["user_id", "user_email", "tenant_id", "permissions"];

/// Options for configuring the validator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ValidatorOptions {
    /// Allow-list for `{{context.*}}` expressions
    pub context_fields: Vec<String>,

    /// Emit naming-convention warnings
    pub naming_conventions: bool,
}

impl Default for ValidatorOptions {
    fn default() -> Self {
        Self {
            context_fields: DEFAULT_CONTEXT_FIELDS.iter().map(|f| f.to_string()).collect(),
            naming_conventions: true,
        }
    }
}

/// Flat list of findings for one document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub findings: Vec<Finding>,
}

impl ValidationReport {
    pub fn errors(&self) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(|f| f.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(|f| f.severity == Severity::Warning)
    }

    pub fn error_count(&self) -> usize {
        self.errors().count()
    }

    pub fn warning_count(&self) -> usize {
        self.warnings().count()
    }

    /// Publishing is allowed only without error findings
    pub fn can_publish(&self) -> bool {
        self.error_count() == 0
    }

    pub fn is_empty(&self) -> bool {
        self.findings.is_empty()
    }
}

/// Runs a rule registry over documents
#[derive(Debug, Default)]
pub struct Validator {
    options: ValidatorOptions,
    registry: RuleRegistry,
}

impl Validator {
    pub fn new(options: ValidatorOptions) -> Self {
        Self {
            options,
            registry: RuleRegistry::new(),
        }
    }

    pub fn with_registry(options: ValidatorOptions, registry: RuleRegistry) -> Self {
        Self { options, registry }
    }

    pub fn options(&self) -> &ValidatorOptions {
        &self.options
    }

    pub fn validate(&self, document: &ScreenDocument) -> ValidationReport {
        let ctx = RuleContext::new(document, &self.options);
        let mut findings = Vec::new();

        for rule in self.registry.rules() {
            let found = rule.check(document, &ctx);
            if !found.is_empty() {
                tracing::trace!(rule = rule.name(), count = found.len(), "rule reported findings");
            }
            findings.extend(found);
        }

        let report = ValidationReport { findings };
        tracing::debug!(
            document = %document.id,
            errors = report.error_count(),
            warnings = report.warning_count(),
            "validated document"
        );
        report
    }
}

/// Validate a screen document with the built-in rules
pub fn validate_document(document: &ScreenDocument, options: &ValidatorOptions) -> ValidationReport {
    Validator::new(options.clone()).validate(document)
}
