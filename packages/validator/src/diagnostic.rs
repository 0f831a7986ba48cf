use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity level of a finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// What kind of problem a finding reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FindingKind {
    InvalidExpression,
    BindingNotFound,
    UnknownContextField,
    CircularDependency,
    DuplicateId,
    InvalidActionReference,
    NamingConvention,
}

impl fmt::Display for FindingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FindingKind::InvalidExpression => "invalid-expression",
            FindingKind::BindingNotFound => "binding-not-found",
            FindingKind::UnknownContextField => "unknown-context-field",
            FindingKind::CircularDependency => "circular-dependency",
            FindingKind::DuplicateId => "duplicate-id",
            FindingKind::InvalidActionReference => "invalid-action-reference",
            FindingKind::NamingConvention => "naming-convention",
        };
        f.write_str(name)
    }
}

/// A validation finding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    /// Location inside the document (`components[button_1].props.text`)
    pub path: String,

    /// Human-readable message
    pub message: String,

    pub severity: Severity,

    #[serde(rename = "type")]
    pub kind: FindingKind,

    /// Optional suggestion for fixing the issue
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl Finding {
    pub fn error(kind: FindingKind, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            severity: Severity::Error,
            kind,
            suggestion: None,
        }
    }

    pub fn warning(kind: FindingKind, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            severity: Severity::Warning,
            kind,
            suggestion: None,
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}
