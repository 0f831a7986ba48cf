//! Binding expression grammar.
//!
//! An expression has the fixed form `{{source.path}}` where `source` is one of
//! `state`, `context`, `inputs` or `trace_id` and `path` is a dot-separated
//! list of identifiers. `trace_id` takes no path; every other source needs one.
//! There is no indexing syntax.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::ops::Range;
use std::str::FromStr;
use thiserror::Error;

static EXPRESSION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\{\{\s*([A-Za-z_][A-Za-z0-9_]*)((?:\.[A-Za-z_][A-Za-z0-9_]*)*)\s*\}\}$")
        .expect("binding expression grammar")
});

static EMBEDDED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{[^{}]*\}\}").expect("embedded expression pattern"));

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExpressionError {
    #[error("Malformed binding expression: {0}")]
    Malformed(String),

    #[error("Unknown binding source '{source_name}' in {expression}")]
    UnknownSource {
        source_name: String,
        expression: String,
    },

    #[error("Binding source '{0}' requires a path")]
    MissingPath(String),

    #[error("trace_id does not take a path: {0}")]
    UnexpectedPath(String),
}

/// Where a binding reads its value from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingSource {
    State,
    Context,
    Inputs,
    TraceId,
}

impl BindingSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            BindingSource::State => "state",
            BindingSource::Context => "context",
            BindingSource::Inputs => "inputs",
            BindingSource::TraceId => "trace_id",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        match name {
            "state" => Some(BindingSource::State),
            "context" => Some(BindingSource::Context),
            "inputs" => Some(BindingSource::Inputs),
            "trace_id" => Some(BindingSource::TraceId),
            _ => None,
        }
    }
}

/// A parsed `{{source.path}}` expression
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BindingExpression {
    pub source: BindingSource,
    pub path: Vec<String>,
}

impl BindingExpression {
    /// Parse a whole string as exactly one expression
    pub fn parse(text: &str) -> Result<Self, ExpressionError> {
        let captures = EXPRESSION
            .captures(text.trim())
            .ok_or_else(|| ExpressionError::Malformed(text.to_string()))?;

        let source_name = &captures[1];
        let source =
            BindingSource::from_name(source_name).ok_or_else(|| ExpressionError::UnknownSource {
                source_name: source_name.to_string(),
                expression: text.to_string(),
            })?;

        let path: Vec<String> = captures
            .get(2)
            .map(|m| m.as_str())
            .unwrap_or("")
            .split('.')
            .filter(|segment| !segment.is_empty())
            .map(str::to_string)
            .collect();

        match (source, path.is_empty()) {
            (BindingSource::TraceId, false) => Err(ExpressionError::UnexpectedPath(text.to_string())),
            (BindingSource::TraceId, true) => Ok(Self { source, path }),
            (_, true) => Err(ExpressionError::MissingPath(source_name.to_string())),
            (_, false) => Ok(Self { source, path }),
        }
    }

    /// Dotted path without the source prefix
    pub fn path_string(&self) -> String {
        self.path.join(".")
    }
}

impl FromStr for BindingExpression {
    type Err = ExpressionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BindingExpression::parse(s)
    }
}

impl fmt::Display for BindingExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{{{{{}}}}}", self.source.as_str())
        } else {
            write!(f, "{{{{{}.{}}}}}", self.source.as_str(), self.path_string())
        }
    }
}

/// An expression occurrence inside a larger string
#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionMatch {
    pub range: Range<usize>,
    pub parsed: Result<BindingExpression, ExpressionError>,
}

/// Find every `{{...}}` occurrence in `text`
pub fn find_expressions(text: &str) -> Vec<ExpressionMatch> {
    EMBEDDED
        .find_iter(text)
        .map(|m| ExpressionMatch {
            range: m.range(),
            parsed: BindingExpression::parse(m.as_str()),
        })
        .collect()
}

/// Parse every expression in `text`, flagging stray or unterminated braces
pub fn scan(text: &str) -> Vec<Result<BindingExpression, ExpressionError>> {
    if !text.contains("{{") && !text.contains("}}") {
        return Vec::new();
    }

    let mut results: Vec<_> = find_expressions(text).into_iter().map(|m| m.parsed).collect();

    let leftover = EMBEDDED.replace_all(text, "");
    if leftover.contains("{{") || leftover.contains("}}") {
        results.push(Err(ExpressionError::Malformed(text.to_string())));
    }

    results
}
