//! Action execution contract.
//!
//! Handlers run in an external executor. The engine resolves the payload
//! template against the current state, sends `{handler, payload, context,
//! traceId}` and merges any `statePatch` that comes back.

use async_trait::async_trait;
use screenkit_model::StateDefinition;
use screenkit_validator::expression::find_expressions;
use screenkit_validator::{BindingExpression, BindingSource};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionRequest {
    pub handler: String,
    pub payload: Value,
    pub context: Map<String, Value>,
    pub trace_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionResponse {
    #[serde(default)]
    pub result: Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_patch: Option<Map<String, Value>>,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExecutorError {
    #[error("Handler '{handler}' failed: {message}")]
    Handler { handler: String, message: String },

    #[error("Executor unreachable: {0}")]
    Transport(String),

    #[error("Action not found: {0}")]
    UnknownAction(String),
}

/// Runs action handlers on behalf of the engine
#[async_trait]
pub trait ActionExecutor: Send + Sync {
    async fn execute(&self, request: ActionRequest) -> Result<ActionResponse, ExecutorError>;
}

/// Executor reached over HTTP: `POST {endpoint}` with the request as JSON
#[derive(Debug, Clone)]
pub struct HttpExecutor {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpExecutor {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }

    pub fn with_client(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl ActionExecutor for HttpExecutor {
    async fn execute(&self, request: ActionRequest) -> Result<ActionResponse, ExecutorError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| ExecutorError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ExecutorError::Handler {
                handler: request.handler,
                message: format!("{}: {}", status, message),
            });
        }

        response
            .json::<ActionResponse>()
            .await
            .map_err(|e| ExecutorError::Transport(e.to_string()))
    }
}

/// Values expressions resolve against, besides state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutionContext {
    pub context: Map<String, Value>,
    pub inputs: Map<String, Value>,
    pub trace_id: String,
}

impl ExecutionContext {
    /// Empty context with a random trace id
    pub fn new() -> Self {
        Self {
            trace_id: format!("{:016x}", rand::random::<u64>()),
            ..Self::default()
        }
    }

    pub fn with_context(mut self, context: Map<String, Value>) -> Self {
        self.context = context;
        self
    }

    pub fn with_inputs(mut self, inputs: Map<String, Value>) -> Self {
        self.inputs = inputs;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome {
    /// `runIf` resolved falsy
    Skipped,
    Completed(ActionResponse),
}

/// Resolve every expression in a payload template.
///
/// A string that is exactly one expression takes the referenced value with
/// its JSON type; expressions embedded in longer text are interpolated.
/// Unresolvable references become `null` (or empty text).
pub fn resolve_template(
    template: &Map<String, Value>,
    state: &StateDefinition,
    ctx: &ExecutionContext,
) -> Value {
    Value::Object(
        template
            .iter()
            .map(|(key, value)| (key.clone(), resolve_value(value, state, ctx)))
            .collect(),
    )
}

pub fn resolve_value(value: &Value, state: &StateDefinition, ctx: &ExecutionContext) -> Value {
    match value {
        Value::String(text) => resolve_string(text, state, ctx),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| resolve_value(item, state, ctx))
                .collect(),
        ),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, item)| (key.clone(), resolve_value(item, state, ctx)))
                .collect(),
        ),
        other => other.clone(),
    }
}

fn resolve_string(text: &str, state: &StateDefinition, ctx: &ExecutionContext) -> Value {
    if !text.contains("{{") {
        return Value::String(text.to_string());
    }
    if let Ok(expression) = BindingExpression::parse(text) {
        return lookup(&expression, state, ctx).unwrap_or(Value::Null);
    }

    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for found in find_expressions(text) {
        out.push_str(&text[cursor..found.range.start]);
        let resolved = found
            .parsed
            .ok()
            .and_then(|expression| lookup(&expression, state, ctx));
        match resolved {
            Some(Value::String(s)) => out.push_str(&s),
            Some(Value::Null) | None => {}
            Some(other) => out.push_str(&other.to_string()),
        }
        cursor = found.range.end;
    }
    out.push_str(&text[cursor..]);
    Value::String(out)
}

fn lookup(expression: &BindingExpression, state: &StateDefinition, ctx: &ExecutionContext) -> Option<Value> {
    match expression.source {
        BindingSource::State => state.value_at_path(&expression.path_string()).cloned(),
        BindingSource::Context => value_in(&ctx.context, &expression.path),
        BindingSource::Inputs => value_in(&ctx.inputs, &expression.path),
        BindingSource::TraceId => Some(Value::String(ctx.trace_id.clone())),
    }
}

fn value_in(map: &Map<String, Value>, path: &[String]) -> Option<Value> {
    let (first, rest) = path.split_first()?;
    let mut current = map.get(first)?;
    for segment in rest {
        current = current.as_object()?.get(segment)?;
    }
    Some(current.clone())
}

/// JavaScript truthiness: `null`, `false`, `0` and `""` are falsy
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(false, |f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Resolve a `runIf` guard
pub fn should_run(run_if: Option<&str>, state: &StateDefinition, ctx: &ExecutionContext) -> bool {
    match run_if.map(str::trim) {
        None | Some("") => true,
        Some(rule) => is_truthy(&resolve_string(rule, state, ctx)),
    }
}
