use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Caller-supplied reshaping of a decoded message before it is written
pub type Transform = Arc<dyn Fn(Value) -> Value + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
    Error,
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionStatus::Disconnected => "disconnected",
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::Error => "error",
        };
        f.write_str(name)
    }
}

/// What to subscribe to and where the data goes
#[derive(Clone)]
pub struct SubscriptionConfig {
    pub id: String,
    pub url: String,
    pub target_path: String,
    pub transform: Option<Transform>,

    /// Also forward the payload's embedded `statePatch` object
    pub merge_state_patch: bool,
}

impl SubscriptionConfig {
    pub fn new(id: impl Into<String>, url: impl Into<String>, target_path: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            target_path: target_path.into(),
            transform: None,
            merge_state_patch: false,
        }
    }

    pub fn with_transform<F>(mut self, transform: F) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        self.transform = Some(Arc::new(transform));
        self
    }

    pub fn with_state_patch(mut self, enabled: bool) -> Self {
        self.merge_state_patch = enabled;
        self
    }
}

impl fmt::Debug for SubscriptionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionConfig")
            .field("id", &self.id)
            .field("url", &self.url)
            .field("target_path", &self.target_path)
            .field("transform", &self.transform.is_some())
            .field("merge_state_patch", &self.merge_state_patch)
            .finish()
    }
}

/// Point-in-time view of a subscription
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionSnapshot {
    pub id: String,
    pub url: String,
    pub target_path: String,
    pub status: ConnectionStatus,
    pub reconnect_count: u32,
    pub last_message_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub processing: bool,
    pub dropped_messages: u64,
}
