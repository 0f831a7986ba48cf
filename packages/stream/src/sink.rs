use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::{mpsc, oneshot};

/// One decoded message, ready to be written into document state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateUpdate {
    pub subscription_id: String,

    /// Dotted state path the value is written to
    pub target_path: String,

    pub value: Value,

    /// Incremental patch embedded in the payload (`statePatch`), when enabled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_patch: Option<Map<String, Value>>,
}

/// Destination for stream writes.
///
/// `apply` is awaited while the subscription's single-flight guard is held;
/// messages arriving meanwhile are dropped.
#[async_trait]
pub trait StateSink: Send + Sync + 'static {
    async fn apply(&self, update: StateUpdate);
}

#[async_trait]
impl StateSink for mpsc::Sender<StateUpdate> {
    async fn apply(&self, update: StateUpdate) {
        if self.send(update).await.is_err() {
            tracing::debug!("state update receiver closed");
        }
    }
}

#[async_trait]
impl StateSink for mpsc::UnboundedSender<StateUpdate> {
    async fn apply(&self, update: StateUpdate) {
        if self.send(update).is_err() {
            tracing::debug!("state update receiver closed");
        }
    }
}

/// An update handed to a consumer that has not finished applying it yet.
///
/// The subscription's single-flight slot stays held until the update is
/// acknowledged or dropped, so messages arriving meanwhile are dropped
/// rather than queued behind it.
#[derive(Debug)]
pub struct PendingUpdate {
    update: StateUpdate,
    ack: oneshot::Sender<()>,
}

impl PendingUpdate {
    pub fn update(&self) -> &StateUpdate {
        &self.update
    }

    /// Release the subscription for its next message
    pub fn acknowledge(self) -> StateUpdate {
        // the subscription may already be gone
        let _ = self.ack.send(());
        self.update
    }
}

/// Sink that completes only once the receiver acknowledges the update
#[derive(Debug, Clone)]
pub struct AckSender {
    tx: mpsc::Sender<PendingUpdate>,
}

impl AckSender {
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<PendingUpdate>) {
        let (tx, rx) = mpsc::channel(buffer);
        (Self { tx }, rx)
    }
}

#[async_trait]
impl StateSink for AckSender {
    async fn apply(&self, update: StateUpdate) {
        let (ack, done) = oneshot::channel();
        if self.tx.send(PendingUpdate { update, ack }).await.is_err() {
            tracing::debug!("state update receiver closed");
            return;
        }
        // a dropped PendingUpdate also releases the slot
        let _ = done.await;
    }
}
