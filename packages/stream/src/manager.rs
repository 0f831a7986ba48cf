//! Subscription ownership and the per-subscription connection loop.

use crate::config::ReconnectPolicy;
use crate::error::{StreamError, TransportError};
use crate::sink::{StateSink, StateUpdate};
use crate::subscription::{ConnectionStatus, SubscriptionConfig, SubscriptionSnapshot};
use crate::transport::StreamConnector;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use rand::rngs::StdRng;
use rand::SeedableRng;
use screenkit_model::state::split_state_path;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[derive(Debug)]
struct LinkState {
    status: ConnectionStatus,
    reconnect_count: u32,
    last_message_at: Option<DateTime<Utc>>,
    last_error: Option<String>,
}

/// Shared between the manager and the subscription's tasks
struct Subscription {
    config: SubscriptionConfig,
    link: Mutex<LinkState>,

    /// Single-flight guard: set while a message is being applied
    processing: AtomicBool,
    dropped: AtomicU64,
}

impl Subscription {
    fn new(config: SubscriptionConfig) -> Self {
        Self {
            config,
            link: Mutex::new(LinkState {
                status: ConnectionStatus::Disconnected,
                reconnect_count: 0,
                last_message_at: None,
                last_error: None,
            }),
            processing: AtomicBool::new(false),
            dropped: AtomicU64::new(0),
        }
    }

    fn link(&self) -> MutexGuard<'_, LinkState> {
        self.link.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_status(&self, status: ConnectionStatus) {
        let mut link = self.link();
        if link.status != status {
            tracing::debug!(
                subscription = %self.config.id,
                from = %link.status,
                to = %status,
                "stream status changed"
            );
            link.status = status;
        }
    }

    fn mark_connected(&self) {
        self.set_status(ConnectionStatus::Connected);
        let mut link = self.link();
        link.reconnect_count = 0;
        link.last_error = None;
    }

    fn record_error(&self, message: String) {
        self.link().last_error = Some(message);
    }

    fn snapshot(&self) -> SubscriptionSnapshot {
        let link = self.link();
        SubscriptionSnapshot {
            id: self.config.id.clone(),
            url: self.config.url.clone(),
            target_path: self.config.target_path.clone(),
            status: link.status,
            reconnect_count: link.reconnect_count,
            last_message_at: link.last_message_at,
            last_error: link.last_error.clone(),
            processing: self.processing.load(Ordering::Acquire),
            dropped_messages: self.dropped.load(Ordering::Relaxed),
        }
    }
}

struct Handle {
    subscription: Arc<Subscription>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl Handle {
    /// Cancels pending timers and in-flight writes, then drops the connection
    fn shutdown(self) {
        self.cancel.cancel();
        self.task.abort();
    }
}

/// Owns every live push-data subscription of an editing session.
///
/// Must be used from within a tokio runtime: `subscribe` spawns the
/// connection task.
pub struct StreamManager {
    connector: Arc<dyn StreamConnector>,
    sink: Arc<dyn StateSink>,
    policy: ReconnectPolicy,
    subscriptions: Mutex<HashMap<String, Handle>>,

    /// Parent of every subscription token; cancelled by `dispose`
    shutdown: CancellationToken,
}

impl StreamManager {
    pub fn new(connector: Arc<dyn StreamConnector>, sink: Arc<dyn StateSink>) -> Self {
        Self {
            connector,
            sink,
            policy: ReconnectPolicy::default(),
            subscriptions: Mutex::new(HashMap::new()),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_policy(mut self, policy: ReconnectPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> &ReconnectPolicy {
        &self.policy
    }

    fn subscriptions(&self) -> MutexGuard<'_, HashMap<String, Handle>> {
        self.subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Start a subscription, replacing any existing one with the same id
    pub fn subscribe(&self, config: SubscriptionConfig) -> Result<(), StreamError> {
        if self.shutdown.is_cancelled() {
            return Err(StreamError::Disposed);
        }
        if config.url.trim().is_empty() {
            return Err(StreamError::EmptyUrl(config.id));
        }
        split_state_path(&config.target_path)
            .map_err(|_| StreamError::InvalidTargetPath(config.target_path.clone()))?;

        let mut subscriptions = self.subscriptions();
        if let Some(existing) = subscriptions.remove(&config.id) {
            tracing::debug!(subscription = %config.id, "replacing existing subscription");
            existing.shutdown();
        }

        let id = config.id.clone();
        tracing::info!(subscription = %id, url = %config.url, target = %config.target_path, "subscribing");

        let subscription = Arc::new(Subscription::new(config));
        let cancel = self.shutdown.child_token();
        let task = tokio::spawn(run_subscription(
            Arc::clone(&subscription),
            Arc::clone(&self.connector),
            Arc::clone(&self.sink),
            self.policy,
            cancel.clone(),
        ));

        subscriptions.insert(
            id,
            Handle {
                subscription,
                cancel,
                task,
            },
        );
        Ok(())
    }

    /// Returns whether a subscription with this id existed
    pub fn unsubscribe(&self, id: &str) -> bool {
        match self.subscriptions().remove(id) {
            Some(handle) => {
                tracing::info!(subscription = %id, "unsubscribed");
                handle.shutdown();
                true
            }
            None => false,
        }
    }

    pub fn unsubscribe_all(&self) {
        let drained: Vec<_> = self.subscriptions().drain().collect();
        if !drained.is_empty() {
            tracing::info!(count = drained.len(), "unsubscribing all streams");
        }
        for (_, handle) in drained {
            handle.shutdown();
        }
    }

    /// Tear everything down; later `subscribe` calls fail with `Disposed`
    pub fn dispose(&self) {
        self.shutdown.cancel();
        self.unsubscribe_all();
    }

    pub fn is_disposed(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    pub fn snapshot(&self, id: &str) -> Option<SubscriptionSnapshot> {
        self.subscriptions()
            .get(id)
            .map(|handle| handle.subscription.snapshot())
    }

    /// Snapshots of every subscription, ordered by id
    pub fn snapshots(&self) -> Vec<SubscriptionSnapshot> {
        let mut snapshots: Vec<_> = self
            .subscriptions()
            .values()
            .map(|handle| handle.subscription.snapshot())
            .collect();
        snapshots.sort_by(|a, b| a.id.cmp(&b.id));
        snapshots
    }

    pub fn len(&self) -> usize {
        self.subscriptions().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Drop for StreamManager {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

impl std::fmt::Debug for StreamManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamManager")
            .field("policy", &self.policy)
            .field("subscriptions", &self.len())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

async fn run_subscription(
    subscription: Arc<Subscription>,
    connector: Arc<dyn StreamConnector>,
    sink: Arc<dyn StateSink>,
    policy: ReconnectPolicy,
    cancel: CancellationToken,
) {
    let id = subscription.config.id.clone();
    let mut rng = StdRng::from_os_rng();

    loop {
        subscription.set_status(ConnectionStatus::Connecting);

        let connected = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            result = connector.connect(&subscription.config.url) => result,
        };

        match connected {
            Ok(mut messages) => {
                subscription.mark_connected();
                tracing::info!(subscription = %id, "stream connected");

                let failure = loop {
                    let next = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => {
                            subscription.set_status(ConnectionStatus::Disconnected);
                            return;
                        }
                        next = messages.next() => next,
                    };

                    match next {
                        Some(Ok(body)) => handle_message(&subscription, &sink, &cancel, body),
                        Some(Err(err)) => break err,
                        None => break TransportError::Closed,
                    }
                };

                tracing::warn!(subscription = %id, error = %failure, "stream disconnected");
                subscription.record_error(failure.to_string());
            }
            Err(err) => {
                tracing::warn!(subscription = %id, error = %err, "stream connect failed");
                subscription.record_error(err.to_string());
            }
        }

        subscription.set_status(ConnectionStatus::Error);

        let attempt = subscription.link().reconnect_count;
        if !policy.can_retry(attempt) {
            tracing::error!(
                subscription = %id,
                attempts = attempt,
                "stream reconnect attempts exhausted"
            );
            return;
        }

        let delay = policy.delay(attempt, &mut rng);
        subscription.link().reconnect_count = attempt + 1;
        tracing::debug!(
            subscription = %id,
            attempt = attempt + 1,
            delay_ms = delay.as_millis() as u64,
            "scheduling reconnect"
        );

        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(delay) => {}
        }
    }

    subscription.set_status(ConnectionStatus::Disconnected);
}

/// Apply one message unless the previous one is still in flight
fn handle_message(
    subscription: &Arc<Subscription>,
    sink: &Arc<dyn StateSink>,
    cancel: &CancellationToken,
    body: String,
) {
    if subscription.processing.swap(true, Ordering::AcqRel) {
        let dropped = subscription.dropped.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::debug!(
            subscription = %subscription.config.id,
            dropped,
            "previous message still applying, dropping message"
        );
        return;
    }

    let payload: Value = match serde_json::from_str(&body) {
        Ok(payload) => payload,
        Err(err) => {
            subscription.processing.store(false, Ordering::Release);
            tracing::warn!(subscription = %subscription.config.id, error = %err, "discarding malformed message");
            subscription.record_error(format!("Invalid message payload: {}", err));
            return;
        }
    };

    let update = build_update(&subscription.config, payload);
    let subscription = Arc::clone(subscription);
    let sink = Arc::clone(sink);
    let cancel = cancel.clone();

    tokio::spawn(async move {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {}
            _ = sink.apply(update) => {
                subscription.link().last_message_at = Some(Utc::now());
            }
        }
        subscription.processing.store(false, Ordering::Release);
    });
}

fn build_update(config: &SubscriptionConfig, payload: Value) -> StateUpdate {
    let state_patch = if config.merge_state_patch {
        payload.get("statePatch").and_then(Value::as_object).cloned()
    } else {
        None
    };

    let value = match &config.transform {
        Some(transform) => transform(payload),
        None => payload,
    };

    StateUpdate {
        subscription_id: config.id.clone(),
        target_path: config.target_path.clone(),
        value,
        state_patch,
    }
}
