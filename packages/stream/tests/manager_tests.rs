use async_trait::async_trait;
use screenkit_stream::{
    ConnectionStatus, MessageStream, ReconnectPolicy, StateSink, StateUpdate, StreamConnector,
    StreamError, StreamManager, SubscriptionConfig, TransportError,
};
use serde_json::json;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};

type Feed = mpsc::UnboundedSender<Result<String, TransportError>>;

enum Script {
    Fail,
    Live(mpsc::UnboundedReceiver<Result<String, TransportError>>),
}

/// Connector that plays back a fixed list of connection outcomes, then fails
#[derive(Default)]
struct ScriptedConnector {
    attempts: AtomicUsize,
    scripts: Mutex<VecDeque<Script>>,
}

impl ScriptedConnector {
    fn push_fail(&self) {
        self.scripts.lock().unwrap().push_back(Script::Fail);
    }

    fn push_live(&self) -> Feed {
        let (tx, rx) = mpsc::unbounded_channel();
        self.scripts.lock().unwrap().push_back(Script::Live(rx));
        tx
    }

    fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StreamConnector for ScriptedConnector {
    async fn connect(&self, _url: &str) -> Result<MessageStream, TransportError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let script = self.scripts.lock().unwrap().pop_front();
        match script {
            Some(Script::Live(rx)) => {
                let stream = futures::stream::unfold(rx, |mut rx| async move {
                    rx.recv().await.map(|item| (item, rx))
                });
                Ok(Box::pin(stream))
            }
            Some(Script::Fail) | None => Err(TransportError::Connect("refused".to_string())),
        }
    }
}

/// Sink that reports each update on entry and blocks until a permit is released
struct GatedSink {
    entered: mpsc::UnboundedSender<StateUpdate>,
    gate: Arc<Semaphore>,
}

#[async_trait]
impl StateSink for GatedSink {
    async fn apply(&self, update: StateUpdate) {
        let _ = self.entered.send(update);
        if let Ok(permit) = self.gate.acquire().await {
            permit.forget();
        }
    }
}

fn fast_policy(max_attempts: u32) -> ReconnectPolicy {
    ReconnectPolicy::from_millis(1, 5, 0, max_attempts)
}

async fn wait_for(mut condition: impl FnMut() -> bool) {
    for _ in 0..400 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached in time");
}

fn status(manager: &StreamManager, id: &str) -> Option<ConnectionStatus> {
    manager.snapshot(id).map(|s| s.status)
}

#[tokio::test]
async fn test_messages_written_to_target_path() {
    let connector = Arc::new(ScriptedConnector::default());
    let feed = connector.push_live();
    let (tx, mut rx) = mpsc::channel::<StateUpdate>(8);

    let manager = StreamManager::new(connector.clone(), Arc::new(tx)).with_policy(fast_policy(3));
    manager
        .subscribe(
            SubscriptionConfig::new("cpu", "http://metrics/cpu", "state.metrics.cpu")
                .with_transform(|v| v["value"].clone())
                .with_state_patch(true),
        )
        .unwrap();

    feed.send(Ok(json!({ "value": 0.75, "statePatch": { "loading": false } }).to_string()))
        .unwrap();

    let update = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(update.subscription_id, "cpu");
    assert_eq!(update.target_path, "state.metrics.cpu");
    assert_eq!(update.value, json!(0.75));
    assert_eq!(update.state_patch, json!({ "loading": false }).as_object().cloned());

    wait_for(|| {
        manager
            .snapshot("cpu")
            .map(|s| s.last_message_at.is_some() && !s.processing)
            .unwrap_or(false)
    })
    .await;
    assert_eq!(status(&manager, "cpu"), Some(ConnectionStatus::Connected));
}

#[tokio::test]
async fn test_message_arriving_during_apply_is_dropped() {
    let connector = Arc::new(ScriptedConnector::default());
    let feed = connector.push_live();
    let (entered_tx, mut entered) = mpsc::unbounded_channel();
    let gate = Arc::new(Semaphore::new(0));
    let sink = GatedSink {
        entered: entered_tx,
        gate: gate.clone(),
    };

    let manager = StreamManager::new(connector.clone(), Arc::new(sink)).with_policy(fast_policy(3));
    manager
        .subscribe(SubscriptionConfig::new("feed", "http://feed", "feed"))
        .unwrap();
    wait_for(|| status(&manager, "feed") == Some(ConnectionStatus::Connected)).await;

    feed.send(Ok(r#"{"n":1}"#.to_string())).unwrap();
    let first = tokio::time::timeout(Duration::from_secs(2), entered.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first.value, json!({ "n": 1 }));

    feed.send(Ok(r#"{"n":2}"#.to_string())).unwrap();
    wait_for(|| manager.snapshot("feed").map(|s| s.dropped_messages) == Some(1)).await;

    gate.add_permits(1);
    wait_for(|| manager.snapshot("feed").map(|s| s.processing) == Some(false)).await;

    feed.send(Ok(r#"{"n":3}"#.to_string())).unwrap();
    gate.add_permits(1);
    let next = tokio::time::timeout(Duration::from_secs(2), entered.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(next.value, json!({ "n": 3 }));
    assert!(entered.try_recv().is_err());
}

#[tokio::test]
async fn test_malformed_message_keeps_connection() {
    let connector = Arc::new(ScriptedConnector::default());
    let feed = connector.push_live();
    let (tx, mut rx) = mpsc::channel::<StateUpdate>(8);

    let manager = StreamManager::new(connector.clone(), Arc::new(tx)).with_policy(fast_policy(3));
    manager
        .subscribe(SubscriptionConfig::new("orders", "http://orders", "orders"))
        .unwrap();

    feed.send(Ok("not json".to_string())).unwrap();
    wait_for(|| {
        manager
            .snapshot("orders")
            .map(|s| s.last_error.is_some())
            .unwrap_or(false)
    })
    .await;
    assert_eq!(status(&manager, "orders"), Some(ConnectionStatus::Connected));

    feed.send(Ok("[1,2]".to_string())).unwrap();
    let update = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(update.value, json!([1, 2]));
    assert_eq!(connector.attempts(), 1);
}

#[tokio::test]
async fn test_parks_in_error_after_max_attempts() {
    let connector = Arc::new(ScriptedConnector::default());
    let (tx, _rx) = mpsc::channel::<StateUpdate>(8);

    let manager = StreamManager::new(connector.clone(), Arc::new(tx)).with_policy(fast_policy(2));
    manager
        .subscribe(SubscriptionConfig::new("s", "http://down", "value"))
        .unwrap();

    wait_for(|| connector.attempts() == 3 && status(&manager, "s") == Some(ConnectionStatus::Error))
        .await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    let snapshot = manager.snapshot("s").unwrap();
    assert_eq!(connector.attempts(), 3);
    assert_eq!(snapshot.status, ConnectionStatus::Error);
    assert_eq!(snapshot.reconnect_count, 2);
    assert!(snapshot.last_error.is_some());
}

#[tokio::test]
async fn test_successful_connect_resets_reconnect_count() {
    let connector = Arc::new(ScriptedConnector::default());
    connector.push_fail();
    let feed = connector.push_live();
    let (tx, _rx) = mpsc::channel::<StateUpdate>(8);

    let manager = StreamManager::new(connector.clone(), Arc::new(tx)).with_policy(fast_policy(5));
    manager
        .subscribe(SubscriptionConfig::new("s", "http://flaky", "value"))
        .unwrap();

    wait_for(|| status(&manager, "s") == Some(ConnectionStatus::Connected)).await;
    let snapshot = manager.snapshot("s").unwrap();
    assert_eq!(snapshot.reconnect_count, 0);
    assert!(snapshot.last_error.is_none());
    assert_eq!(connector.attempts(), 2);

    // server closes the stream: the manager goes back to reconnecting
    drop(feed);
    wait_for(|| connector.attempts() >= 3).await;
}

#[tokio::test]
async fn test_resubscribe_replaces_existing() {
    let connector = Arc::new(ScriptedConnector::default());
    let first = connector.push_live();
    let _second = connector.push_live();
    let (tx, _rx) = mpsc::channel::<StateUpdate>(8);

    let manager = StreamManager::new(connector.clone(), Arc::new(tx)).with_policy(fast_policy(3));
    manager
        .subscribe(SubscriptionConfig::new("s", "http://a", "value"))
        .unwrap();
    wait_for(|| status(&manager, "s") == Some(ConnectionStatus::Connected)).await;

    manager
        .subscribe(SubscriptionConfig::new("s", "http://b", "value"))
        .unwrap();
    wait_for(|| first.is_closed()).await;
    wait_for(|| status(&manager, "s") == Some(ConnectionStatus::Connected)).await;

    assert_eq!(manager.len(), 1);
    assert_eq!(manager.snapshot("s").unwrap().url, "http://b");
    assert_eq!(connector.attempts(), 2);
}

#[tokio::test]
async fn test_dispose_closes_connections_and_rejects_new_subscriptions() {
    let connector = Arc::new(ScriptedConnector::default());
    let feed = connector.push_live();
    let (tx, _rx) = mpsc::channel::<StateUpdate>(8);

    let manager = StreamManager::new(connector.clone(), Arc::new(tx)).with_policy(fast_policy(3));
    manager
        .subscribe(SubscriptionConfig::new("s", "http://a", "value"))
        .unwrap();
    wait_for(|| status(&manager, "s") == Some(ConnectionStatus::Connected)).await;

    manager.dispose();
    assert!(manager.is_disposed());
    assert!(manager.is_empty());
    wait_for(|| feed.is_closed()).await;

    let result = manager.subscribe(SubscriptionConfig::new("t", "http://b", "value"));
    assert_eq!(result, Err(StreamError::Disposed));

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(connector.attempts(), 1);
}

#[tokio::test]
async fn test_unsubscribe_cancels_pending_reconnect() {
    let connector = Arc::new(ScriptedConnector::default());
    let (tx, _rx) = mpsc::channel::<StateUpdate>(8);

    let manager = StreamManager::new(connector.clone(), Arc::new(tx))
        .with_policy(ReconnectPolicy::from_millis(10_000, 30_000, 0, 10));
    manager
        .subscribe(SubscriptionConfig::new("s", "http://down", "value"))
        .unwrap();
    wait_for(|| status(&manager, "s") == Some(ConnectionStatus::Error)).await;

    assert!(manager.unsubscribe("s"));
    assert!(!manager.unsubscribe("s"));
    assert!(manager.snapshot("s").is_none());
    assert_eq!(connector.attempts(), 1);
}

#[tokio::test]
async fn test_rejects_invalid_target_path() {
    let connector = Arc::new(ScriptedConnector::default());
    let (tx, _rx) = mpsc::channel::<StateUpdate>(8);
    let manager = StreamManager::new(connector, Arc::new(tx));

    let result = manager.subscribe(SubscriptionConfig::new("s", "http://a", "state..x"));
    assert!(matches!(result, Err(StreamError::InvalidTargetPath(_))));

    let result = manager.subscribe(SubscriptionConfig::new("s", "  ", "x"));
    assert!(matches!(result, Err(StreamError::EmptyUrl(_))));
}
