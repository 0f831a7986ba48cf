use crate::error::TransportError;
use async_trait::async_trait;
use futures::stream::BoxStream;

/// Raw message bodies of one live connection, in arrival order
pub type MessageStream = BoxStream<'static, Result<String, TransportError>>;

/// Opens push-data connections.
///
/// The returned stream ending means the server closed the connection; an
/// `Err` item means the connection broke. Both make the manager reconnect.
#[async_trait]
pub trait StreamConnector: Send + Sync + 'static {
    async fn connect(&self, url: &str) -> Result<MessageStream, TransportError>;
}
