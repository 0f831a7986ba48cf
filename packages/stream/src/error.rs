use thiserror::Error;

/// Failures while opening or reading a push-data connection.
///
/// These never reach the caller; they are recorded on the subscription and
/// drive the reconnect state machine.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Endpoint {url} answered with status {status}")]
    Status { url: String, status: u16 },

    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("Stream closed by server")]
    Closed,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StreamError {
    #[error("Stream manager has been disposed")]
    Disposed,

    #[error("Invalid target path: {0}")]
    InvalidTargetPath(String),

    #[error("Subscription URL is empty for '{0}'")]
    EmptyUrl(String),
}
