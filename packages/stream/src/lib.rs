//! # Screenkit stream manager
//!
//! Owns the live push-data subscriptions that write into a screen's state.
//!
//! Each subscription runs on its own task with its own reconnect state
//! machine:
//!
//! ```text
//! disconnected -> connecting -> connected
//!                     |             |
//!                     v             v
//!                   error <---------+
//!                     |
//!                     +-- backoff --> connecting   (until max attempts)
//! ```
//!
//! Messages are applied single-flight: a message arriving while the previous
//! one is still being written is dropped, never queued. With an
//! [`AckSender`] a write lasts until the consumer acknowledges it.

pub mod config;
pub mod error;
pub mod manager;
pub mod sink;
pub mod sse;
pub mod subscription;
pub mod transport;

pub use config::ReconnectPolicy;
pub use error::{StreamError, TransportError};
pub use manager::StreamManager;
pub use sink::{AckSender, PendingUpdate, StateSink, StateUpdate};
pub use sse::{SseConnector, SseDecoder};
pub use subscription::{ConnectionStatus, SubscriptionConfig, SubscriptionSnapshot, Transform};
pub use transport::{MessageStream, StreamConnector};
