//! Subscriber sinks: the transports a broadcast can be delivered through.

use axum::extract::ws::Utf8Bytes;
use tokio::sync::mpsc;

/// Process-unique subscriber identifier.
pub type SubscriberId = u64;

/// One serialized broadcast. Clones share the same buffer.
pub type Payload = Utf8Bytes;

/// Where broadcast payloads for one subscriber go.
///
/// Delivery never waits: a sink either accepts the payload immediately or
/// reports a [`DeliveryError`], after which the subscriber is dropped.
#[derive(Debug, Clone)]
pub enum SubscriberSink {
    /// Bounded outbound queue drained by a websocket session task.
    Socket(mpsc::Sender<Payload>),
    /// Unbounded queue for in-process observers.
    Local(mpsc::UnboundedSender<Payload>),
}

impl SubscriberSink {
    /// Hand one serialized message to the subscriber.
    pub fn deliver(&self, payload: &Payload) -> Result<(), DeliveryError> {
        match self {
            Self::Socket(tx) => tx.try_send(payload.clone()).map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => DeliveryError::QueueFull,
                mpsc::error::TrySendError::Closed(_) => DeliveryError::Disconnected,
            }),
            Self::Local(tx) => tx
                .send(payload.clone())
                .map_err(|_| DeliveryError::Disconnected),
        }
    }

    pub const fn transport(&self) -> &'static str {
        match self {
            Self::Socket(_) => "socket",
            Self::Local(_) => "local",
        }
    }
}

/// Reasons a delivery to a single subscriber failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    #[error("Subscriber disconnected")]
    Disconnected,

    #[error("Subscriber queue full")]
    QueueFull,
}
