//! Best-effort fan-out to every live subscriber.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use tokio::sync::{RwLock, mpsc};
use tracing::{debug, info};

use super::subscriber::{Payload, SubscriberId, SubscriberSink};

/// Thread-safe set of live subscribers.
///
/// The lock is held only to mutate membership or to copy it out; delivery
/// happens outside of it.
pub struct BroadcastManager {
    subscribers: RwLock<HashMap<SubscriberId, SubscriberSink>>,
    next_id: AtomicU64,
}

impl BroadcastManager {
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Add a subscriber and return its id.
    pub async fn register(&self, sink: SubscriberSink) -> SubscriberId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let transport = sink.transport();
        self.subscribers.write().await.insert(id, sink);
        info!(subscriber_id = id, transport, "Subscriber registered");
        id
    }

    /// Remove a subscriber. Returns `false` if it was already gone.
    pub async fn unregister(&self, id: SubscriberId) -> bool {
        let removed = self.subscribers.write().await.remove(&id).is_some();
        if removed {
            info!(subscriber_id = id, "Subscriber unregistered");
        }
        removed
    }

    /// Register a socket subscriber backed by a queue of `capacity` messages.
    pub async fn subscribe_socket(
        &self,
        capacity: usize,
    ) -> (SubscriberId, mpsc::Receiver<Payload>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let id = self.register(SubscriberSink::Socket(tx)).await;
        (id, rx)
    }

    /// Register an in-process subscriber with an unbounded queue.
    pub async fn subscribe_local(&self) -> (SubscriberId, mpsc::UnboundedReceiver<Payload>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.register(SubscriberSink::Local(tx)).await;
        (id, rx)
    }

    /// Deliver `message` to every current subscriber.
    ///
    /// The message is serialized once. Subscribers that fail to accept it are
    /// removed afterwards; one failure never prevents delivery to the others.
    /// Returns the number of subscribers that accepted the message.
    pub async fn broadcast<M: Serialize + ?Sized>(
        &self,
        message: &M,
    ) -> Result<usize, serde_json::Error> {
        let targets: Vec<(SubscriberId, SubscriberSink)> = self
            .subscribers
            .read()
            .await
            .iter()
            .map(|(id, sink)| (*id, sink.clone()))
            .collect();
        if targets.is_empty() {
            return Ok(0);
        }

        let payload = Payload::from(serde_json::to_string(message)?);

        let mut delivered = 0usize;
        let mut stale = Vec::new();
        for (id, sink) in &targets {
            match sink.deliver(&payload) {
                Ok(()) => delivered += 1,
                Err(e) => {
                    debug!(subscriber_id = id, error = %e, "Dropping stale subscriber");
                    stale.push(*id);
                }
            }
        }

        if !stale.is_empty() {
            let mut subscribers = self.subscribers.write().await;
            for id in &stale {
                subscribers.remove(id);
            }
            debug!(dropped = stale.len(), remaining = subscribers.len(), "Removed stale subscribers");
        }

        Ok(delivered)
    }

    /// Count of live subscribers.
    pub async fn subscriber_count(&self) -> usize {
        self.subscribers.read().await.len()
    }

    pub async fn is_registered(&self, id: SubscriberId) -> bool {
        self.subscribers.read().await.contains_key(&id)
    }
}

impl Default for BroadcastManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn register_and_unregister() {
        let manager = BroadcastManager::new();
        let (id, _rx) = manager.subscribe_local().await;

        assert!(manager.is_registered(id).await);
        assert_eq!(manager.subscriber_count().await, 1);

        assert!(manager.unregister(id).await);
        assert!(!manager.unregister(id).await);
        assert_eq!(manager.subscriber_count().await, 0);
    }

    #[tokio::test]
    async fn ids_are_unique() {
        let manager = BroadcastManager::new();
        let (a, _ra) = manager.subscribe_local().await;
        let (b, _rb) = manager.subscribe_socket(4).await;
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn broadcast_with_no_subscribers_delivers_nothing() {
        let manager = BroadcastManager::new();
        assert_eq!(manager.broadcast(&json!({"type": "log"})).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn broadcast_reaches_every_subscriber() {
        let manager = BroadcastManager::new();
        let (_, mut local) = manager.subscribe_local().await;
        let (_, mut socket) = manager.subscribe_socket(8).await;

        let delivered = manager.broadcast(&json!({"type": "metric"})).await.unwrap();
        assert_eq!(delivered, 2);

        let expected = r#"{"type":"metric"}"#;
        assert_eq!(local.recv().await.unwrap().as_str(), expected);
        assert_eq!(socket.recv().await.unwrap().as_str(), expected);
    }

    #[tokio::test]
    async fn subscribers_share_one_serialized_buffer() {
        let manager = BroadcastManager::new();
        let (_, mut local) = manager.subscribe_local().await;
        let (_, mut socket) = manager.subscribe_socket(8).await;

        manager.broadcast(&json!({"type": "log"})).await.unwrap();
        let a = local.recv().await.unwrap();
        let b = socket.recv().await.unwrap();
        assert_eq!(a.as_str().as_ptr(), b.as_str().as_ptr());
    }

    #[tokio::test]
    async fn broken_subscriber_is_dropped_without_affecting_others() {
        let manager = BroadcastManager::new();
        let (broken, broken_rx) = manager.subscribe_local().await;
        let (healthy, mut healthy_rx) = manager.subscribe_local().await;
        drop(broken_rx);

        let delivered = manager.broadcast(&json!({"n": 1})).await.unwrap();
        assert_eq!(delivered, 1);
        assert!(!manager.is_registered(broken).await);
        assert!(manager.is_registered(healthy).await);

        manager.broadcast(&json!({"n": 2})).await.unwrap();
        assert_eq!(healthy_rx.recv().await.unwrap().as_str(), r#"{"n":1}"#);
        assert_eq!(healthy_rx.recv().await.unwrap().as_str(), r#"{"n":2}"#);
    }

    #[tokio::test]
    async fn slow_socket_subscriber_is_dropped_when_queue_fills() {
        let manager = BroadcastManager::new();
        let (slow, _slow_rx) = manager.subscribe_socket(1).await;

        assert_eq!(manager.broadcast(&json!(1)).await.unwrap(), 1);
        assert_eq!(manager.broadcast(&json!(2)).await.unwrap(), 0);
        assert!(!manager.is_registered(slow).await);
    }

    #[tokio::test]
    async fn per_subscriber_order_follows_broadcast_order() {
        let manager = BroadcastManager::new();
        let (_, mut rx) = manager.subscribe_local().await;

        for i in 0..20 {
            manager.broadcast(&json!(i)).await.unwrap();
        }
        for i in 0..20 {
            assert_eq!(rx.recv().await.unwrap().as_str(), i.to_string());
        }
    }
}
