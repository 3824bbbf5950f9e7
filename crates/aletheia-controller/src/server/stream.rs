//! Per-connection websocket session.
//!
//! A session registers with the broadcaster, sends one snapshot, then relays
//! queued broadcasts until the peer goes away. Inbound frames only prove
//! liveness and are otherwise ignored.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::ingest::IngestGateway;
use crate::registry::{Payload, SubscriberId};

/// Lifecycle of a subscriber session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    Connecting,
    Active,
    Closed,
}

/// Why an active session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CloseReason {
    PeerClosed,
    DroppedByBroadcaster,
}

/// Session errors.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Websocket transport error: {0}")]
    Transport(#[from] axum::Error),

    #[error("Failed to encode snapshot: {0}")]
    Encode(#[from] serde_json::Error),
}

pub struct SubscriberSession {
    gateway: Arc<IngestGateway>,
    queue_capacity: usize,
    state: SessionState,
}

impl SubscriberSession {
    pub const fn new(gateway: Arc<IngestGateway>, queue_capacity: usize) -> Self {
        Self {
            gateway,
            queue_capacity,
            state: SessionState::Connecting,
        }
    }

    /// Drive the session to completion. Always unregisters on exit.
    pub async fn run(mut self, socket: WebSocket) {
        let (id, outbound) = self
            .gateway
            .broadcaster()
            .subscribe_socket(self.queue_capacity)
            .await;

        let result = self.relay(id, socket, outbound).await;
        self.gateway.broadcaster().unregister(id).await;

        // `reached` is Connecting when the snapshot never made it out.
        let reached = std::mem::replace(&mut self.state, SessionState::Closed);
        match result {
            Ok(reason) => debug!(subscriber_id = id, ?reached, ?reason, "Session closed"),
            Err(e) => warn!(subscriber_id = id, ?reached, error = %e, "Session closed with error"),
        }
    }

    async fn relay(
        &mut self,
        id: SubscriberId,
        socket: WebSocket,
        mut outbound: mpsc::Receiver<Payload>,
    ) -> Result<CloseReason, SessionError> {
        let (mut sender, mut receiver) = socket.split();

        let snapshot = serde_json::to_string(&self.gateway.snapshot().await)?;
        sender.send(Message::Text(snapshot.into())).await?;
        self.state = SessionState::Active;
        debug!(subscriber_id = id, state = ?self.state, "Snapshot sent");

        loop {
            tokio::select! {
                inbound = receiver.next() => match inbound {
                    None | Some(Ok(Message::Close(_))) => return Ok(CloseReason::PeerClosed),
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(e.into()),
                },
                queued = outbound.recv() => match queued {
                    Some(payload) => {
                        sender.send(Message::Text(payload)).await?;
                    }
                    None => return Ok(CloseReason::DroppedByBroadcaster),
                },
            }
        }
    }
}

