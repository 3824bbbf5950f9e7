//! Translates producer calls into buffer and stop-signal mutations, then
//! broadcasts the change to every subscriber.

use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use aletheia_core::schema::StreamMessage;
use aletheia_core::{LogEvent, LogLevel, MetricSnapshot, StopCommand, StopStatus};

use crate::buffer::EventBuffer;
use crate::registry::BroadcastManager;
use crate::signal::{StopSignal, StopSignalError};

/// Logs retained in memory.
pub const LOG_BUFFER_SIZE: usize = 1000;
/// Metric snapshots retained in memory.
pub const METRIC_BUFFER_SIZE: usize = 500;
/// Logs and metrics included in a subscriber's initial snapshot.
pub const SNAPSHOT_SIZE: usize = 100;

/// Owns all controller state. Created once at startup and shared by
/// reference with every handler.
pub struct IngestGateway {
    logs: EventBuffer<LogEvent>,
    metrics: EventBuffer<MetricSnapshot>,
    stop: StopSignal,
    /// Held across a stop mutation and its broadcast, so subscribers receive
    /// `stop_status` messages in the order the flag changed.
    stop_order: Mutex<()>,
    broadcaster: BroadcastManager,
}

impl IngestGateway {
    pub fn new() -> Self {
        Self {
            logs: EventBuffer::new(LOG_BUFFER_SIZE),
            metrics: EventBuffer::new(METRIC_BUFFER_SIZE),
            stop: StopSignal::new(),
            stop_order: Mutex::new(()),
            broadcaster: BroadcastManager::new(),
        }
    }

    /// Store a log event and broadcast it.
    pub async fn ingest_log(&self, event: LogEvent) -> Result<(), IngestError> {
        event.validate()?;
        mirror_log(&event);
        self.logs.append(event.clone()).await;
        self.publish(&StreamMessage::Log { item: event }).await?;
        Ok(())
    }

    /// Store a metric snapshot and broadcast it.
    pub async fn ingest_metric(&self, snapshot: MetricSnapshot) -> Result<(), IngestError> {
        snapshot.validate()?;
        self.metrics.append(snapshot.clone()).await;
        self.publish(&StreamMessage::Metric { item: snapshot }).await?;
        Ok(())
    }

    /// Raise the stop signal. Always succeeds for a valid command.
    pub async fn trigger_stop(&self, command: StopCommand) -> Result<StopStatus, IngestError> {
        command.validate()?;
        let _order = self.stop_order.lock().await;
        let status = self.stop.trigger(command).await;
        self.broadcast_stop_status(&status).await?;
        Ok(status)
    }

    /// Lower the stop signal, or fail with a conflict when it is not raised.
    pub async fn clear_stop(&self) -> Result<StopStatus, IngestError> {
        let _order = self.stop_order.lock().await;
        let status = self.stop.clear().await?;
        self.broadcast_stop_status(&status).await?;
        Ok(status)
    }

    pub async fn stop_status(&self) -> StopStatus {
        self.stop.status().await
    }

    /// Most recent logs, oldest first. `limit` is clamped into
    /// `1..=LOG_BUFFER_SIZE`.
    pub async fn recent_logs(&self, limit: usize) -> Vec<LogEvent> {
        self.logs.recent(clamp_limit(limit, self.logs.capacity())).await
    }

    /// Most recent metrics, oldest first. `limit` is clamped into
    /// `1..=METRIC_BUFFER_SIZE`.
    pub async fn recent_metrics(&self, limit: usize) -> Vec<MetricSnapshot> {
        self.metrics
            .recent(clamp_limit(limit, self.metrics.capacity()))
            .await
    }

    /// Initial state for a newly connected subscriber.
    pub async fn snapshot(&self) -> StreamMessage {
        StreamMessage::Snapshot {
            logs: self.logs.recent(SNAPSHOT_SIZE).await,
            metrics: self.metrics.recent(SNAPSHOT_SIZE).await,
            stop_status: self.stop.status().await,
        }
    }

    pub const fn broadcaster(&self) -> &BroadcastManager {
        &self.broadcaster
    }

    /// The stop signal, for in-process tasks that want to
    /// [`watch`](StopSignal::watch) or
    /// [`wait_until_active`](StopSignal::wait_until_active).
    pub const fn stop_signal(&self) -> &StopSignal {
        &self.stop
    }

    async fn broadcast_stop_status(&self, status: &StopStatus) -> Result<(), IngestError> {
        self.publish(&StreamMessage::StopStatus {
            item: status.clone(),
        })
        .await?;
        Ok(())
    }

    async fn publish(&self, message: &StreamMessage) -> Result<usize, IngestError> {
        let delivered = self.broadcaster.broadcast(message).await?;
        debug!(kind = message.kind(), delivered, "Published stream message");
        Ok(delivered)
    }
}

impl Default for IngestGateway {
    fn default() -> Self {
        Self::new()
    }
}

fn clamp_limit(limit: usize, capacity: usize) -> usize {
    limit.clamp(1, capacity)
}

/// Echo a producer log into the controller's own log stream at the
/// matching severity. `CRITICAL` has no tracing counterpart and maps to
/// `ERROR`; the original name stays in the `level` field.
fn mirror_log(event: &LogEvent) {
    let (component, level, message) = (&event.component, event.level, &event.message);
    match level {
        LogLevel::Debug => debug!(%component, %level, "{message}"),
        LogLevel::Info => info!(%component, %level, "{message}"),
        LogLevel::Warning => warn!(%component, %level, "{message}"),
        LogLevel::Error | LogLevel::Critical => error!(%component, %level, "{message}"),
    }
}

/// Ingest errors.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Conflict(#[from] StopSignalError),

    #[error("Failed to encode broadcast: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("{0}")]
    Internal(String),
}

impl From<aletheia_core::Error> for IngestError {
    fn from(e: aletheia_core::Error) -> Self {
        match e {
            aletheia_core::Error::Validation(msg) => Self::Validation(msg),
            other @ aletheia_core::Error::Config(_) => Self::Internal(other.to_string()),
        }
    }
}
