//! Periodic metrics push loop.
//!
//! Producers supply a collector returning whatever metrics they track; the
//! reporter tags the block with `"event": "system_metrics"`, pushes it, and
//! sleeps until the next tick or until shutdown is requested.

use std::time::Duration;

use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, info};

use aletheia_core::schema::JsonObject;

use crate::client::{ClientError, ControllerClient};

const EVENT_KEY: &str = "event";
const EVENT_NAME: &str = "system_metrics";

pub struct MetricsReporter<F> {
    client: ControllerClient,
    interval: Duration,
    collect: F,
}

impl<F> MetricsReporter<F>
where
    F: FnMut() -> JsonObject + Send,
{
    pub const fn new(client: ControllerClient, interval: Duration, collect: F) -> Self {
        Self {
            client,
            interval,
            collect,
        }
    }

    /// Build the payload for one tick. `None` when the collector had nothing
    /// to report.
    fn next_payload(&mut self) -> Option<JsonObject> {
        let metrics = (self.collect)();
        if metrics.is_empty() {
            return None;
        }
        let mut payload = JsonObject::new();
        payload.insert(EVENT_KEY.to_string(), Value::from(EVENT_NAME));
        payload.extend(metrics);
        Some(payload)
    }

    /// Run until `shutdown` turns `true` or its sender is dropped. Returns the
    /// number of snapshots the controller accepted.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> u64 {
        info!(interval_secs = self.interval.as_secs_f64(), "Starting metrics reporter");
        let mut pushed = 0u64;

        loop {
            if *shutdown.borrow_and_update() {
                break;
            }

            match self.next_payload() {
                Some(payload) => match self.client.try_emit_metric(payload).await {
                    Ok(()) => pushed += 1,
                    Err(ClientError::Disabled) => {}
                    Err(e) => debug!(error = %e, "Failed to push metrics"),
                },
                None => debug!("Collector returned no metrics; skipping push"),
            }

            tokio::select! {
                () = tokio::time::sleep(self.interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!(pushed, "Metrics reporter stopped");
        pushed
    }
}
