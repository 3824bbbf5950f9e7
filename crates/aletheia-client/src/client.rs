//! HTTP client for the controller's ingest and stop-command routes.
//!
//! A client built without a base URL is disabled: every call returns
//! immediately without touching the network. Emit failures are logged at
//! debug level and never reach the caller.

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use aletheia_core::schema::JsonObject;
use aletheia_core::{ClientConfig, LogEvent, LogLevel, MetricSnapshot, StopCommand, StopStatus};

/// Controller client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Controller error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Controller client is disabled")]
    Disabled,
}

#[derive(Debug)]
struct Endpoint {
    http: reqwest::Client,
    base_url: String,
}

/// Lightweight, cloneable handle on the controller REST API.
#[derive(Debug, Clone)]
pub struct ControllerClient {
    component: String,
    endpoint: Option<Arc<Endpoint>>,
}

impl ControllerClient {
    /// Create a client for `component`. Disabled when `config.base_url` is
    /// unset.
    pub fn new(component: impl Into<String>, config: &ClientConfig) -> Result<Self, ClientError> {
        let component = component.into();
        let endpoint = match config.base_url.as_deref() {
            Some(url) if !url.trim().is_empty() => {
                // The `Err` case just means a provider was already installed.
                let _ = rustls::crypto::ring::default_provider().install_default();

                let http = reqwest::Client::builder()
                    .timeout(config.timeout())
                    .build()?;
                Some(Arc::new(Endpoint {
                    http,
                    base_url: url.trim().trim_end_matches('/').to_string(),
                }))
            }
            _ => None,
        };

        debug!(
            component = %component,
            base_url = endpoint.as_ref().map_or("", |e| e.base_url.as_str()),
            timeout_secs = config.timeout().as_secs_f64(),
            "Controller client initialised"
        );
        Ok(Self {
            component,
            endpoint,
        })
    }

    /// Create a client configured from `CONTROLLER_BASE_URL` and
    /// `CONTROLLER_TIMEOUT`.
    pub fn from_env(component: impl Into<String>) -> Result<Self, ClientError> {
        Self::new(component, &ClientConfig::from_env())
    }

    /// A client that never sends anything.
    pub fn disabled(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            endpoint: None,
        }
    }

    pub const fn is_enabled(&self) -> bool {
        self.endpoint.is_some()
    }

    pub fn component(&self) -> &str {
        &self.component
    }

    pub fn base_url(&self) -> Option<&str> {
        self.endpoint.as_deref().map(|e| e.base_url.as_str())
    }

    /// Push a log event attributed to this client's component.
    pub async fn emit_log(&self, level: LogLevel, message: &str, context: Option<JsonObject>) {
        if !self.is_enabled() {
            return;
        }
        let event = LogEvent::new(&self.component, level, message);
        let event = match context {
            Some(context) => event.with_context(context),
            None => event,
        };
        self.post_quietly("/ingest/logs", &event).await;
    }

    /// Push a metrics snapshot attributed to this client's component.
    pub async fn emit_metric(&self, payload: JsonObject) {
        if !self.is_enabled() {
            return;
        }
        if let Err(e) = self.try_emit_metric(payload).await {
            debug!(path = "/ingest/metrics", error = %e, "Failed to POST to controller");
        }
    }

    /// Push a metrics snapshot, surfacing failures.
    pub async fn try_emit_metric(&self, payload: JsonObject) -> Result<(), ClientError> {
        let snapshot = MetricSnapshot::new(&self.component, payload);
        self.post("/ingest/metrics", &snapshot).await
    }

    /// Ask the controller to raise the emergency stop.
    pub async fn send_stop_command(&self, command: &StopCommand) {
        if !self.is_enabled() {
            return;
        }
        self.post_quietly("/commands/stop", command).await;
    }

    /// Poll the stop signal. `None` when disabled or unreachable.
    pub async fn fetch_stop_status(&self) -> Option<StopStatus> {
        match self.try_fetch_stop_status().await {
            Ok(status) => Some(status),
            Err(ClientError::Disabled) => None,
            Err(e) => {
                debug!(error = %e, "Failed to fetch stop status from controller");
                None
            }
        }
    }

    /// Poll the stop signal, surfacing failures.
    pub async fn try_fetch_stop_status(&self) -> Result<StopStatus, ClientError> {
        let endpoint = self.endpoint.as_deref().ok_or(ClientError::Disabled)?;
        let resp = endpoint
            .http
            .get(format!("{}/commands/stop", endpoint.base_url))
            .send()
            .await?;
        let resp = check_status(resp).await?;
        Ok(resp.json().await?)
    }

    /// Fire-and-forget [`emit_log`](Self::emit_log) on the current runtime.
    /// Dropped when called outside a tokio runtime.
    pub fn emit_log_nowait(&self, level: LogLevel, message: impl Into<String>, context: Option<JsonObject>) {
        if !self.is_enabled() {
            return;
        }
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            debug!("emit_log_nowait called without a runtime; dropping event");
            return;
        };
        let client = self.clone();
        let message = message.into();
        handle.spawn(async move { client.emit_log(level, &message, context).await });
    }

    /// Fire-and-forget [`emit_metric`](Self::emit_metric) on the current runtime.
    pub fn emit_metric_nowait(&self, payload: JsonObject) {
        if !self.is_enabled() {
            return;
        }
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            debug!("emit_metric_nowait called without a runtime; dropping event");
            return;
        };
        let client = self.clone();
        handle.spawn(async move { client.emit_metric(payload).await });
    }

    async fn post_quietly<T: serde::Serialize + ?Sized>(&self, path: &str, body: &T) {
        if let Err(e) = self.post(path, body).await {
            debug!(path, error = %e, "Failed to POST to controller");
        }
    }

    async fn post<T: serde::Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<(), ClientError> {
        let endpoint = self.endpoint.as_deref().ok_or(ClientError::Disabled)?;
        let resp = endpoint
            .http
            .post(format!("{}{path}", endpoint.base_url))
            .json(body)
            .send()
            .await?;
        check_status(resp).await?;
        Ok(())
    }
}

/// Turn a non-success response into [`ClientError::Api`], using the
/// controller's `detail` field when present.
async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, ClientError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let message = resp
        .json::<Value>()
        .await
        .ok()
        .and_then(|body| body.get("detail").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("Unknown").to_string());
    Err(ClientError::Api {
        status: status.as_u16(),
        message,
    })
}
