use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use aletheia_core::{LogEvent, MetricSnapshot, StopCommand, StopStatus};

use super::error::ApiError;
use super::stream::SubscriberSession;
use crate::ingest::IngestGateway;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<IngestGateway>,
    /// Outbound queue depth for each websocket subscriber.
    pub subscriber_queue: usize,
}

impl AppState {
    pub const fn new(gateway: Arc<IngestGateway>, subscriber_queue: usize) -> Self {
        Self {
            gateway,
            subscriber_queue,
        }
    }
}

const DASHBOARD_HTML: &str = include_str!("dashboard.html");
const DEFAULT_LIMIT: usize = 100;

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    limit: Option<i64>,
}

impl LimitQuery {
    fn resolve(&self) -> usize {
        self.limit
            .map_or(DEFAULT_LIMIT, |n| usize::try_from(n.max(1)).unwrap_or(usize::MAX))
    }
}

/// Response body for list endpoints.
#[derive(Debug, Serialize)]
pub struct Items<T> {
    pub items: Vec<T>,
}

fn status_body(status: &str) -> Json<Value> {
    Json(json!({ "status": status }))
}

/// `GET /`: dashboard shell. Live data arrives over the websocket.
pub async fn dashboard() -> Html<&'static str> {
    Html(DASHBOARD_HTML)
}

/// `GET /health`
pub async fn health() -> Json<Value> {
    status_body("ok")
}

/// `GET /ws/stream`: snapshot, then live broadcasts.
pub async fn stream(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| {
        SubscriberSession::new(state.gateway, state.subscriber_queue).run(socket)
    })
}

/// `POST /ingest/logs`
pub async fn ingest_log(
    State(state): State<AppState>,
    body: Result<Json<LogEvent>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(event) = body?;
    state.gateway.ingest_log(event).await?;
    Ok((StatusCode::ACCEPTED, status_body("accepted")))
}

/// `POST /ingest/metrics`
pub async fn ingest_metric(
    State(state): State<AppState>,
    body: Result<Json<MetricSnapshot>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(snapshot) = body?;
    state.gateway.ingest_metric(snapshot).await?;
    Ok((StatusCode::ACCEPTED, status_body("accepted")))
}

/// `GET /commands/stop`
pub async fn get_stop_status(State(state): State<AppState>) -> Json<StopStatus> {
    Json(state.gateway.stop_status().await)
}

/// `POST /commands/stop`
pub async fn trigger_stop(
    State(state): State<AppState>,
    body: Result<Json<StopCommand>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(command) = body?;
    state.gateway.trigger_stop(command).await?;
    Ok((StatusCode::ACCEPTED, status_body("stop_signal_active")))
}

/// `POST /commands/stop/reset`
pub async fn clear_stop(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    state.gateway.clear_stop().await?;
    Ok((StatusCode::ACCEPTED, status_body("stop_signal_cleared")))
}

/// `GET /logs/latest?limit=N`
pub async fn list_recent_logs(
    State(state): State<AppState>,
    query: Result<Query<LimitQuery>, QueryRejection>,
) -> Result<Json<Items<LogEvent>>, ApiError> {
    let Query(query) = query?;
    let items = state.gateway.recent_logs(query.resolve()).await;
    Ok(Json(Items { items }))
}

/// `GET /metrics/latest?limit=N`
pub async fn list_recent_metrics(
    State(state): State<AppState>,
    query: Result<Query<LimitQuery>, QueryRejection>,
) -> Result<Json<Items<MetricSnapshot>>, ApiError> {
    let Query(query) = query?;
    let items = state.gateway.recent_metrics(query.resolve()).await;
    Ok(Json(Items { items }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_defaults_to_hundred() {
        assert_eq!(LimitQuery { limit: None }.resolve(), 100);
    }

    #[test]
    fn negative_limit_becomes_one() {
        assert_eq!(LimitQuery { limit: Some(-5) }.resolve(), 1);
        assert_eq!(LimitQuery { limit: Some(0) }.resolve(), 1);
        assert_eq!(LimitQuery { limit: Some(42) }.resolve(), 42);
    }
}
