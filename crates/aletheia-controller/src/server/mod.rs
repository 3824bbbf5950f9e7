//! HTTP surface for the controller: ingest routes, stop commands, the
//! websocket stream and the dashboard shell.

pub mod error;
pub mod routes;
pub mod stream;

use std::future::Future;

use axum::Router;
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

pub use error::ApiError;
pub use routes::AppState;
pub use stream::SubscriberSession;

/// Build the full route table with request-id, tracing and CORS layers.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(routes::dashboard))
        .route("/health", get(routes::health))
        .route("/ws/stream", get(routes::stream))
        .route("/ingest/logs", post(routes::ingest_log))
        .route("/ingest/metrics", post(routes::ingest_metric))
        .route(
            "/commands/stop",
            get(routes::get_stop_status).post(routes::trigger_stop),
        )
        .route("/commands/stop/reset", post(routes::clear_stop))
        .route("/logs/latest", get(routes::list_recent_logs))
        .route("/metrics/latest", get(routes::list_recent_metrics))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// Serve the controller on `listener` until `shutdown` resolves.
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let addr = listener.local_addr()?;
    info!(addr = %addr, "Controller listening");
    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown)
        .await
}
