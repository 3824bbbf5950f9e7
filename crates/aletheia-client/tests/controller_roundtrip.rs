//! Client against a real controller bound to an ephemeral port.
#![allow(clippy::unwrap_used, clippy::panic)]

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::sync::{oneshot, watch};

use aletheia_client::{ClientError, ControllerClient, MetricsReporter};
use aletheia_controller::{AppState, IngestGateway, serve};
use aletheia_core::{ClientConfig, LogLevel, StopCommand};

struct Harness {
    client: ControllerClient,
    gateway: Arc<IngestGateway>,
    _shutdown: oneshot::Sender<()>,
}

async fn harness() -> Harness {
    let gateway = Arc::new(IngestGateway::new());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel::<()>();

    let state = AppState::new(Arc::clone(&gateway), 16);
    tokio::spawn(async move {
        serve(listener, state, async {
            let _ = rx.await;
        })
        .await
        .unwrap();
    });

    let config = ClientConfig {
        base_url: Some(format!("http://{addr}")),
        timeout_secs: 5.0,
    };
    Harness {
        client: ControllerClient::new("front", &config).unwrap(),
        gateway,
        _shutdown: tx,
    }
}

/// Poll until the gateway holds `n` metrics.
async fn wait_for_metrics(gateway: &IngestGateway, n: usize) {
    for _ in 0..200 {
        if gateway.recent_metrics(500).await.len() >= n {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("expected {n} metrics");
}

#[tokio::test]
async fn emit_log_reaches_controller() {
    let h = harness().await;
    let context = json!({"guild": 42}).as_object().cloned();

    h.client.emit_log(LogLevel::Warning, "rate limited", context).await;

    let logs = h.gateway.recent_logs(10).await;
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].component, "front");
    assert_eq!(logs[0].level, LogLevel::Warning);
    assert_eq!(logs[0].message, "rate limited");
    assert_eq!(logs[0].context.as_ref().unwrap()["guild"], 42);
}

#[tokio::test]
async fn emit_metric_reaches_controller() {
    let h = harness().await;
    h.client
        .emit_metric(json!({"gpu": {"util": 91}}).as_object().cloned().unwrap())
        .await;

    let metrics = h.gateway.recent_metrics(10).await;
    assert_eq!(metrics.len(), 1);
    assert_eq!(metrics[0].component, "front");
    assert_eq!(metrics[0].payload["gpu"]["util"], 91);
}

#[tokio::test]
async fn stop_command_round_trip() {
    let h = harness().await;
    let status = h.client.fetch_stop_status().await.unwrap();
    assert!(!status.active);
    assert!(status.last_command.is_none());

    h.client
        .send_stop_command(&StopCommand::new("front", Some("abuse detected".into())))
        .await;

    let status = h.client.fetch_stop_status().await.unwrap();
    assert!(status.active);
    let last = status.last_command.unwrap();
    assert_eq!(last.initiator, "front");
    assert_eq!(last.reason.as_deref(), Some("abuse detected"));
}

#[tokio::test]
async fn rejected_payload_is_swallowed() {
    let h = harness().await;
    let blank = ControllerClient::new(
        " ",
        &ClientConfig {
            base_url: h.client.base_url().map(str::to_string),
            timeout_secs: 5.0,
        },
    )
    .unwrap();

    blank.emit_log(LogLevel::Info, "nobody", None).await;
    assert!(h.gateway.recent_logs(10).await.is_empty());
}

#[tokio::test]
async fn unreachable_controller_yields_none() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = ControllerClient::new(
        "front",
        &ClientConfig {
            base_url: Some(format!("http://{addr}")),
            timeout_secs: 1.0,
        },
    )
    .unwrap();

    client.emit_log(LogLevel::Info, "lost", None).await;
    assert!(client.fetch_stop_status().await.is_none());
    assert!(matches!(
        client.try_fetch_stop_status().await,
        Err(ClientError::Http(_))
    ));
}

#[tokio::test]
async fn nowait_emit_is_delivered_in_background() {
    let h = harness().await;
    h.client
        .emit_metric_nowait(json!({"cpu": 5}).as_object().cloned().unwrap());
    wait_for_metrics(&h.gateway, 1).await;
    assert_eq!(h.gateway.recent_metrics(1).await[0].payload["cpu"], 5);
}

#[tokio::test]
async fn reporter_pushes_until_shutdown() {
    let h = harness().await;
    let (tx, rx) = watch::channel(false);
    let mut tick = 0u64;
    let reporter = MetricsReporter::new(h.client.clone(), Duration::from_millis(20), move || {
        tick += 1;
        json!({"tick": tick}).as_object().cloned().unwrap()
    });
    let task = tokio::spawn(reporter.run(rx));

    wait_for_metrics(&h.gateway, 2).await;
    tx.send(true).unwrap();
    let pushed = tokio::time::timeout(Duration::from_secs(2), task)
        .await
        .unwrap()
        .unwrap();
    assert!(pushed >= 2);

    let metrics = h.gateway.recent_metrics(500).await;
    assert_eq!(metrics[0].payload["event"], "system_metrics");
    assert_eq!(metrics[0].payload["tick"], 1);
    assert_eq!(metrics[1].payload["tick"], 2);
}
