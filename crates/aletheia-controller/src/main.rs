//! Aletheia Controller
//!
//! Telemetry relay with an emergency-stop signal and a live dashboard stream.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::info;

use aletheia_controller::{AppState, IngestGateway, serve};
use aletheia_core::config::load_config;
use aletheia_core::tracing_init::init_tracing;

#[derive(Parser, Debug)]
#[command(name = "aletheia-controller")]
#[command(version, about = "Aletheia controller - telemetry relay and emergency stop")]
struct Args {
    /// Path to a JSON config file.
    #[arg(long, env = "CONTROLLER_CONFIG")]
    config: Option<PathBuf>,

    /// Address to listen on (overrides config).
    #[arg(long)]
    addr: Option<SocketAddr>,

    /// Outbound queue depth per websocket subscriber (overrides config).
    #[arg(long)]
    subscriber_queue: Option<usize>,

    /// Default log level when `RUST_LOG` is unset (overrides config).
    #[arg(long)]
    log_level: Option<String>,

    /// Output logs as JSON (for structured log aggregation).
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = load_config(args.config.as_deref())?.controller;
    if let Some(addr) = args.addr {
        config.addr = addr;
    }
    if let Some(n) = args.subscriber_queue {
        config.subscriber_queue = n.max(1);
    }
    if let Some(level) = args.log_level {
        config.log_level = level;
    }
    config.log_json |= args.log_json;

    init_tracing("aletheia_controller", &config.log_level, config.log_json)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        addr = %config.addr,
        subscriber_queue = config.subscriber_queue,
        "Starting aletheia-controller"
    );

    let gateway = Arc::new(IngestGateway::new());
    let state = AppState::new(gateway, config.subscriber_queue);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    serve(listener, state, async {
        let _ = tokio::signal::ctrl_c().await;
        info!("Received shutdown signal");
    })
    .await?;

    info!("Controller stopped");
    Ok(())
}
