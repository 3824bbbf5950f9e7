//! Aletheia Controller Library
//!
//! Core functionality for the telemetry/control relay:
//! - Bounded in-memory buffers for recent logs and metrics
//! - Emergency stop signal with command history
//! - Subscriber registry with best-effort broadcast fan-out
//! - Ingest gateway tying the above together
//! - HTTP routes and websocket sessions

pub mod buffer;
pub mod ingest;
pub mod registry;
pub mod server;
pub mod signal;

pub use ingest::{IngestError, IngestGateway};
pub use registry::BroadcastManager;
pub use server::{AppState, build_router, serve};
pub use signal::{StopSignal, StopSignalError};
