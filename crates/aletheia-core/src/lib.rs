//! Aletheia Core Library
//!
//! Shared functionality for the controller and its producers:
//! - Wire schema for log events, metric snapshots and stop commands
//! - Configuration resolution and hierarchy
//! - Tracing initialisation
//! - Common error types

pub mod config;
pub mod error;
pub mod schema;
pub mod tracing_init;

pub use config::{ClientConfig, Config, ControllerConfig};
pub use error::{Error, Result};
pub use schema::{LogEvent, LogLevel, MetricSnapshot, StopCommand, StopStatus};
