//! Aletheia Client Library
//!
//! Helpers for producer services that push telemetry to the controller:
//! - [`ControllerClient`] for logs, metrics and stop commands
//! - [`MetricsReporter`] for periodic metric snapshots

pub mod client;
pub mod reporter;

pub use client::{ClientError, ControllerClient};
pub use reporter::MetricsReporter;
