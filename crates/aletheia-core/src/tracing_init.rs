//! Tracing setup for the controller binary and for producer processes that
//! embed the client.
//!
//! `RUST_LOG` wins when set; otherwise the crate and the HTTP layer log at the
//! configured level. A bad directive is a configuration error rather than a
//! silent fallback.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::error::{Error, Result};

/// Install the global subscriber for `crate_name` at `level`, as JSON lines
/// when `log_json` is set.
pub fn init_tracing(crate_name: &str, level: &str, log_json: bool) -> Result<()> {
    let env_filter = build_filter(crate_name, level, std::env::var("RUST_LOG").ok())?;
    let registry = tracing_subscriber::registry().with(env_filter);
    let installed = if log_json {
        registry
            .with(tracing_subscriber::fmt::layer().json().flatten_event(true))
            .try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    };
    installed.map_err(|e| Error::Config(format!("Failed to install tracing subscriber: {e}")))
}

/// Default directive for a crate at the given level,
/// e.g. `default_filter("aletheia_controller", "debug")`.
pub fn default_filter(crate_name: &str, level: &str) -> String {
    format!("{crate_name}={level},tower_http={level}")
}

fn build_filter(crate_name: &str, level: &str, rust_log: Option<String>) -> Result<EnvFilter> {
    let directives = rust_log
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| default_filter(crate_name, level.trim()));
    EnvFilter::try_new(&directives)
        .map_err(|e| Error::Config(format!("Invalid log filter '{directives}': {e}")))
}
