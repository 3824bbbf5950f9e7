//! Configuration resolution for the controller and its producers.
//!
//! Implements hierarchical config resolution:
//! 1. Built-in defaults
//! 2. Config file (explicit path, or ~/.config/aletheia/controller.json)
//! 3. Environment variables
//! 4. CLI arguments (highest priority, applied by the binaries)

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Environment variable naming the controller base URL for producers.
pub const CONTROLLER_URL_ENV: &str = "CONTROLLER_BASE_URL";
/// Environment variable holding the producer request timeout in seconds.
pub const CONTROLLER_TIMEOUT_ENV: &str = "CONTROLLER_TIMEOUT";

const DEFAULT_CLIENT_TIMEOUT_SECS: f64 = 5.0;
const DEFAULT_CLIENT_TIMEOUT: Duration = Duration::from_secs(5);

/// Complete Aletheia configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub controller: ControllerConfig,
    #[serde(default)]
    pub client: ClientConfig,
}

/// Controller server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    pub addr: SocketAddr,
    pub log_level: String,
    pub log_json: bool,
    /// Outbound queue depth per websocket subscriber. A subscriber whose
    /// queue fills up is dropped.
    pub subscriber_queue: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            log_level: "info".to_string(),
            log_json: false,
            subscriber_queue: 256,
        }
    }
}

/// Producer-side client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Controller base URL. `None` disables the client entirely.
    pub base_url: Option<String>,
    pub timeout_secs: f64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_secs: DEFAULT_CLIENT_TIMEOUT_SECS,
        }
    }
}

impl ClientConfig {
    /// Client settings from `CONTROLLER_BASE_URL` / `CONTROLLER_TIMEOUT` only.
    pub fn from_env() -> Self {
        let mut config = Config::default();
        apply_overrides(&mut config, |key| std::env::var(key).ok());
        config.client
    }

    /// Request timeout, falling back to the default for values that are not
    /// a positive, representable number of seconds.
    pub fn timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.timeout_secs)
            .ok()
            .filter(|timeout| !timeout.is_zero())
            .unwrap_or(DEFAULT_CLIENT_TIMEOUT)
    }
}

/// Load configuration with hierarchical resolution.
///
/// An explicit `path` must exist; the global file is optional.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let mut config = Config::default();

    match path {
        Some(path) => {
            let file = load_config_file(path)?;
            merge_config(&mut config, file);
        }
        None => {
            if let Some(global_path) = global_config_path()
                && global_path.exists()
            {
                let global = load_config_file(&global_path)?;
                merge_config(&mut config, global);
            }
        }
    }

    apply_overrides(&mut config, |key| std::env::var(key).ok());

    Ok(config)
}

/// Get the global config file path.
pub fn global_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("aletheia").join("controller.json"))
}

fn load_config_file(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&content).map_err(|e| {
        Error::Config(format!("Failed to parse config file {}: {}", path.display(), e))
    })
}

fn merge_config(base: &mut Config, overlay: Config) {
    base.controller = overlay.controller;

    if overlay.client.base_url.is_some() {
        base.client.base_url = overlay.client.base_url;
    }
    base.client.timeout_secs = overlay.client.timeout_secs;
}

/// Apply environment overrides read through `lookup`.
///
/// Unparsable values are ignored, except for the client timeout which falls
/// back to its default.
pub fn apply_overrides(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(val) = lookup("CONTROLLER_ADDR")
        && let Ok(addr) = val.parse()
    {
        config.controller.addr = addr;
    }
    if let Some(val) = lookup("CONTROLLER_LOG_LEVEL") {
        config.controller.log_level = val;
    }
    if let Some(val) = lookup("CONTROLLER_SUBSCRIBER_QUEUE")
        && let Ok(n) = val.parse::<usize>()
        && n > 0
    {
        config.controller.subscriber_queue = n;
    }
    if let Some(val) = lookup(CONTROLLER_URL_ENV) {
        let trimmed = val.trim().trim_end_matches('/');
        config.client.base_url = (!trimmed.is_empty()).then(|| trimmed.to_string());
    }
    if let Some(val) = lookup(CONTROLLER_TIMEOUT_ENV) {
        config.client.timeout_secs = val.trim().parse().unwrap_or(DEFAULT_CLIENT_TIMEOUT_SECS);
    }
}
