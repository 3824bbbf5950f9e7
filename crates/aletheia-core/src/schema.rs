//! Wire schema shared by the controller and its producers.
//!
//! Every type here is immutable once built and serializes to the JSON shape
//! the HTTP routes and the websocket stream exchange. Timestamps are UTC and
//! default to "now" when a producer omits them.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Arbitrary JSON object carried by log contexts and metric payloads.
pub type JsonObject = Map<String, Value>;

/// Severity of a [`LogEvent`].
///
/// Parsed case-insensitively (`"warn"` and `"Warning"` both map to
/// [`LogLevel::Warning`]) and always written in upper case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[derive(Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warning,
    Error,
    Critical,
}

impl LogLevel {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
            Self::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DEBUG" => Ok(Self::Debug),
            "INFO" => Ok(Self::Info),
            "WARN" | "WARNING" => Ok(Self::Warning),
            "ERROR" => Ok(Self::Error),
            "CRITICAL" | "FATAL" => Ok(Self::Critical),
            other => Err(Error::Validation(format!("unknown log level '{other}'"))),
        }
    }
}

impl TryFrom<String> for LogLevel {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<LogLevel> for String {
    fn from(level: LogLevel) -> Self {
        level.as_str().to_string()
    }
}

/// Structured log entry emitted by a producer component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEvent {
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    /// Sender component identifier.
    pub component: String,
    #[serde(default)]
    pub level: LogLevel,
    pub message: String,
    #[serde(default)]
    pub context: Option<JsonObject>,
}

impl LogEvent {
    pub fn new(component: impl Into<String>, level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            component: component.into(),
            level,
            message: message.into(),
            context: None,
        }
    }

    #[must_use]
    pub fn with_context(mut self, context: JsonObject) -> Self {
        self.context = Some(context);
        self
    }

    pub fn validate(&self) -> Result<()> {
        require_non_blank("component", &self.component)
    }
}

/// Metrics block describing service or hardware state at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSnapshot {
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    /// Sender component identifier.
    pub component: String,
    /// Producer-defined metrics (db stats, gpu utilisation, ...).
    #[serde(default)]
    pub payload: JsonObject,
}

impl MetricSnapshot {
    pub fn new(component: impl Into<String>, payload: JsonObject) -> Self {
        Self {
            timestamp: Utc::now(),
            component: component.into(),
            payload,
        }
    }

    pub fn validate(&self) -> Result<()> {
        require_non_blank("component", &self.component)
    }
}

/// Emergency stop command issued by an operator or a service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopCommand {
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    /// Who issued the stop command.
    pub initiator: String,
    #[serde(default)]
    pub reason: Option<String>,
}

impl StopCommand {
    pub fn new(initiator: impl Into<String>, reason: Option<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            initiator: initiator.into(),
            reason,
        }
    }

    pub fn validate(&self) -> Result<()> {
        require_non_blank("initiator", &self.initiator)
    }
}

/// State of the stop signal as seen by consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopStatus {
    pub active: bool,
    pub last_command: Option<StopCommand>,
}

/// Messages pushed to websocket subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamMessage {
    /// Initial state dump sent once per connection.
    Snapshot {
        logs: Vec<LogEvent>,
        metrics: Vec<MetricSnapshot>,
        stop_status: StopStatus,
    },
    Log {
        item: LogEvent,
    },
    Metric {
        item: MetricSnapshot,
    },
    StopStatus {
        item: StopStatus,
    },
}

impl StreamMessage {
    /// Value of the `type` tag.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Snapshot { .. } => "snapshot",
            Self::Log { .. } => "log",
            Self::Metric { .. } => "metric",
            Self::StopStatus { .. } => "stop_status",
        }
    }
}

fn require_non_blank(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::Validation(format!("{field} must not be empty")));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn log_event_defaults_level_and_timestamp() {
        let event: LogEvent =
            serde_json::from_value(json!({"component": "front", "message": "hello"})).unwrap();
        assert_eq!(event.level, LogLevel::Info);
        assert!(event.context.is_none());
        assert!(event.timestamp <= Utc::now());
    }

    #[test]
    fn log_level_parses_case_insensitively() {
        assert_eq!("warning".parse::<LogLevel>().unwrap(), LogLevel::Warning);
        assert_eq!("WARN".parse::<LogLevel>().unwrap(), LogLevel::Warning);
        assert_eq!(" error ".parse::<LogLevel>().unwrap(), LogLevel::Error);
        assert!("verbose".parse::<LogLevel>().is_err());
    }

    #[test]
    fn log_level_serializes_upper_case() {
        let event = LogEvent::new("back", LogLevel::Critical, "boom");
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["level"], "CRITICAL");
    }

    #[test]
    fn unknown_level_is_rejected_on_decode() {
        let result: std::result::Result<LogEvent, _> = serde_json::from_value(
            json!({"component": "front", "level": "loud", "message": "x"}),
        );
        assert!(result.is_err());
    }

    #[test]
    fn blank_component_fails_validation() {
        let event = LogEvent::new("   ", LogLevel::Info, "x");
        assert!(matches!(event.validate(), Err(Error::Validation(_))));

        let snapshot = MetricSnapshot::new("", JsonObject::new());
        assert!(snapshot.validate().is_err());

        let command = StopCommand::new("", None);
        assert!(command.validate().is_err());
    }

    #[test]
    fn stop_status_serializes_null_last_command() {
        let status = StopStatus {
            active: false,
            last_command: None,
        };
        assert_eq!(
            serde_json::to_value(&status).unwrap(),
            json!({"active": false, "last_command": null})
        );
    }

    #[test]
    fn stream_message_is_tagged_by_type() {
        let message = StreamMessage::Metric {
            item: MetricSnapshot::new("back", json!({"cpu": 1}).as_object().cloned().unwrap()),
        };
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["type"], "metric");
        assert_eq!(value["item"]["payload"]["cpu"], 1);
        assert_eq!(message.kind(), "metric");

        let snapshot = StreamMessage::Snapshot {
            logs: vec![],
            metrics: vec![],
            stop_status: StopStatus {
                active: true,
                last_command: None,
            },
        };
        let value = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(value["type"], "snapshot");
        assert_eq!(value["stop_status"]["active"], true);
    }
}
