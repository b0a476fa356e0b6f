use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::broker::topic::Offset;
use crate::record::level::LogLevel;
use crate::utils::error::ValidationError;

/// A log record as submitted by a producer, before validation.
///
/// Every field is optional so that a missing `service` or `level` is reported
/// as a [`ValidationError`] instead of a deserialization failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogCandidate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

impl LogCandidate {
    pub fn new(service: &str, level: &str, message: &str) -> Self {
        Self {
            service: Some(service.to_string()),
            level: Some(level.to_string()),
            message: Some(message.to_string()),
            timestamp: None,
            metadata: None,
        }
    }

    pub fn with_timestamp(mut self, timestamp: &str) -> Self {
        self.timestamp = Some(timestamp.to_string());
        self
    }

    pub fn with_metadata(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.metadata
            .get_or_insert_with(Map::new)
            .insert(key.to_string(), value.into());
        self
    }
}

/// A validated log record. Producer-owned fields only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub service: String,
    pub level: LogLevel,
    pub message: String,
    pub timestamp: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

/// A log record stored in a topic, carrying the broker-assigned fields.
///
/// Serializes flat: the producer fields and the broker fields share one
/// JSON object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    #[serde(flatten)]
    pub entry: LogEntry,
    pub offset: Offset,
    pub topic: String,
    pub partition: u32,
    /// Milliseconds since the UNIX epoch at which the broker accepted the record.
    pub broker_timestamp: i64,
}

impl LogRecord {
    pub fn service(&self) -> &str {
        &self.entry.service
    }

    pub fn level(&self) -> LogLevel {
        self.entry.level
    }

    pub fn matches(&self, filter: &LogFilter) -> bool {
        filter
            .service
            .as_deref()
            .is_none_or(|service| self.entry.service == service)
            && filter.level.is_none_or(|level| self.entry.level == level)
    }
}

/// Exact-match filter over `service` and `level`. Empty filter matches all.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogFilter {
    pub service: Option<String>,
    pub level: Option<LogLevel>,
}

/// Validate a candidate and fill in defaults.
///
/// - `service` must be present and non-blank
/// - `level` must be present and name one of the [`LogLevel`] variants
///   (case-insensitive, aliases accepted)
/// - `message` defaults to the empty string
/// - `timestamp` defaults to the current UTC time with millisecond precision
/// - `metadata` defaults to an empty map
pub fn validate(candidate: LogCandidate) -> Result<LogEntry, ValidationError> {
    let service = match candidate.service {
        Some(service) if !service.trim().is_empty() => service,
        _ => return Err(ValidationError::MissingService),
    };

    let level = candidate
        .level
        .ok_or(ValidationError::MissingLevel)?
        .parse::<LogLevel>()?;

    let timestamp = candidate
        .timestamp
        .unwrap_or_else(|| Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true));

    Ok(LogEntry {
        service,
        level,
        message: candidate.message.unwrap_or_default(),
        timestamp,
        metadata: candidate.metadata.unwrap_or_default(),
    })
}

impl TryFrom<LogCandidate> for LogEntry {
    type Error = ValidationError;

    fn try_from(candidate: LogCandidate) -> Result<Self, Self::Error> {
        validate(candidate)
    }
}
