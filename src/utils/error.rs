//! The `error` module defines the error types shared across `logstream`.
//!
//! - [`ValidationError`]: a candidate log record was malformed (caller's fault).
//! - [`BrokerError`]: failures surfaced by broker operations.
//! - [`DeliveryError`]: a subscriber could not process a delivered record.
//! - [`DatasetError`]: the seed dataset could not be loaded or indexed.
//!
//! Out-of-memory while appending is not represented; it aborts the process.

use crate::broker::subscription::SubscriptionId;

/// A candidate record failed validation and was not appended anywhere.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("field `service` is required and must not be empty")]
    MissingService,

    #[error("field `level` is required")]
    MissingLevel,

    #[error("invalid log level `{0}`")]
    InvalidLevel(String),

    #[error("topic name must not be empty")]
    EmptyTopic,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BrokerError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("invalid offset {offset}: offsets start at 0")]
    InvalidRange { offset: i64 },

    #[error("unknown subscription `{0}`")]
    UnknownSubscription(SubscriptionId),
}

/// Returned by a subscriber when it failed to process a record.
///
/// The dispatcher logs it and redelivers the same record on the next pass.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct DeliveryError(pub String);

impl DeliveryError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

impl From<&str> for DeliveryError {
    fn from(reason: &str) -> Self {
        Self(reason.to_string())
    }
}

impl From<String> for DeliveryError {
    fn from(reason: String) -> Self {
        Self(reason)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("failed to read dataset file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse dataset file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("index {index} out of range (dataset has {len} entries)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("batch count must be between 1 and {max}, got {count}")]
    InvalidBatch { count: usize, max: usize },
}
