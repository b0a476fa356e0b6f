//! Seed dataset
//!
//! A fixed list of log candidates that the demo endpoints replay through the
//! ordinary publish path. The list is either the built-in sample or a JSON
//! array loaded from disk.

use std::fs;
use std::ops::Range;
use std::path::Path;

use serde_json::json;
use tracing::info;

use crate::record::LogCandidate;
use crate::utils::error::DatasetError;

/// Largest batch the replay endpoint accepts.
pub const MAX_BATCH: usize = 100;

#[derive(Debug, Clone, Default)]
pub struct Dataset {
    entries: Vec<LogCandidate>,
}

impl Dataset {
    pub fn new(entries: Vec<LogCandidate>) -> Self {
        Self { entries }
    }

    /// Five sample records from a handful of services.
    pub fn builtin() -> Self {
        let entries = vec![
            LogCandidate::new("auth-service", "INFO", "User login successful")
                .with_timestamp("2023-05-01T10:15:30.123Z")
                .with_metadata("user_id", "u123")
                .with_metadata("ip", "192.168.1.1"),
            LogCandidate::new("payment-service", "ERROR", "Payment processing failed")
                .with_timestamp("2023-05-01T10:16:45.789Z")
                .with_metadata("transaction_id", "tx456")
                .with_metadata("amount", 99.99),
            LogCandidate::new("inventory-service", "WARN", "Low stock detected")
                .with_timestamp("2023-05-01T10:17:12.456Z")
                .with_metadata("product_id", "p789")
                .with_metadata("quantity", 5),
            LogCandidate::new("notification-service", "INFO", "Email notification sent")
                .with_timestamp("2023-05-01T10:18:23.567Z")
                .with_metadata("email_id", "em1011")
                .with_metadata("recipient", "user@example.com"),
            LogCandidate::new("auth-service", "ERROR", "Failed login attempt")
                .with_timestamp("2023-05-01T10:19:45.890Z")
                .with_metadata("ip", "203.0.113.42")
                .with_metadata("username", "admin")
                .with_metadata("reason", json!("invalid_password")),
        ];
        Self { entries }
    }

    /// Load a JSON array of log candidates.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DatasetError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)?;
        let entries: Vec<LogCandidate> = serde_json::from_str(&raw)?;
        info!(path = %path.display(), entries = entries.len(), "dataset loaded");
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Result<&LogCandidate, DatasetError> {
        self.entries.get(index).ok_or(DatasetError::IndexOutOfRange {
            index,
            len: self.entries.len(),
        })
    }

    /// The first `n` entries, for previews.
    pub fn sample(&self, n: usize) -> &[LogCandidate] {
        &self.entries[..n.min(self.entries.len())]
    }

    /// Half-open index range `[start, min(start + count, len))`.
    ///
    /// `count` must be in `1..=MAX_BATCH`. A start past the end gives an empty
    /// range.
    pub fn batch_range(&self, start: usize, count: usize) -> Result<Range<usize>, DatasetError> {
        if count == 0 || count > MAX_BATCH {
            return Err(DatasetError::InvalidBatch {
                count,
                max: MAX_BATCH,
            });
        }
        let len = self.entries.len();
        let begin = start.min(len);
        let end = start.saturating_add(count).min(len);
        Ok(begin..end)
    }
}
