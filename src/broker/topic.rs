//! Topic log
//!
//! A `TopicLog` is the append-only sequence of records for one topic. The
//! offset of a record is its index in the sequence, so offsets are zero-based,
//! gap-free and never reused.
//!
//! Concurrency note: `TopicLog` itself is not synchronized. The broker keeps
//! each log behind its own mutex and hands out [`TopicView`] for reads.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::record::LogRecord;
use crate::utils::error::BrokerError;

pub type Offset = u64;

#[derive(Debug, Default)]
pub struct TopicLog {
    pub name: String,
    records: Vec<LogRecord>,
}

impl TopicLog {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            records: Vec::new(),
        }
    }

    /// Append a record and return the offset it was stored at.
    ///
    /// The record's `offset` field is overwritten with the assigned offset.
    pub fn append(&mut self, mut record: LogRecord) -> Offset {
        let offset = self.length();
        record.offset = offset;
        self.records.push(record);
        offset
    }

    /// Records with offset `>= offset`, at most `max_count` of them, ascending.
    ///
    /// Reading past the end yields an empty vector. Negative offsets are
    /// rejected with [`BrokerError::InvalidRange`].
    pub fn read_from(&self, offset: i64, max_count: usize) -> Result<Vec<LogRecord>, BrokerError> {
        let start = usize::try_from(offset).map_err(|_| BrokerError::InvalidRange { offset })?;
        Ok(self
            .records
            .iter()
            .skip(start)
            .take(max_count)
            .cloned()
            .collect())
    }

    /// Number of records, which is also the next offset to be assigned.
    pub fn length(&self) -> Offset {
        self.records.len() as Offset
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records newest first.
    pub fn iter_rev(&self) -> impl Iterator<Item = &LogRecord> {
        self.records.iter().rev()
    }
}

/// Shared handle to a topic log as stored by the broker.
pub(crate) type SharedTopic = Arc<Mutex<TopicLog>>;

pub(crate) fn lock_topic(topic: &SharedTopic) -> MutexGuard<'_, TopicLog> {
    topic.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Read-only access to one topic's log.
///
/// Each call takes the topic lock once, so `length` and `read_from` observe a
/// consistent prefix of the log. Appends only ever happen through
/// [`Broker::publish`](crate::broker::Broker::publish).
#[derive(Debug, Clone)]
pub struct TopicView {
    name: String,
    log: SharedTopic,
}

impl TopicView {
    pub(crate) fn new(name: &str, log: SharedTopic) -> Self {
        Self {
            name: name.to_string(),
            log,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn length(&self) -> Offset {
        lock_topic(&self.log).length()
    }

    pub fn read_from(&self, offset: i64, max_count: usize) -> Result<Vec<LogRecord>, BrokerError> {
        lock_topic(&self.log).read_from(offset, max_count)
    }
}
