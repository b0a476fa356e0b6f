//! Record model
//!
//! The canonical shape of a log record as it moves through the pipeline:
//! - [`LogCandidate`]: whatever a producer submitted, every field optional
//! - [`LogEntry`]: a validated candidate with defaults filled in
//! - [`LogRecord`]: an entry after the broker stamped offset, topic,
//!   partition and ingestion time onto it
//!
//! [`validate`] is the only way to turn a candidate into an entry.

pub mod level;
pub mod model;

pub use level::LogLevel;
pub use model::{LogCandidate, LogEntry, LogFilter, LogRecord, validate};
