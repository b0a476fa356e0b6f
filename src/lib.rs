//! # logstream
//!
//! `logstream` ingests structured log records from producer services, stores
//! them in append-only in-memory topics, and pushes every new record to the
//! consumers subscribed to its topic.
//!
//! ## Core Modules
//!
//! - `record`: Log levels, producer candidates, validation and the stored record shape.
//! - `broker`: Topic logs, subscriptions, publishing and the dispatch loop.
//! - `client`: The WebSocket stream consumer that subscribes to a topic.
//! - `dataset`: Seed records replayed through the normal publish path.
//! - `config`: Loading settings from file and environment.
//! - `transport`: The HTTP/WebSocket API over the broker.
//! - `utils`: Error types and logging setup.

pub mod broker;
pub mod client;
pub mod config;
pub mod dataset;
pub mod record;
pub mod transport;
pub mod utils;
