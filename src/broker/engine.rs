//! Broker engine
//!
//! This module contains the in-memory broker responsible for:
//! - owning every topic log and the subscription registry
//! - validating and publishing records (the only write path into a topic)
//! - serving read-only range queries over topics
//!
//! Concurrency and usage notes:
//! - The broker is shared as `Arc<Broker>`; every method takes `&self`.
//! - Each topic has its own mutex, so publishes to different topics do not
//!   contend. The topic map itself sits behind a `RwLock` that is only taken
//!   for writing when a topic is first seen.
//! - Publishing never waits on subscribers. Delivery happens in the dispatch
//!   loop, which is woken through [`Broker::published`] after each append.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use chrono::Utc;
use serde::Serialize;
use tokio::sync::Notify;
use tracing::{debug, info};

use crate::broker::subscription::{StartPosition, Subscriber, SubscriptionId, SubscriptionManager};
use crate::broker::topic::{Offset, SharedTopic, TopicLog, TopicView, lock_topic};
use crate::record::{LogCandidate, LogFilter, LogRecord, validate};
use crate::utils::error::{BrokerError, ValidationError};

/// Every topic has exactly one partition.
pub const PARTITION: u32 = 0;

/// Where a published record landed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishReceipt {
    pub topic: String,
    pub offset: Offset,
    pub partition: u32,
}

#[derive(Debug, Default)]
pub struct Broker {
    topics: RwLock<HashMap<String, SharedTopic>>,
    subscriptions: Mutex<SubscriptionManager>,
    published: Notify,
    /// Held for the whole of a dispatch pass; passes never overlap.
    dispatching: Mutex<()>,
}

impl Broker {
    pub fn new() -> Self {
        Self {
            topics: RwLock::new(HashMap::new()),
            subscriptions: Mutex::new(SubscriptionManager::new()),
            published: Notify::new(),
            dispatching: Mutex::new(()),
        }
    }

    /// Validate `candidate`, stamp the broker fields onto it and append it to
    /// `topic`, creating the topic if needed.
    ///
    /// A candidate that fails validation leaves every topic untouched.
    pub fn publish(
        &self,
        topic: &str,
        candidate: LogCandidate,
    ) -> Result<PublishReceipt, BrokerError> {
        if topic.trim().is_empty() {
            return Err(ValidationError::EmptyTopic.into());
        }
        let entry = validate(candidate)?;

        let log = self.topic_or_create(topic);
        let offset = {
            let mut log = lock_topic(&log);
            log.append(LogRecord {
                entry,
                offset: 0,
                topic: topic.to_string(),
                partition: PARTITION,
                broker_timestamp: Utc::now().timestamp_millis(),
            })
        };

        self.published.notify_one();
        debug!(topic, offset, "record published");

        Ok(PublishReceipt {
            topic: topic.to_string(),
            offset,
            partition: PARTITION,
        })
    }

    /// Read-only handle to a topic, if it exists.
    pub fn get_topic_log(&self, topic: &str) -> Option<TopicView> {
        self.topic(topic).map(|log| TopicView::new(topic, log))
    }

    pub fn list_topics(&self) -> BTreeSet<String> {
        self.topics_read().keys().cloned().collect()
    }

    /// Length of `topic`; unknown topics are empty.
    pub fn topic_len(&self, topic: &str) -> Offset {
        self.topic(topic)
            .map(|log| lock_topic(&log).length())
            .unwrap_or(0)
    }

    /// Range read over `topic`, see [`TopicLog::read_from`]. Unknown topics
    /// read as empty.
    pub fn read_from(
        &self,
        topic: &str,
        offset: i64,
        max_count: usize,
    ) -> Result<Vec<LogRecord>, BrokerError> {
        match self.topic(topic) {
            Some(log) => lock_topic(&log).read_from(offset, max_count),
            None => TopicLog::new(topic).read_from(offset, max_count),
        }
    }

    /// The `limit` most recently ingested records matching `filter`, across
    /// all topics, newest first.
    pub fn recent(&self, limit: usize, filter: &LogFilter) -> Vec<LogRecord> {
        let logs: Vec<SharedTopic> = self.topics_read().values().cloned().collect();

        let mut records: Vec<LogRecord> = logs
            .iter()
            .flat_map(|log| {
                lock_topic(log)
                    .iter_rev()
                    .filter(|record| record.matches(filter))
                    .take(limit)
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .collect();

        records.sort_by(|a, b| {
            b.broker_timestamp
                .cmp(&a.broker_timestamp)
                .then_with(|| b.offset.cmp(&a.offset))
                .then_with(|| a.topic.cmp(&b.topic))
        });
        records.truncate(limit);
        records
    }

    /// Subscribe with tail semantics: only records published after this call
    /// are delivered.
    pub fn subscribe(&self, topic: &str, subscriber: impl Subscriber + 'static) -> SubscriptionId {
        self.subscribe_from(topic, StartPosition::Tail, subscriber)
    }

    /// Subscribe starting at `start`. Creates the topic if it does not exist.
    pub fn subscribe_from(
        &self,
        topic: &str,
        start: StartPosition,
        subscriber: impl Subscriber + 'static,
    ) -> SubscriptionId {
        let log = self.topic_or_create(topic);

        // Hold the topic lock while registering so no publish can slip in
        // between reading the length and setting the cursor.
        let guard = lock_topic(&log);
        let cursor = match start {
            StartPosition::Tail => guard.length(),
            StartPosition::Beginning => 0,
        };
        let id = self
            .subscriptions()
            .register(topic, cursor, Arc::new(subscriber));
        drop(guard);

        info!(subscription = %id, topic, cursor, "subscriber registered");
        id
    }

    /// Remove a subscription. Unknown ids are a no-op.
    ///
    /// A dispatch pass already delivering to this subscription may finish its
    /// current record; no later pass will see it.
    pub fn unsubscribe(&self, id: &SubscriptionId) -> bool {
        let removed = self.subscriptions().remove(id);
        if removed {
            info!(subscription = %id, "subscriber removed");
        }
        removed
    }

    pub fn subscription_cursor(&self, id: &SubscriptionId) -> Result<Offset, BrokerError> {
        self.subscriptions()
            .get(id)
            .map(|sub| sub.cursor)
            .ok_or_else(|| BrokerError::UnknownSubscription(id.clone()))
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions().len()
    }

    /// Signalled after every successful publish.
    pub fn published(&self) -> &Notify {
        &self.published
    }

    pub(crate) fn subscriptions(&self) -> MutexGuard<'_, SubscriptionManager> {
        self.subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn dispatch_lock(&self) -> MutexGuard<'_, ()> {
        self.dispatching
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn topic(&self, topic: &str) -> Option<SharedTopic> {
        self.topics_read().get(topic).cloned()
    }

    fn topic_or_create(&self, topic: &str) -> SharedTopic {
        if let Some(log) = self.topic(topic) {
            return log;
        }
        let mut topics = self
            .topics
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(topics.entry(topic.to_string()).or_insert_with(|| {
            info!(topic, "topic created");
            Arc::new(Mutex::new(TopicLog::new(topic)))
        }))
    }

    fn topics_read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, SharedTopic>> {
        self.topics.read().unwrap_or_else(PoisonError::into_inner)
    }
}
