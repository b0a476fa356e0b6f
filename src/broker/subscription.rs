//! Subscription management
//!
//! A `Subscription` binds one [`Subscriber`] to one topic and carries its
//! cursor: the next offset it has not been delivered yet. The
//! `SubscriptionManager` is the registry of live subscriptions; it is owned by
//! the broker and only ever touched under the broker's subscription lock.
//!
//! Cursors only move forward, and only the dispatch loop moves them, after a
//! successful delivery. Removing a subscription is the terminal transition.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use uuid::Uuid;

use crate::broker::topic::Offset;
use crate::record::LogRecord;
use crate::utils::error::DeliveryError;

pub type SubscriptionId = String;

/// Receives records from the dispatch loop, one at a time and in offset order.
///
/// Returning an error leaves the record undelivered; it is offered again on
/// the next dispatch pass.
pub trait Subscriber: Send + Sync {
    fn deliver(&self, record: &LogRecord) -> Result<(), DeliveryError>;
}

impl<F> Subscriber for F
where
    F: Fn(&LogRecord) -> Result<(), DeliveryError> + Send + Sync,
{
    fn deliver(&self, record: &LogRecord) -> Result<(), DeliveryError> {
        self(record)
    }
}

/// Where a new subscription's cursor starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StartPosition {
    /// At the topic's current length: only records published afterwards.
    #[default]
    Tail,
    /// At offset 0: the whole history of the topic, then new records.
    Beginning,
}

pub struct Subscription {
    pub id: SubscriptionId,
    pub topic: String,
    pub cursor: Offset,
    /// Consecutive failed deliveries of the record at `cursor`.
    pub failures: u32,
    subscriber: Arc<dyn Subscriber>,
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("topic", &self.topic)
            .field("cursor", &self.cursor)
            .field("failures", &self.failures)
            .finish()
    }
}

/// What the dispatch loop needs to serve one subscription for one pass.
#[derive(Clone)]
pub(crate) struct DispatchTarget {
    pub id: SubscriptionId,
    pub topic: String,
    pub cursor: Offset,
    pub subscriber: Arc<dyn Subscriber>,
}

#[derive(Debug, Default)]
pub struct SubscriptionManager {
    subscriptions: HashMap<SubscriptionId, Subscription>,
}

impl SubscriptionManager {
    pub fn new() -> Self {
        Self {
            subscriptions: HashMap::new(),
        }
    }

    /// Register a subscriber on `topic` with its cursor at `cursor`.
    pub fn register(
        &mut self,
        topic: &str,
        cursor: Offset,
        subscriber: Arc<dyn Subscriber>,
    ) -> SubscriptionId {
        let id = Uuid::new_v4().to_string();
        self.subscriptions.insert(
            id.clone(),
            Subscription {
                id: id.clone(),
                topic: topic.to_string(),
                cursor,
                failures: 0,
                subscriber,
            },
        );
        id
    }

    /// Remove a subscription. Unknown ids are ignored.
    pub fn remove(&mut self, id: &SubscriptionId) -> bool {
        self.subscriptions.remove(id).is_some()
    }

    /// Move a cursor forward to `new_cursor`. Unknown ids and backward moves
    /// are ignored.
    pub fn advance(&mut self, id: &SubscriptionId, new_cursor: Offset) {
        if let Some(sub) = self.subscriptions.get_mut(id) {
            if new_cursor > sub.cursor {
                sub.cursor = new_cursor;
                sub.failures = 0;
            }
        }
    }

    /// Count a failed delivery and return the consecutive failure count.
    pub fn record_failure(&mut self, id: &SubscriptionId) -> u32 {
        match self.subscriptions.get_mut(id) {
            Some(sub) => {
                sub.failures = sub.failures.saturating_add(1);
                sub.failures
            }
            None => 0,
        }
    }

    pub fn get(&self, id: &SubscriptionId) -> Option<&Subscription> {
        self.subscriptions.get(id)
    }

    pub fn contains(&self, id: &SubscriptionId) -> bool {
        self.subscriptions.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    pub(crate) fn targets(&self) -> Vec<DispatchTarget> {
        self.subscriptions
            .values()
            .map(|sub| DispatchTarget {
                id: sub.id.clone(),
                topic: sub.topic.clone(),
                cursor: sub.cursor,
                subscriber: Arc::clone(&sub.subscriber),
            })
            .collect()
    }
}
