//! Dispatch loop
//!
//! Pushes unseen records to every subscription. A pass works subscription by
//! subscription:
//! - snapshot the topic's records in `[cursor, length)` under the topic lock
//! - deliver them one by one in offset order, outside every lock
//! - advance the cursor after each successful delivery
//!
//! A failed delivery stops the batch for that subscription only; the record is
//! offered again on the next pass (at-least-once). Other subscriptions are not
//! affected. With `max_delivery_attempts` set, a record that keeps failing is
//! skipped once the bound is reached.
//!
//! Passes are serialized per broker: a manual [`Broker::dispatch_pass`] and
//! any number of dispatchers on the same broker never deliver concurrently,
//! so each cursor is read and advanced by one pass at a time.
//!
//! The background [`Dispatcher`] runs passes every `interval` and, when
//! `eager` is set, right after a publish. Passes run on the blocking pool since
//! subscriber callbacks are synchronous. A callback that never returns stalls
//! the loop for everyone; that is the main scalability limit of a single loop.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::broker::Broker;
use crate::broker::subscription::{DispatchTarget, Subscriber};
use crate::broker::topic::lock_topic;
use crate::record::LogRecord;
use crate::utils::error::DeliveryError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchConfig {
    /// Time between two passes when nothing is published.
    pub interval: Duration,
    /// Run a pass as soon as a record is published.
    pub eager: bool,
    /// Give up on a record after this many consecutive failures. `None`
    /// retries forever.
    pub max_delivery_attempts: Option<u32>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(100),
            eager: true,
            max_delivery_attempts: None,
        }
    }
}

/// Outcome counters of one dispatch pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchReport {
    pub delivered: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl DispatchReport {
    pub fn is_idle(&self) -> bool {
        self.delivered == 0 && self.failed == 0 && self.skipped == 0
    }
}

impl Broker {
    /// Run one dispatch pass with the default policy (unbounded retries).
    pub fn dispatch_pass(&self) -> DispatchReport {
        run_pass(self, &DispatchConfig::default())
    }
}

/// Run one dispatch pass over every live subscription.
///
/// Blocks while another pass on the same broker is in progress. A subscriber
/// must not start a pass from inside `deliver`.
pub fn run_pass(broker: &Broker, config: &DispatchConfig) -> DispatchReport {
    let _pass = broker.dispatch_lock();
    let targets = broker.subscriptions().targets();
    let mut report = DispatchReport::default();

    for target in targets {
        let Some(log) = broker.topic(&target.topic) else {
            continue;
        };
        let Ok(start) = i64::try_from(target.cursor) else {
            continue;
        };

        // `usize::MAX` reads up to the length observed under this lock.
        let pending = match lock_topic(&log).read_from(start, usize::MAX) {
            Ok(records) => records,
            Err(e) => {
                error!(subscription = %target.id, error = %e, "cannot read pending records");
                continue;
            }
        };

        deliver_batch(broker, &target, pending, config, &mut report);
    }

    report
}

fn deliver_batch(
    broker: &Broker,
    target: &DispatchTarget,
    records: Vec<LogRecord>,
    config: &DispatchConfig,
    report: &mut DispatchReport,
) {
    for record in records {
        if !broker.subscriptions().contains(&target.id) {
            return;
        }

        match invoke(target.subscriber.as_ref(), &record) {
            Ok(()) => {
                broker
                    .subscriptions()
                    .advance(&target.id, record.offset + 1);
                report.delivered += 1;
            }
            Err(e) => {
                report.failed += 1;
                let attempts = broker.subscriptions().record_failure(&target.id);
                warn!(
                    subscription = %target.id,
                    topic = %record.topic,
                    offset = record.offset,
                    attempts,
                    error = %e,
                    "delivery failed"
                );

                let exhausted = config
                    .max_delivery_attempts
                    .is_some_and(|max| attempts >= max);
                if !exhausted {
                    return;
                }

                error!(
                    subscription = %target.id,
                    topic = %record.topic,
                    offset = record.offset,
                    "record dropped after {attempts} attempts"
                );
                broker
                    .subscriptions()
                    .advance(&target.id, record.offset + 1);
                report.skipped += 1;
            }
        }
    }
}

fn invoke(subscriber: &dyn Subscriber, record: &LogRecord) -> Result<(), DeliveryError> {
    panic::catch_unwind(AssertUnwindSafe(|| subscriber.deliver(record)))
        .unwrap_or_else(|_| Err(DeliveryError::new("subscriber panicked")))
}

struct RunningLoop {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Owns the background dispatch task.
///
/// `start` and `stop` are idempotent. Once `stop` returns, no further
/// subscriber callbacks are made by this dispatcher.
pub struct Dispatcher {
    broker: Arc<Broker>,
    config: DispatchConfig,
    running: Mutex<Option<RunningLoop>>,
}

impl Dispatcher {
    pub fn new(broker: Arc<Broker>, config: DispatchConfig) -> Self {
        Self {
            broker,
            config,
            running: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Spawn the dispatch task on the current Tokio runtime. Returns `false`
    /// if it was already running.
    pub fn start(&self) -> bool {
        let mut running = self.running();
        if running.is_some() {
            debug!("dispatcher already running");
            return false;
        }

        let (shutdown, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(dispatch_loop(
            Arc::clone(&self.broker),
            self.config.clone(),
            shutdown_rx,
        ));
        *running = Some(RunningLoop { shutdown, handle });

        info!(
            interval_ms = self.config.interval.as_millis() as u64,
            eager = self.config.eager,
            "dispatcher started"
        );
        true
    }

    /// Signal the task and wait for the pass in progress to finish. Returns
    /// `false` if it was not running.
    pub async fn stop(&self) -> bool {
        let Some(running) = self.running().take() else {
            debug!("dispatcher not running");
            return false;
        };

        let _ = running.shutdown.send(true);
        if let Err(e) = running.handle.await {
            error!(error = %e, "dispatch task ended abnormally");
        }
        info!("dispatcher stopped");
        true
    }

    pub fn is_running(&self) -> bool {
        self.running().is_some()
    }

    fn running(&self) -> MutexGuard<'_, Option<RunningLoop>> {
        self.running.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

async fn dispatch_loop(
    broker: Arc<Broker>,
    config: DispatchConfig,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(config.interval.max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        if *shutdown.borrow() {
            break;
        }

        let pass_broker = Arc::clone(&broker);
        let pass_config = config.clone();
        match tokio::task::spawn_blocking(move || run_pass(&pass_broker, &pass_config)).await {
            Ok(report) if !report.is_idle() => debug!(?report, "dispatch pass finished"),
            Ok(_) => {}
            Err(e) => error!(error = %e, "dispatch pass aborted"),
        }

        tokio::select! {
            changed = shutdown.changed() => {
                // The dispatcher was dropped without calling stop.
                if changed.is_err() {
                    break;
                }
            }
            _ = ticker.tick() => {}
            _ = broker.published().notified(), if config.eager => {}
        }
    }
}
