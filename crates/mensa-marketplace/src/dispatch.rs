//! Integration event dispatch.
//!
//! Events are published into priority lanes keyed by `(source, priority)`.
//! High and critical events are processed inline at emission and are
//! never enqueued; everything else waits for the periodic drain task.
//! Each event carries a bounded retry budget with exponential backoff
//! (`2^retry_count` seconds); exhausting the budget marks the event
//! permanently failed and escalates through the log and stats.
//!
//! Lanes are bounded. A full lane rejects the event rather than growing
//! without limit, and the overflow is counted.

use std::{
    collections::{HashMap, HashSet, VecDeque},
    sync::Arc,
    time::Duration,
};

use mensa_core::{
    Clock, CoreError, EventDraft, EventId, EventKind, EventSource, IntegrationEvent, Priority,
    Result,
};
use rand::Rng;
use serde_json::{json, Value};
use tokio::{sync::Mutex, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{
    collaborators::{MarketplaceDatabase, NotificationRequest, NotificationService},
    metrics::MarketplaceStats,
};

/// Tuning knobs for the dispatcher.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Retry budget per event.
    pub max_retries: u32,

    /// Maximum queued events per `(source, priority)` lane.
    pub queue_capacity: usize,

    /// Period of the background drain task.
    pub drain_interval: Duration,

    /// Base delay of the exponential backoff schedule.
    pub retry_base_delay: Duration,

    /// Jitter fraction applied to backoff delays (0.0 disables jitter and
    /// keeps the schedule exact).
    pub jitter_factor: f64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_retries: mensa_core::DEFAULT_MAX_RETRIES,
            queue_capacity: 256,
            drain_interval: Duration::from_secs(30),
            retry_base_delay: Duration::from_secs(1),
            jitter_factor: 0.0,
        }
    }
}

/// Priority-aware event queue with inline processing and retry.
pub struct EventDispatcher {
    config: DispatchConfig,
    clock: Arc<dyn Clock>,
    stats: Arc<MarketplaceStats>,
    notifications: Arc<dyn NotificationService>,
    database: Arc<dyn MarketplaceDatabase>,
    queues: Mutex<HashMap<(EventSource, Priority), VecDeque<IntegrationEvent>>>,
    // Sync mutex: check-then-insert must not be interleaved by an await.
    processing: std::sync::Mutex<HashSet<EventId>>,
    cancel: CancellationToken,
    drain_handle: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl EventDispatcher {
    /// Creates a dispatcher. The drain task is not started until
    /// [`start`](Self::start) is called.
    pub fn new(
        config: DispatchConfig,
        clock: Arc<dyn Clock>,
        stats: Arc<MarketplaceStats>,
        notifications: Arc<dyn NotificationService>,
        database: Arc<dyn MarketplaceDatabase>,
    ) -> Arc<Self> {
        Arc::new(Self {
            config,
            clock,
            stats,
            notifications,
            database,
            queues: Mutex::new(HashMap::new()),
            processing: std::sync::Mutex::new(HashSet::new()),
            cancel: CancellationToken::new(),
            drain_handle: std::sync::Mutex::new(None),
        })
    }

    /// Spawns the periodic drain task.
    ///
    /// The handle is retained so [`shutdown`](Self::shutdown) can cancel
    /// and join it; calling `start` twice replaces nothing and logs a
    /// warning instead.
    pub fn start(self: &Arc<Self>) {
        let mut slot = self.drain_handle.lock().expect("drain handle lock poisoned");
        if slot.is_some() {
            warn!("event dispatcher already started");
            return;
        }

        let dispatcher = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(dispatcher.config.drain_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = dispatcher.cancel.cancelled() => {
                        debug!("event drain task stopping");
                        break;
                    }
                    _ = ticker.tick() => {
                        dispatcher.drain_once().await;
                    }
                }
            }
        });
        *slot = Some(handle);
        info!(drain_interval_secs = self.config.drain_interval.as_secs(), "event dispatcher started");
    }

    /// Cancels the drain task and waits for it to stop.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let handle = self.drain_handle.lock().expect("drain handle lock poisoned").take();
        if let Some(handle) = handle {
            if let Err(join_error) = handle.await {
                error!(error = %join_error, "event drain task panicked during shutdown");
            }
        }
        info!("event dispatcher stopped");
    }

    /// Publishes an event.
    ///
    /// The draft is stamped with a generated id and timestamp. High and
    /// critical events are processed inline (exactly once, never also
    /// queued); other priorities are enqueued for the periodic drain.
    /// Processing failures never surface here; only a full queue lane
    /// does, and the caller is expected to log and continue.
    pub async fn emit(&self, draft: EventDraft) -> Result<EventId> {
        let event =
            IntegrationEvent::stamp(draft, self.clock.now_utc(), self.config.max_retries);
        let event_id = event.id;
        self.stats.record_event_emitted().await;

        if event.priority.is_immediate() {
            debug!(event = %event.kind.as_str(), %event_id, "processing immediate event inline");
            self.process_with_retry(event).await;
            return Ok(event_id);
        }

        let lane = (event.source, event.priority);
        let mut queues = self.queues.lock().await;
        let queue = queues.entry(lane).or_default();
        if queue.len() >= self.config.queue_capacity {
            self.stats.record_queue_overflow().await;
            warn!(
                source = event.source.as_str(),
                priority = event.priority.as_str(),
                capacity = self.config.queue_capacity,
                "event queue lane full, dropping event"
            );
            return Err(CoreError::queue_full(
                event.source.as_str(),
                event.priority.as_str(),
            ));
        }
        queue.push_back(event);
        Ok(event_id)
    }

    /// Drains every lane and processes the backlog in emission order.
    pub async fn drain_once(&self) {
        let backlog: Vec<IntegrationEvent> = {
            let mut queues = self.queues.lock().await;
            queues.values_mut().flat_map(|queue| queue.drain(..)).collect()
        };

        if backlog.is_empty() {
            return;
        }
        debug!(count = backlog.len(), "draining queued events");
        for event in backlog {
            self.process_with_retry(event).await;
        }
    }

    /// Number of events currently queued across all lanes.
    pub async fn queued_events(&self) -> usize {
        self.queues.lock().await.values().map(VecDeque::len).sum()
    }

    /// Processes one event, retrying with exponential backoff.
    ///
    /// An event already marked in-flight is skipped: the guard suppresses
    /// duplicate processing of the same event id. The guard is held for
    /// the whole retry sequence.
    async fn process_with_retry(&self, mut event: IntegrationEvent) {
        if !self.begin_processing(event.id) {
            debug!(event_id = %event.id, "event already in flight, skipping");
            return;
        }

        loop {
            match self.process(&event).await {
                Ok(()) => break,
                Err(err) => {
                    event.retry_count += 1;
                    if event.retry_count > event.max_retries {
                        self.stats.record_event_failed().await;
                        error!(
                            event_id = %event.id,
                            kind = event.kind.as_str(),
                            attempts = event.retry_count,
                            error = %err,
                            "event permanently failed after exhausting retries"
                        );
                        break;
                    }

                    let delay = self.backoff_delay(event.retry_count);
                    warn!(
                        event_id = %event.id,
                        kind = event.kind.as_str(),
                        retry = event.retry_count,
                        delay_secs = delay.as_secs_f64(),
                        error = %err,
                        "event processing failed, retrying"
                    );
                    self.clock.sleep(delay).await;
                },
            }
        }

        self.end_processing(event.id);
    }

    /// Runs the registered processor for one event kind.
    ///
    /// Announcement kinds have no processor: they are logged and dropped
    /// without retry.
    async fn process(&self, event: &IntegrationEvent) -> Result<()> {
        match event.kind {
            EventKind::VendorPerformanceAlert => {
                self.notify(event, "Vendor performance alert").await
            },
            EventKind::OrderStatusChange => {
                let order_id = payload_str(&event.payload, "order_id");
                let status = payload_str(&event.payload, "status");
                self.database
                    .execute(
                        "UPDATE orders SET status = $1 WHERE order_id = $2",
                        &[json!(status), json!(order_id)],
                    )
                    .await?;
                Ok(())
            },
            EventKind::QualityInspectionFailed => {
                self.notify(event, "Quality inspection failed").await
            },
            EventKind::DeliveryDelayed => self.notify(event, "Delivery delayed").await,
            EventKind::SustainabilityThresholdExceeded => {
                self.notify(event, "Sustainability threshold exceeded").await
            },
            EventKind::RfpGenerated | EventKind::OrderPlaced | EventKind::RequestFailed => {
                debug!(kind = event.kind.as_str(), "no processor registered, dropping event");
                Ok(())
            },
        }
    }

    async fn notify(&self, event: &IntegrationEvent, subject: &str) -> Result<()> {
        let recipient = event
            .target
            .clone()
            .unwrap_or_else(|| format!("school:{}", payload_str(&event.payload, "school_id")));
        self.notifications
            .send(NotificationRequest {
                recipient,
                subject: subject.to_string(),
                body: event.payload.to_string(),
                priority: event.priority,
            })
            .await
    }

    fn backoff_delay(&self, retry_count: u32) -> Duration {
        let exponent = retry_count.min(20);
        let delay = self.config.retry_base_delay * 2_u32.saturating_pow(exponent);
        apply_jitter(delay, self.config.jitter_factor)
    }

    fn begin_processing(&self, id: EventId) -> bool {
        self.processing.lock().expect("processing set lock poisoned").insert(id)
    }

    fn end_processing(&self, id: EventId) {
        self.processing.lock().expect("processing set lock poisoned").remove(&id);
    }
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDispatcher").field("config", &self.config).finish_non_exhaustive()
    }
}

/// Randomizes a delay by up to `jitter_factor` in either direction.
fn apply_jitter(duration: Duration, jitter_factor: f64) -> Duration {
    if jitter_factor <= 0.0 {
        return duration;
    }
    let clamped = jitter_factor.clamp(0.0, 1.0);
    let mut rng = rand::rng();
    let range = duration.as_secs_f64() * clamped;
    let offset = rng.random_range(-range..=range);
    Duration::from_secs_f64((duration.as_secs_f64() + offset).max(0.0))
}

fn payload_str<'a>(payload: &'a Value, key: &str) -> &'a str {
    payload.get(key).and_then(Value::as_str).unwrap_or("unknown")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_schedule_doubles_per_retry() {
        let config = DispatchConfig::default();
        let base = config.retry_base_delay;
        assert_eq!(base * 2_u32.saturating_pow(1), Duration::from_secs(2));
        assert_eq!(base * 2_u32.saturating_pow(2), Duration::from_secs(4));
        assert_eq!(base * 2_u32.saturating_pow(3), Duration::from_secs(8));
    }

    #[test]
    fn zero_jitter_keeps_delay_exact() {
        let delay = Duration::from_secs(4);
        assert_eq!(apply_jitter(delay, 0.0), delay);
    }

    #[test]
    fn jitter_stays_within_bounds() {
        let delay = Duration::from_secs(10);
        for _ in 0..50 {
            let jittered = apply_jitter(delay, 0.5);
            assert!(jittered >= Duration::from_secs(5));
            assert!(jittered <= Duration::from_secs(15));
        }
    }
}
