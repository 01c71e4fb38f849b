//! Integration tests for event dispatch, retry, and queue bounds.

use std::{sync::Arc, time::Duration};

use mensa_core::{EventDraft, EventKind, EventSource, Priority, TestClock};
use mensa_marketplace::{DispatchConfig, EventDispatcher, MarketplaceStats};
use mensa_testing::{init_test_logging, CallLog, MockDatabase, MockNotificationService};
use serde_json::json;

struct Fixture {
    dispatcher: Arc<EventDispatcher>,
    clock: Arc<TestClock>,
    notifications: Arc<MockNotificationService>,
    database: Arc<MockDatabase>,
    stats: Arc<MarketplaceStats>,
}

fn fixture(config: DispatchConfig) -> Fixture {
    let clock = Arc::new(TestClock::new());
    let log = CallLog::new();
    let notifications = Arc::new(MockNotificationService::new(log.clone(), clock.clone()));
    let database = Arc::new(MockDatabase::new(log, clock.clone()));
    let stats = Arc::new(MarketplaceStats::new());
    let dispatcher = EventDispatcher::new(
        config,
        clock.clone(),
        stats.clone(),
        notifications.clone(),
        database.clone(),
    );
    Fixture { dispatcher, clock, notifications, database, stats }
}

fn alert(priority: Priority) -> EventDraft {
    EventDraft::new(
        EventKind::VendorPerformanceAlert,
        EventSource::MarketplaceRouter,
        json!({"school_id": "school-042", "vendor_id": "v-1"}),
    )
    .with_priority(priority)
}

#[tokio::test]
async fn permanently_failing_event_retries_with_exact_backoff() {
    init_test_logging();
    let f = fixture(DispatchConfig::default());
    f.notifications.set_failing(true);

    // High priority processes inline, so emit drives the whole retry
    // sequence synchronously against the test clock.
    f.dispatcher.emit(alert(Priority::High)).await.unwrap();

    // Initial attempt plus max_retries retries.
    assert_eq!(f.notifications.attempts(), 4);
    assert_eq!(f.notifications.sent().len(), 0);

    // Strictly doubling delays: 2s, 4s, 8s.
    assert_eq!(
        f.clock.recorded_sleeps(),
        vec![Duration::from_secs(2), Duration::from_secs(4), Duration::from_secs(8)]
    );

    let stats = f.stats.snapshot().await;
    assert_eq!(stats.events_failed, 1);
    assert_eq!(stats.events_emitted, 1);

    // No further attempts happen afterwards.
    f.dispatcher.drain_once().await;
    assert_eq!(f.notifications.attempts(), 4);
}

#[tokio::test]
async fn transient_failure_recovers_within_budget() {
    init_test_logging();
    let f = fixture(DispatchConfig::default());
    f.notifications.fail_times(1);

    f.dispatcher.emit(alert(Priority::Low)).await.unwrap();
    assert_eq!(f.notifications.attempts(), 0, "low priority must wait for the drain");
    f.dispatcher.drain_once().await;

    // One failed attempt, one backoff sleep, one successful retry.
    assert_eq!(f.notifications.attempts(), 2);
    assert_eq!(f.notifications.sent().len(), 1);
    assert_eq!(f.clock.recorded_sleeps(), vec![Duration::from_secs(2)]);
    assert_eq!(f.stats.snapshot().await.events_failed, 0);
}

#[tokio::test]
async fn immediate_priority_processes_exactly_once() {
    init_test_logging();
    let f = fixture(DispatchConfig::default());

    f.dispatcher.emit(alert(Priority::Critical)).await.unwrap();

    assert_eq!(f.notifications.sent().len(), 1);
    // Never also queued: the drain must not reprocess it.
    assert_eq!(f.dispatcher.queued_events().await, 0);
    f.dispatcher.drain_once().await;
    assert_eq!(f.notifications.sent().len(), 1);
}

#[tokio::test]
async fn deferred_priority_waits_for_drain() {
    init_test_logging();
    let f = fixture(DispatchConfig::default());

    f.dispatcher.emit(alert(Priority::Medium)).await.unwrap();

    assert_eq!(f.notifications.sent().len(), 0);
    assert_eq!(f.dispatcher.queued_events().await, 1);

    f.dispatcher.drain_once().await;
    assert_eq!(f.notifications.sent().len(), 1);
    assert_eq!(f.dispatcher.queued_events().await, 0);
}

#[tokio::test]
async fn full_lane_rejects_with_overflow_count() {
    init_test_logging();
    let mut config = DispatchConfig::default();
    config.queue_capacity = 1;
    let f = fixture(config);

    f.dispatcher.emit(alert(Priority::Medium)).await.unwrap();
    let err = f.dispatcher.emit(alert(Priority::Medium)).await.unwrap_err();

    assert_eq!(err.code(), "M3001");
    assert_eq!(f.dispatcher.queued_events().await, 1);
    assert_eq!(f.stats.snapshot().await.queue_overflows, 1);

    // A different lane still accepts.
    f.dispatcher.emit(alert(Priority::Low)).await.unwrap();
    assert_eq!(f.dispatcher.queued_events().await, 2);
}

#[tokio::test]
async fn announcement_kinds_are_dropped_without_retry() {
    init_test_logging();
    let f = fixture(DispatchConfig::default());

    for kind in [EventKind::RfpGenerated, EventKind::OrderPlaced, EventKind::RequestFailed] {
        f.dispatcher
            .emit(EventDraft::new(kind, EventSource::MarketplaceRouter, json!({})))
            .await
            .unwrap();
    }
    f.dispatcher.drain_once().await;

    assert_eq!(f.notifications.attempts(), 0);
    assert!(f.database.executed().is_empty());
    assert!(f.clock.recorded_sleeps().is_empty());
    assert_eq!(f.stats.snapshot().await.events_failed, 0);
}

#[tokio::test]
async fn order_status_change_updates_the_order_row() {
    init_test_logging();
    let f = fixture(DispatchConfig::default());

    f.dispatcher
        .emit(
            EventDraft::new(
                EventKind::OrderStatusChange,
                EventSource::SupplyChainAutomation,
                json!({"order_id": "ord-9", "status": "delivered"}),
            )
            .with_priority(Priority::High),
        )
        .await
        .unwrap();

    let executed = f.database.executed();
    assert_eq!(executed.len(), 1);
    assert!(executed[0].0.contains("UPDATE orders"));
    assert_eq!(executed[0].1, vec![json!("delivered"), json!("ord-9")]);
}

#[tokio::test]
async fn shutdown_stops_the_drain_task() {
    init_test_logging();
    let mut config = DispatchConfig::default();
    config.drain_interval = Duration::from_millis(10);
    let f = fixture(config);

    f.dispatcher.start();
    tokio::time::sleep(Duration::from_millis(30)).await;
    f.dispatcher.shutdown().await;

    // After shutdown, queued events stay queued: nothing drains them.
    f.dispatcher.emit(alert(Priority::Medium)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(f.dispatcher.queued_events().await, 1);
}
