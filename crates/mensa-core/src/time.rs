//! Clock abstraction for testable timing.
//!
//! Production code uses [`RealClock`]; tests inject [`TestClock`] to make
//! elapsed-time measurement and retry backoff deterministic. Backoff tests
//! rely on `TestClock` recording every requested sleep instead of waiting.

use std::{
    future::Future,
    pin::Pin,
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use chrono::{DateTime, Utc};

/// Time source injected into every timing-sensitive component.
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// Current instant for duration measurements.
    fn now(&self) -> Instant;

    /// Current wall-clock time for event timestamps.
    fn now_utc(&self) -> DateTime<Utc>;

    /// Sleeps for the given duration.
    fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + '_>>;
}

/// Production clock backed by the system and the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct RealClock;

impl RealClock {
    /// Creates a new real clock.
    pub fn new() -> Self {
        Self
    }
}

impl Clock for RealClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(tokio::time::sleep(duration))
    }
}

/// Deterministic clock for tests.
///
/// Time only moves when [`advance`](TestClock::advance) is called or a
/// sleep is requested; sleeps resolve immediately after advancing the
/// clock and recording the requested duration.
#[derive(Debug, Clone)]
pub struct TestClock {
    base: Instant,
    start_utc: DateTime<Utc>,
    offset: Arc<Mutex<Duration>>,
    sleeps: Arc<Mutex<Vec<Duration>>>,
}

impl TestClock {
    /// Creates a test clock anchored at the current time.
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            start_utc: Utc::now(),
            offset: Arc::new(Mutex::new(Duration::ZERO)),
            sleeps: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Advances the clock by the given duration.
    pub fn advance(&self, duration: Duration) {
        let mut offset = self.offset.lock().expect("clock offset lock poisoned");
        *offset += duration;
    }

    /// Every sleep duration requested so far, in request order.
    pub fn recorded_sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().expect("clock sleeps lock poisoned").clone()
    }
}

impl Default for TestClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TestClock {
    fn now(&self) -> Instant {
        let offset = *self.offset.lock().expect("clock offset lock poisoned");
        self.base + offset
    }

    fn now_utc(&self) -> DateTime<Utc> {
        let offset = *self.offset.lock().expect("clock offset lock poisoned");
        self.start_utc + chrono::Duration::from_std(offset).unwrap_or(chrono::Duration::zero())
    }

    fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        self.sleeps.lock().expect("clock sleeps lock poisoned").push(duration);
        self.advance(duration);
        Box::pin(std::future::ready(()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_moves_both_clocks() {
        let clock = TestClock::new();
        let instant_before = clock.now();
        let utc_before = clock.now_utc();

        clock.advance(Duration::from_secs(90));

        assert_eq!(clock.now() - instant_before, Duration::from_secs(90));
        assert_eq!(clock.now_utc() - utc_before, chrono::Duration::seconds(90));
    }

    #[tokio::test]
    async fn sleeps_are_recorded_and_resolve_immediately() {
        let clock = TestClock::new();

        clock.sleep(Duration::from_secs(2)).await;
        clock.sleep(Duration::from_secs(4)).await;

        assert_eq!(
            clock.recorded_sleeps(),
            vec![Duration::from_secs(2), Duration::from_secs(4)]
        );
    }

    #[test]
    fn clones_share_time() {
        let clock = TestClock::new();
        let other = clock.clone();

        clock.advance(Duration::from_secs(5));

        assert_eq!(other.now(), clock.now());
    }
}
