//! Request and event processing metrics.
//!
//! An explicit, constructor-injected state object rather than ambient
//! globals: every service instance owns its own stats, and tests can
//! assert on them directly. The running average is recomputed on each
//! completed request as `(avg*(n-1)+new)/n` over all completions,
//! successful or failed.

use serde::Serialize;
use tokio::sync::RwLock;

/// Point-in-time view of the metrics state.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatsSnapshot {
    /// Requests accepted for processing.
    pub total_requests: u64,
    /// Requests completed successfully.
    pub successful_requests: u64,
    /// Requests that completed with a failure envelope.
    pub failed_requests: u64,
    /// Running average response time in milliseconds over completions.
    pub average_response_ms: f64,
    /// Requests served from the result cache.
    pub cache_hits: u64,
    /// Integration events emitted.
    pub events_emitted: u64,
    /// Integration events that exhausted their retry budget.
    pub events_failed: u64,
    /// Events rejected because their queue lane was full.
    pub queue_overflows: u64,
}

/// Shared mutable metrics state for one service instance.
#[derive(Debug, Default)]
pub struct MarketplaceStats {
    inner: RwLock<StatsSnapshot>,
}

impl MarketplaceStats {
    /// Creates zeroed stats.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a successful completion with its elapsed time.
    pub async fn record_success(&self, elapsed_ms: u64) {
        let mut inner = self.inner.write().await;
        inner.total_requests += 1;
        inner.successful_requests += 1;
        Self::fold_average(&mut inner, elapsed_ms);
    }

    /// Records a failed completion with its elapsed time.
    pub async fn record_failure(&self, elapsed_ms: u64) {
        let mut inner = self.inner.write().await;
        inner.total_requests += 1;
        inner.failed_requests += 1;
        Self::fold_average(&mut inner, elapsed_ms);
    }

    /// Records a cache-served request.
    pub async fn record_cache_hit(&self) {
        self.inner.write().await.cache_hits += 1;
    }

    /// Records an emitted integration event.
    pub async fn record_event_emitted(&self) {
        self.inner.write().await.events_emitted += 1;
    }

    /// Records an event that exhausted its retry budget.
    pub async fn record_event_failed(&self) {
        self.inner.write().await.events_failed += 1;
    }

    /// Records an event rejected by a full queue lane.
    pub async fn record_queue_overflow(&self) {
        self.inner.write().await.queue_overflows += 1;
    }

    /// Returns a copy of the current state.
    pub async fn snapshot(&self) -> StatsSnapshot {
        self.inner.read().await.clone()
    }

    fn fold_average(inner: &mut StatsSnapshot, elapsed_ms: u64) {
        let n = (inner.successful_requests + inner.failed_requests) as f64;
        inner.average_response_ms =
            (inner.average_response_ms * (n - 1.0) + elapsed_ms as f64) / n;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn running_average_is_exact() {
        let stats = MarketplaceStats::new();
        stats.record_success(100).await;
        stats.record_success(200).await;
        stats.record_success(300).await;

        let snapshot = stats.snapshot().await;
        assert_eq!(snapshot.average_response_ms, 200.0);
        assert_eq!(snapshot.total_requests, 3);
        assert_eq!(snapshot.successful_requests, 3);
    }

    #[tokio::test]
    async fn failures_count_toward_average() {
        let stats = MarketplaceStats::new();
        stats.record_success(100).await;
        stats.record_failure(300).await;

        let snapshot = stats.snapshot().await;
        assert_eq!(snapshot.average_response_ms, 200.0);
        assert_eq!(snapshot.failed_requests, 1);
        assert_eq!(snapshot.successful_requests, 1);
    }

    #[tokio::test]
    async fn counters_accumulate_independently() {
        let stats = MarketplaceStats::new();
        stats.record_cache_hit().await;
        stats.record_event_emitted().await;
        stats.record_event_emitted().await;
        stats.record_event_failed().await;
        stats.record_queue_overflow().await;

        let snapshot = stats.snapshot().await;
        assert_eq!(snapshot.cache_hits, 1);
        assert_eq!(snapshot.events_emitted, 2);
        assert_eq!(snapshot.events_failed, 1);
        assert_eq!(snapshot.queue_overflows, 1);
        assert_eq!(snapshot.total_requests, 0);
    }
}
