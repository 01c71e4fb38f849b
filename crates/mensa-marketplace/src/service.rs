//! Marketplace service façade.
//!
//! Wires the validator, capacity governor, result cache, action router,
//! event dispatcher, and metrics into the two entry points callers see:
//! [`MarketplaceService::process_request`] and
//! [`MarketplaceService::generate_dashboard`]. Both return a structured
//! envelope on every path; callers never observe a raw error.

use std::{sync::Arc, time::Instant};

use mensa_core::{
    Clock, CoreError, EventDraft, EventKind, EventSource, MarketplaceRequest, RequestId,
};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::{
    cache::ResultCache,
    capacity::CapacityGovernor,
    collaborators::Collaborators,
    config::MarketplaceConfig,
    dashboard::{validate_query, DashboardGenerator, RawDashboardQuery},
    dispatch::EventDispatcher,
    envelope::ResultEnvelope,
    metrics::{MarketplaceStats, StatsSnapshot},
    router::{ActionRouter, ResponseData},
    validate::{validate, RawRequest},
};

/// The vendor marketplace integration service.
pub struct MarketplaceService {
    clock: Arc<dyn Clock>,
    governor: Arc<CapacityGovernor>,
    cache: ResultCache,
    router: ActionRouter,
    dispatcher: Arc<EventDispatcher>,
    stats: Arc<MarketplaceStats>,
    dashboards: DashboardGenerator,
}

impl MarketplaceService {
    /// Builds a service over the given collaborators and clock.
    pub fn new(
        config: MarketplaceConfig,
        collaborators: Collaborators,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let stats = Arc::new(MarketplaceStats::new());
        let governor = CapacityGovernor::new(config.max_concurrent_requests);
        let cache = ResultCache::new(collaborators.cache.clone());
        let dispatcher = EventDispatcher::new(
            config.to_dispatch_config(),
            clock.clone(),
            stats.clone(),
            collaborators.notifications.clone(),
            collaborators.database.clone(),
        );
        let router = ActionRouter::new(collaborators);
        let dashboards = DashboardGenerator::new(stats.clone());

        info!(
            max_concurrent_requests = governor.ceiling(),
            "marketplace service constructed"
        );

        Self { clock, governor, cache, router, dispatcher, stats, dashboards }
    }

    /// Starts background work (the event queue drain task).
    pub fn start(&self) {
        self.dispatcher.start();
    }

    /// Stops background work gracefully.
    pub async fn shutdown(&self) {
        self.dispatcher.shutdown().await;
    }

    /// Returns a copy of the current metrics state.
    pub async fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot().await
    }

    /// The capacity governor, exposed for observability.
    pub fn governor(&self) -> &Arc<CapacityGovernor> {
        &self.governor
    }

    /// The event dispatcher, exposed for observability.
    pub fn dispatcher(&self) -> &Arc<EventDispatcher> {
        &self.dispatcher
    }

    /// Processes one marketplace request end to end.
    ///
    /// Validation, capacity admission, cache lookup, routing, cache
    /// write-back, metrics, and event emission. Every failure resolves to
    /// a failure envelope with the capacity slot released.
    pub async fn process_request(&self, raw: RawRequest) -> ResultEnvelope {
        let started = self.clock.now();
        let request_id = RequestId::new();

        let request = match validate(raw) {
            Ok(request) => request,
            Err(error) => return self.fail(request_id, started, None, error).await,
        };

        let permit = match self.governor.try_acquire() {
            Ok(permit) => permit,
            Err(error) => return self.fail(request_id, started, Some(&request), error).await,
        };

        let action = request.action;

        if let Some(value) =
            self.cache.lookup(action, &request.school_id, &request.parameters).await
        {
            match serde_json::from_value::<ResponseData>(value) {
                Ok(data) => {
                    drop(permit);
                    self.stats.record_cache_hit().await;
                    let elapsed = self.elapsed_ms(started);
                    self.stats.record_success(elapsed).await;
                    debug!(%request_id, %action, "request served from cache");
                    return ResultEnvelope::ok(
                        data,
                        request_id,
                        elapsed,
                        action.declared_collaborators(),
                        true,
                    );
                },
                Err(error) => {
                    warn!(%action, %error, "cached value failed to decode, recomputing");
                },
            }
        }

        match self.router.dispatch(&request).await {
            Ok(outcome) => {
                if action.is_cacheable() {
                    match serde_json::to_value(&outcome.data) {
                        Ok(value) => {
                            self.cache
                                .store(action, &request.school_id, &request.parameters, value)
                                .await;
                        },
                        Err(error) => warn!(%action, %error, "result not serializable for cache"),
                    }
                }

                for draft in outcome.events {
                    if let Err(error) = self.dispatcher.emit(draft).await {
                        warn!(%error, "integration event dropped");
                    }
                }

                drop(permit);
                let elapsed = self.elapsed_ms(started);
                self.stats.record_success(elapsed).await;
                ResultEnvelope::ok(
                    outcome.data,
                    request_id,
                    elapsed,
                    action.declared_collaborators(),
                    false,
                )
            },
            Err(error) => {
                drop(permit);
                self.fail(request_id, started, Some(&request), error).await
            },
        }
    }

    /// Generates the analytics dashboard for a query.
    ///
    /// Uses the same envelope contract as [`process_request`]: a
    /// malformed query yields a failure envelope before any section
    /// generator runs.
    pub async fn generate_dashboard(&self, raw: RawDashboardQuery) -> ResultEnvelope {
        let started = self.clock.now();
        let request_id = RequestId::new();

        match validate_query(raw) {
            Ok(query) => {
                let payload = self.dashboards.generate(&query).await;
                ResultEnvelope::ok(
                    ResponseData::Dashboard(payload),
                    request_id,
                    self.elapsed_ms(started),
                    &[],
                    false,
                )
            },
            Err(error) => {
                warn!(%error, "dashboard query rejected");
                ResultEnvelope::failure(&error, request_id, self.elapsed_ms(started))
            },
        }
    }

    async fn fail(
        &self,
        request_id: RequestId,
        started: Instant,
        request: Option<&MarketplaceRequest>,
        error: CoreError,
    ) -> ResultEnvelope {
        let elapsed = self.elapsed_ms(started);
        self.stats.record_failure(elapsed).await;
        warn!(%request_id, code = error.code(), %error, "marketplace request failed");

        let draft = EventDraft::new(
            EventKind::RequestFailed,
            EventSource::MarketplaceRouter,
            json!({
                "code": error.code(),
                "error": error.to_string(),
                "action": request.map(|r| r.action.as_str()),
                "school_id": request.map(|r| r.school_id.as_str()),
            }),
        );
        if let Err(emit_error) = self.dispatcher.emit(draft).await {
            debug!(%emit_error, "request_failed event dropped");
        }

        ResultEnvelope::failure(&error, request_id, elapsed)
    }

    fn elapsed_ms(&self, started: Instant) -> u64 {
        self.clock.now().saturating_duration_since(started).as_millis() as u64
    }
}

impl std::fmt::Debug for MarketplaceService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarketplaceService")
            .field("ceiling", &self.governor.ceiling())
            .finish_non_exhaustive()
    }
}
