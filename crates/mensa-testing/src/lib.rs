//! Test infrastructure for the mensa marketplace.
//!
//! Provides a ready-to-use environment wiring the marketplace service
//! against recording mock collaborators and a deterministic clock, plus
//! request fixtures. Mocks record every invocation, support failure
//! injection, and can advance the test clock to make elapsed-time
//! assertions exact.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::sync::Arc;

use mensa_core::TestClock;
use mensa_marketplace::{
    Collaborators, MarketplaceConfig, MarketplaceService, RawRequest, ResultEnvelope,
};

pub mod collaborators;
pub mod fixtures;

pub use collaborators::{
    CallLog, MockCacheStore, MockDatabase, MockNotificationService, MockProcurementEngine,
    MockSupplyChainAutomation, MockVendorIntelligence,
};
pub use fixtures::{dashboard_query, RequestBuilder};
pub use mensa_core::{Clock, TestClock as SharedTestClock};

/// Complete test environment around one marketplace service instance.
pub struct TestEnv {
    /// Deterministic clock shared with the service and all mocks.
    pub clock: Arc<TestClock>,
    /// Shared collaborator invocation log.
    pub calls: CallLog,
    /// Procurement engine mock.
    pub procurement: Arc<MockProcurementEngine>,
    /// Vendor intelligence mock.
    pub intelligence: Arc<MockVendorIntelligence>,
    /// Supply chain automation mock.
    pub supply_chain: Arc<MockSupplyChainAutomation>,
    /// Database accessor mock.
    pub database: Arc<MockDatabase>,
    /// Counting cache store.
    pub cache: Arc<MockCacheStore>,
    /// Notification service mock.
    pub notifications: Arc<MockNotificationService>,
    /// The service under test.
    pub service: MarketplaceService,
}

impl TestEnv {
    /// Creates an environment with the default configuration.
    pub fn new() -> Self {
        Self::with_config(MarketplaceConfig::default())
    }

    /// Creates an environment with a custom configuration.
    pub fn with_config(config: MarketplaceConfig) -> Self {
        let clock = Arc::new(TestClock::new());
        let calls = CallLog::new();

        let procurement = Arc::new(MockProcurementEngine::new(calls.clone(), clock.clone()));
        let intelligence = Arc::new(MockVendorIntelligence::new(calls.clone(), clock.clone()));
        let supply_chain = Arc::new(MockSupplyChainAutomation::new(calls.clone(), clock.clone()));
        let database = Arc::new(MockDatabase::new(calls.clone(), clock.clone()));
        let cache = Arc::new(MockCacheStore::new());
        let notifications = Arc::new(MockNotificationService::new(calls.clone(), clock.clone()));

        let collaborators = Collaborators {
            procurement: procurement.clone(),
            intelligence: intelligence.clone(),
            supply_chain: supply_chain.clone(),
            database: database.clone(),
            cache: cache.clone(),
            notifications: notifications.clone(),
        };

        let service = MarketplaceService::new(config, collaborators, clock.clone());

        Self {
            clock,
            calls,
            procurement,
            intelligence,
            supply_chain,
            database,
            cache,
            notifications,
            service,
        }
    }

    /// Shorthand for `self.service.process_request`.
    pub async fn process(&self, raw: RawRequest) -> ResultEnvelope {
        self.service.process_request(raw).await
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

/// Initializes test logging once per process, honoring `RUST_LOG`.
///
/// Safe to call from every test; later calls are no-ops.
pub fn init_test_logging() {
    use tracing_subscriber::EnvFilter;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}
