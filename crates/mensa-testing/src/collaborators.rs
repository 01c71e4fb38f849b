//! Recording mock collaborators with failure injection.
//!
//! Every mock appends its invocations to a shared [`CallLog`] so tests
//! can assert exactly which collaborators a request touched. Mocks can be
//! switched into a failing mode to drive downstream-error and retry
//! paths, and advance the shared test clock by a configurable latency on
//! each call so elapsed-time metrics are deterministic.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use chrono::Utc;
use mensa_core::{CoreError, Result, SchoolId, TestClock, VendorId};
use mensa_marketplace::collaborators::{
    CacheStore, CompetitiveAnalysis, DemandForecast, InspectionRecommendation, InspectionResult,
    InventoryOptimization, MarketplaceDatabase, NotificationRequest, NotificationService,
    OrderOrchestration, ProcurementCostSummary, ProcurementEngine, ProcurementRecommendations,
    RfpDocument, SavingsOpportunity, SupplyChainAutomation, SustainabilityData, VendorAnalytics,
    VendorAssignment, VendorCandidate, VendorCostBreakdown, VendorIntelligence, VendorProfile,
};
use serde_json::Value;

/// Shared record of collaborator invocations.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    calls: Arc<Mutex<Vec<String>>>,
}

impl CallLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an invocation record.
    pub fn record(&self, call: impl Into<String>) {
        self.calls.lock().expect("call log lock poisoned").push(call.into());
    }

    /// All invocations, in order.
    pub fn all(&self) -> Vec<String> {
        self.calls.lock().expect("call log lock poisoned").clone()
    }

    /// Number of invocations whose name starts with `prefix`.
    pub fn count(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .expect("call log lock poisoned")
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    /// Total number of invocations.
    pub fn len(&self) -> usize {
        self.calls.lock().expect("call log lock poisoned").len()
    }

    /// Whether no collaborator was invoked.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Shared behavior of all mocks: call recording, failure injection, and
/// deterministic latency against the test clock.
#[derive(Debug)]
struct MockCore {
    name: &'static str,
    log: CallLog,
    clock: Arc<TestClock>,
    failing: AtomicBool,
    latency_ms: AtomicU64,
}

impl MockCore {
    fn new(name: &'static str, log: CallLog, clock: Arc<TestClock>) -> Self {
        Self { name, log, clock, failing: AtomicBool::new(false), latency_ms: AtomicU64::new(0) }
    }

    fn touch(&self, method: &str) -> Result<()> {
        self.log.record(format!("{}.{}", self.name, method));
        let latency = self.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            self.clock.advance(Duration::from_millis(latency));
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(CoreError::downstream(self.name, "injected failure"));
        }
        Ok(())
    }
}

macro_rules! mock_controls {
    () => {
        /// Switches the mock into (or out of) a failing mode.
        pub fn set_failing(&self, failing: bool) {
            self.core.failing.store(failing, Ordering::SeqCst);
        }

        /// Advances the test clock by this much on every call.
        pub fn set_latency(&self, latency: Duration) {
            self.core.latency_ms.store(latency.as_millis() as u64, Ordering::SeqCst);
        }
    };
}

/// Recording mock of the procurement engine.
#[derive(Debug)]
pub struct MockProcurementEngine {
    core: MockCore,
    /// Vendor ids returned as candidates.
    candidates: Mutex<Vec<String>>,
}

impl MockProcurementEngine {
    /// Creates a mock recording into `log`.
    pub fn new(log: CallLog, clock: Arc<TestClock>) -> Self {
        Self {
            core: MockCore::new("procurement_engine", log, clock),
            candidates: Mutex::new(vec!["vendor-1".into(), "vendor-2".into()]),
        }
    }

    mock_controls!();

    /// Replaces the candidate vendor ids.
    pub fn set_candidates(&self, ids: Vec<String>) {
        *self.candidates.lock().expect("candidates lock poisoned") = ids;
    }
}

#[async_trait]
impl ProcurementEngine for MockProcurementEngine {
    async fn generate_recommendations(
        &self,
        _criteria: &Value,
    ) -> Result<ProcurementRecommendations> {
        self.core.touch("generate_recommendations")?;
        let vendors = self
            .candidates
            .lock()
            .expect("candidates lock poisoned")
            .iter()
            .enumerate()
            .map(|(i, id)| VendorCandidate {
                vendor_id: VendorId::new(id.clone()),
                name: format!("Vendor {id}"),
                match_score: 0.9 - i as f64 * 0.1,
            })
            .collect();
        Ok(ProcurementRecommendations {
            vendors,
            demand_forecast: DemandForecast {
                horizon_days: 30,
                expected_orders: 120,
                confidence: 0.82,
            },
            optimized_timing: "order by thursday for monday delivery".into(),
            risk_assessment: "low concentration risk".into(),
        })
    }

    async fn generate_rfp(&self, _config: &Value, criteria: &Value) -> Result<RfpDocument> {
        self.core.touch("generate_rfp")?;
        Ok(RfpDocument {
            rfp_id: "rfp-100".into(),
            title: "Produce supply RFP".into(),
            sections: vec!["scope".into(), "criteria".into(), "terms".into()],
            criteria: criteria.clone(),
        })
    }

    async fn cost_summary(&self, _school_id: &SchoolId) -> Result<ProcurementCostSummary> {
        self.core.touch("cost_summary")?;
        Ok(ProcurementCostSummary {
            total_spend: 12_000.0,
            opportunities: vec![SavingsOpportunity {
                description: "move bread orders to weekly cadence".into(),
                estimated_savings: 400.0,
            }],
        })
    }
}

/// Recording mock of the vendor intelligence service.
#[derive(Debug)]
pub struct MockVendorIntelligence {
    core: MockCore,
    rating: Mutex<f64>,
    certifications: Mutex<Vec<String>>,
    performance_score: Mutex<f64>,
}

impl MockVendorIntelligence {
    /// Creates a mock recording into `log`.
    pub fn new(log: CallLog, clock: Arc<TestClock>) -> Self {
        Self {
            core: MockCore::new("vendor_intelligence", log, clock),
            rating: Mutex::new(4.5),
            certifications: Mutex::new(vec!["haccp".into(), "organic".into()]),
            performance_score: Mutex::new(92.0),
        }
    }

    mock_controls!();

    /// Sets the rating reported in vendor profiles.
    pub fn set_rating(&self, rating: f64) {
        *self.rating.lock().expect("rating lock poisoned") = rating;
    }

    /// Sets the certifications reported in vendor profiles.
    pub fn set_certifications(&self, certifications: Vec<String>) {
        *self.certifications.lock().expect("certifications lock poisoned") = certifications;
    }

    /// Sets the performance score reported in analytics.
    pub fn set_performance_score(&self, score: f64) {
        *self.performance_score.lock().expect("score lock poisoned") = score;
    }
}

#[async_trait]
impl VendorIntelligence for MockVendorIntelligence {
    async fn vendor_profile(&self, vendor_id: &VendorId) -> Result<VendorProfile> {
        self.core.touch("vendor_profile")?;
        Ok(VendorProfile {
            vendor_id: vendor_id.clone(),
            name: format!("Vendor {vendor_id}"),
            categories: vec!["produce".into()],
            rating: *self.rating.lock().expect("rating lock poisoned"),
            certifications: self.certifications.lock().expect("certifications lock poisoned").clone(),
        })
    }

    async fn vendor_analytics(
        &self,
        vendor_id: &VendorId,
        period: &str,
    ) -> Result<VendorAnalytics> {
        self.core.touch("vendor_analytics")?;
        Ok(VendorAnalytics {
            vendor_id: vendor_id.clone(),
            period: period.to_string(),
            on_time_delivery_rate: 0.95,
            defect_rate: 0.01,
            performance_score: *self.performance_score.lock().expect("score lock poisoned"),
            total_orders: 42,
        })
    }

    async fn competitive_analysis(&self, vendor_id: &VendorId) -> Result<CompetitiveAnalysis> {
        self.core.touch("competitive_analysis")?;
        Ok(CompetitiveAnalysis {
            vendor_id: vendor_id.clone(),
            market_position: "challenger".into(),
            price_index: 1.02,
            peer_count: 6,
        })
    }

    async fn cost_breakdown(&self, _school_id: &SchoolId) -> Result<VendorCostBreakdown> {
        self.core.touch("cost_breakdown")?;
        let mut by_category = std::collections::BTreeMap::new();
        by_category.insert("produce".to_string(), 5_200.0);
        by_category.insert("dairy".to_string(), 2_100.0);
        by_category.insert("bakery".to_string(), 1_400.0);
        Ok(VendorCostBreakdown { total_spend: 8_700.0, by_category })
    }
}

/// Recording mock of the supply chain automation service.
#[derive(Debug)]
pub struct MockSupplyChainAutomation {
    core: MockCore,
    recommendation: Mutex<InspectionRecommendation>,
    auto_reorder: AtomicBool,
}

impl MockSupplyChainAutomation {
    /// Creates a mock recording into `log`.
    pub fn new(log: CallLog, clock: Arc<TestClock>) -> Self {
        Self {
            core: MockCore::new("supply_chain_automation", log, clock),
            recommendation: Mutex::new(InspectionRecommendation::Accept),
            auto_reorder: AtomicBool::new(false),
        }
    }

    mock_controls!();

    /// Sets the recommendation returned by quality control runs.
    pub fn set_inspection_recommendation(&self, recommendation: InspectionRecommendation) {
        *self.recommendation.lock().expect("recommendation lock poisoned") = recommendation;
    }

    /// Sets whether inventory runs trigger an auto-reorder.
    pub fn set_auto_reorder(&self, triggered: bool) {
        self.auto_reorder.store(triggered, Ordering::SeqCst);
    }
}

#[async_trait]
impl SupplyChainAutomation for MockSupplyChainAutomation {
    async fn orchestrate_order(&self, _config: &Value) -> Result<OrderOrchestration> {
        self.core.touch("orchestrate_order")?;
        Ok(OrderOrchestration {
            orchestration_id: "orch-500".into(),
            vendor_assignments: vec![VendorAssignment {
                vendor_id: VendorId::new("vendor-1"),
                items: vec!["apples".into(), "milk".into()],
                subtotal: 320.0,
            }],
            estimated_delivery: Utc::now(),
            status: "confirmed".into(),
        })
    }

    async fn automate_quality_control(&self, _config: &Value) -> Result<InspectionResult> {
        self.core.touch("automate_quality_control")?;
        let recommendation = *self.recommendation.lock().expect("recommendation lock poisoned");
        Ok(InspectionResult {
            passed: recommendation == InspectionRecommendation::Accept,
            score: if recommendation == InspectionRecommendation::Accept { 96.0 } else { 41.0 },
            recommendation,
            findings: if recommendation == InspectionRecommendation::Reject {
                vec!["cold chain breach".into()]
            } else {
                vec![]
            },
        })
    }

    async fn track_sustainability(&self, _config: &Value) -> Result<SustainabilityData> {
        self.core.touch("track_sustainability")?;
        Ok(SustainabilityData {
            period: "monthly".into(),
            carbon_kg: 1_240.0,
            local_sourcing_ratio: 0.42,
            packaging_waste_kg: 86.0,
        })
    }

    async fn manage_inventory(&self, _config: &Value) -> Result<InventoryOptimization> {
        self.core.touch("manage_inventory")?;
        let triggered = self.auto_reorder.load(Ordering::SeqCst);
        Ok(InventoryOptimization {
            auto_reorder_triggered: triggered,
            reorder_items: if triggered { vec!["flour".into()] } else { vec![] },
            projected_savings: 150.0,
            stock_alerts: vec![],
        })
    }
}

/// Recording mock of the database accessor.
#[derive(Debug)]
pub struct MockDatabase {
    core: MockCore,
    rows: Mutex<Vec<Value>>,
    executed: Mutex<Vec<(String, Vec<Value>)>>,
}

impl MockDatabase {
    /// Creates a mock recording into `log`.
    pub fn new(log: CallLog, clock: Arc<TestClock>) -> Self {
        Self {
            core: MockCore::new("database", log, clock),
            rows: Mutex::new(Vec::new()),
            executed: Mutex::new(Vec::new()),
        }
    }

    mock_controls!();

    /// Sets the rows returned by subsequent queries.
    pub fn set_rows(&self, rows: Vec<Value>) {
        *self.rows.lock().expect("rows lock poisoned") = rows;
    }

    /// Statements executed so far, with their parameters.
    pub fn executed(&self) -> Vec<(String, Vec<Value>)> {
        self.executed.lock().expect("executed lock poisoned").clone()
    }
}

#[async_trait]
impl MarketplaceDatabase for MockDatabase {
    async fn query(&self, _sql: &str, _params: &[Value]) -> Result<Vec<Value>> {
        self.core.touch("query")?;
        Ok(self.rows.lock().expect("rows lock poisoned").clone())
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> Result<u64> {
        self.core.touch("execute")?;
        self.executed
            .lock()
            .expect("executed lock poisoned")
            .push((sql.to_string(), params.to_vec()));
        Ok(1)
    }
}

/// Counting in-memory cache store.
///
/// Beyond storage, it counts reads and writes and remembers the TTL of
/// the last write so tests can assert the per-action TTL is forwarded.
#[derive(Debug, Default)]
pub struct MockCacheStore {
    entries: Mutex<HashMap<String, Value>>,
    gets: AtomicUsize,
    sets: AtomicUsize,
    last_ttl: Mutex<Option<Duration>>,
}

impl MockCacheStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of reads so far.
    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    /// Number of writes so far.
    pub fn sets(&self) -> usize {
        self.sets.load(Ordering::SeqCst)
    }

    /// TTL of the most recent write.
    pub fn last_ttl(&self) -> Option<Duration> {
        *self.last_ttl.lock().expect("ttl lock poisoned")
    }
}

#[async_trait]
impl CacheStore for MockCacheStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        Ok(self.entries.lock().expect("entries lock poisoned").get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value, ttl: Option<Duration>) -> Result<()> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        *self.last_ttl.lock().expect("ttl lock poisoned") = ttl;
        self.entries.lock().expect("entries lock poisoned").insert(key.to_string(), value);
        Ok(())
    }
}

/// Recording mock of the notification service.
#[derive(Debug)]
pub struct MockNotificationService {
    core: MockCore,
    sent: Mutex<Vec<NotificationRequest>>,
    attempts: AtomicUsize,
    fail_next: AtomicUsize,
}

impl MockNotificationService {
    /// Creates a mock recording into `log`.
    pub fn new(log: CallLog, clock: Arc<TestClock>) -> Self {
        Self {
            core: MockCore::new("notification_service", log, clock),
            sent: Mutex::new(Vec::new()),
            attempts: AtomicUsize::new(0),
            fail_next: AtomicUsize::new(0),
        }
    }

    mock_controls!();

    /// Fails the next `n` send attempts, then recovers.
    pub fn fail_times(&self, n: usize) {
        self.fail_next.store(n, Ordering::SeqCst);
    }

    /// Notifications delivered so far.
    pub fn sent(&self) -> Vec<NotificationRequest> {
        self.sent.lock().expect("sent lock poisoned").clone()
    }

    /// Send attempts, including failed ones.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NotificationService for MockNotificationService {
    async fn send(&self, request: NotificationRequest) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        self.core.touch("send")?;
        if self
            .fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(CoreError::downstream("notification_service", "transient failure"));
        }
        self.sent.lock().expect("sent lock poisoned").push(request);
        Ok(())
    }
}
