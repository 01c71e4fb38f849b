//! Collaborator service interfaces and their data types.
//!
//! The marketplace layer orchestrates but does not implement these
//! services: procurement recommendations, vendor intelligence, supply
//! chain automation, the database accessor, the cache accessor, and
//! notification delivery. Each is an object-safe async trait so the
//! service can be wired against production clients or recording mocks.

use std::{collections::BTreeMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mensa_core::{Priority, Result, SchoolId, VendorId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A candidate vendor returned by the procurement engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VendorCandidate {
    /// Vendor identifier.
    pub vendor_id: VendorId,
    /// Display name.
    pub name: String,
    /// Match score against the search criteria, 0.0 to 1.0.
    pub match_score: f64,
}

/// Demand projection accompanying procurement recommendations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemandForecast {
    /// Forecast horizon in days.
    pub horizon_days: u32,
    /// Expected order volume over the horizon.
    pub expected_orders: u32,
    /// Forecast confidence, 0.0 to 1.0.
    pub confidence: f64,
}

/// Output of the procurement recommendation engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcurementRecommendations {
    /// Ranked candidate vendors.
    pub vendors: Vec<VendorCandidate>,
    /// Demand projection for the requested criteria.
    pub demand_forecast: DemandForecast,
    /// Recommended order timing, e.g. "order by thursday for monday delivery".
    pub optimized_timing: String,
    /// Engine-level risk note for the recommendation set.
    pub risk_assessment: String,
}

/// RFP document produced by the procurement engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RfpDocument {
    /// Generated RFP identifier.
    pub rfp_id: String,
    /// Document title.
    pub title: String,
    /// Rendered document sections.
    pub sections: Vec<String>,
    /// Selection criteria the document was built from.
    pub criteria: Value,
}

/// A savings opportunity surfaced by cost analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavingsOpportunity {
    /// Human-readable description.
    pub description: String,
    /// Estimated annual savings in the platform currency.
    pub estimated_savings: f64,
}

/// Procurement-side cost summary for a school.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcurementCostSummary {
    /// Total procurement spend for the period.
    pub total_spend: f64,
    /// Savings opportunities identified by the engine.
    pub opportunities: Vec<SavingsOpportunity>,
}

/// Vendor assignment within an orchestrated order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VendorAssignment {
    /// Assigned vendor.
    pub vendor_id: VendorId,
    /// Line items covered by this vendor.
    pub items: Vec<String>,
    /// Subtotal for the assignment.
    pub subtotal: f64,
}

/// Result of supply-chain order orchestration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderOrchestration {
    /// Orchestration run identifier.
    pub orchestration_id: String,
    /// Per-vendor assignments for the order.
    pub vendor_assignments: Vec<VendorAssignment>,
    /// Committed delivery time.
    pub estimated_delivery: DateTime<Utc>,
    /// Orchestration status, e.g. "confirmed".
    pub status: String,
}

/// Recommendation issued by automated quality control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InspectionRecommendation {
    /// Shipment meets standards.
    Accept,
    /// Shipment must be rejected.
    Reject,
    /// Manual review required.
    Review,
}

/// Result of an automated quality control run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InspectionResult {
    /// Whether the inspection passed overall.
    pub passed: bool,
    /// Composite inspection score, 0-100.
    pub score: f64,
    /// Automation recommendation.
    pub recommendation: InspectionRecommendation,
    /// Individual findings.
    pub findings: Vec<String>,
}

/// Sustainability tracking data for a school.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SustainabilityData {
    /// Reporting period label.
    pub period: String,
    /// Carbon footprint in kilograms CO2e.
    pub carbon_kg: f64,
    /// Fraction of spend going to local sources, 0.0 to 1.0.
    pub local_sourcing_ratio: f64,
    /// Packaging waste in kilograms.
    pub packaging_waste_kg: f64,
}

/// Result of an inventory management run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryOptimization {
    /// Whether automation decided a reorder is needed now.
    pub auto_reorder_triggered: bool,
    /// Items to reorder when triggered.
    pub reorder_items: Vec<String>,
    /// Projected savings from the optimization.
    pub projected_savings: f64,
    /// Stock-level alerts raised during the run.
    pub stock_alerts: Vec<String>,
}

/// Vendor profile from the intelligence service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VendorProfile {
    /// Vendor identifier.
    pub vendor_id: VendorId,
    /// Display name.
    pub name: String,
    /// Food categories served.
    pub categories: Vec<String>,
    /// Aggregate rating, 0.0 to 5.0.
    pub rating: f64,
    /// Held certifications, e.g. food-safety audits.
    pub certifications: Vec<String>,
}

/// Vendor analytics for a reporting period.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VendorAnalytics {
    /// Vendor identifier.
    pub vendor_id: VendorId,
    /// Period the analytics cover, e.g. "monthly".
    pub period: String,
    /// On-time delivery rate, 0.0 to 1.0.
    pub on_time_delivery_rate: f64,
    /// Defect rate across delivered items, 0.0 to 1.0.
    pub defect_rate: f64,
    /// Composite performance score, 0-100.
    pub performance_score: f64,
    /// Orders fulfilled in the period.
    pub total_orders: u32,
}

/// Competitive positioning of a vendor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompetitiveAnalysis {
    /// Vendor identifier.
    pub vendor_id: VendorId,
    /// Qualitative market position, e.g. "leader".
    pub market_position: String,
    /// Price index relative to peers; 1.0 is at market.
    pub price_index: f64,
    /// Number of peers in the comparison set.
    pub peer_count: u32,
}

/// Vendor-side cost breakdown for a school.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VendorCostBreakdown {
    /// Total vendor spend for the period.
    pub total_spend: f64,
    /// Spend per food category, deterministically ordered.
    pub by_category: BTreeMap<String, f64>,
}

/// Outbound notification request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationRequest {
    /// Recipient address or channel.
    pub recipient: String,
    /// Subject line.
    pub subject: String,
    /// Message body.
    pub body: String,
    /// Delivery priority.
    pub priority: Priority,
}

/// Procurement recommendation engine.
#[async_trait]
pub trait ProcurementEngine: Send + Sync {
    /// Generates vendor recommendations for the given criteria.
    async fn generate_recommendations(&self, criteria: &Value)
        -> Result<ProcurementRecommendations>;

    /// Builds an RFP document from a template config and criteria.
    async fn generate_rfp(&self, config: &Value, criteria: &Value) -> Result<RfpDocument>;

    /// Summarizes procurement-side costs for a school.
    async fn cost_summary(&self, school_id: &SchoolId) -> Result<ProcurementCostSummary>;
}

/// Vendor intelligence profile and analytics service.
#[async_trait]
pub trait VendorIntelligence: Send + Sync {
    /// Fetches the profile of a vendor.
    async fn vendor_profile(&self, vendor_id: &VendorId) -> Result<VendorProfile>;

    /// Fetches analytics for a vendor over a period.
    async fn vendor_analytics(&self, vendor_id: &VendorId, period: &str)
        -> Result<VendorAnalytics>;

    /// Fetches the competitive positioning of a vendor.
    async fn competitive_analysis(&self, vendor_id: &VendorId) -> Result<CompetitiveAnalysis>;

    /// Breaks down vendor spend for a school.
    async fn cost_breakdown(&self, school_id: &SchoolId) -> Result<VendorCostBreakdown>;
}

/// Supply chain automation service.
#[async_trait]
pub trait SupplyChainAutomation: Send + Sync {
    /// Orchestrates vendor assignment for an order.
    async fn orchestrate_order(&self, config: &Value) -> Result<OrderOrchestration>;

    /// Runs automated quality control for a shipment.
    async fn automate_quality_control(&self, config: &Value) -> Result<InspectionResult>;

    /// Fetches sustainability tracking data.
    async fn track_sustainability(&self, config: &Value) -> Result<SustainabilityData>;

    /// Runs inventory management for a school.
    async fn manage_inventory(&self, config: &Value) -> Result<InventoryOptimization>;
}

/// Parameterized database accessor.
#[async_trait]
pub trait MarketplaceDatabase: Send + Sync {
    /// Runs a parameterized query and returns rows as JSON objects.
    async fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Value>>;

    /// Runs a parameterized statement and returns the affected row count.
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<u64>;
}

/// Key-value cache accessor with optional per-entry TTL.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Returns the stored value for a key, or `None` on miss or expiry.
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Stores a value under a key, expiring after `ttl` when given.
    async fn set(&self, key: &str, value: Value, ttl: Option<Duration>) -> Result<()>;
}

/// Notification dispatch service.
#[async_trait]
pub trait NotificationService: Send + Sync {
    /// Sends a notification.
    async fn send(&self, request: NotificationRequest) -> Result<()>;
}

/// The full set of collaborator handles the service is wired with.
#[derive(Clone)]
pub struct Collaborators {
    /// Procurement recommendation engine.
    pub procurement: Arc<dyn ProcurementEngine>,
    /// Vendor intelligence service.
    pub intelligence: Arc<dyn VendorIntelligence>,
    /// Supply chain automation service.
    pub supply_chain: Arc<dyn SupplyChainAutomation>,
    /// Database accessor.
    pub database: Arc<dyn MarketplaceDatabase>,
    /// Cache accessor.
    pub cache: Arc<dyn CacheStore>,
    /// Notification dispatch service.
    pub notifications: Arc<dyn NotificationService>,
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}
