//! Domain models and strongly-typed identifiers.
//!
//! Defines the closed action and priority enums, newtype ID wrappers for
//! compile-time type safety, the validated marketplace request, and the
//! risk tier model used by the analysis and assessment paths.

use std::{fmt, str::FromStr, time::Duration};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;

/// Tenant identifier for a school.
///
/// Schools are the isolation boundary of the marketplace: every request,
/// cache entry, and analytics query is scoped to one school. Identifiers
/// are caller-supplied opaque strings and must be non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchoolId(String);

impl SchoolId {
    /// Wraps a school identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SchoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SchoolId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Identifier of the user acting on behalf of a school.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorId(String);

impl ActorId {
    /// Wraps an actor identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ActorId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Identifier of a food vendor in collaborator data.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VendorId(String);

impl VendorId {
    /// Wraps a vendor identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VendorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for VendorId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Generated identifier assigned to each accepted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub Uuid);

impl RequestId {
    /// Creates a new random request ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Generated identifier assigned to each emitted integration event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(pub Uuid);

impl EventId {
    /// Creates a new random event ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Marketplace operation requested by a caller.
///
/// The action set is closed: requests carrying any other tag are rejected
/// during validation, which makes the router's dispatch exhaustive at
/// compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Fetch procurement recommendations and enrich candidate vendors.
    SearchVendors,
    /// Build and persist an RFP document from a template and criteria.
    GenerateRfp,
    /// Orchestrate vendor assignment for an order.
    PlaceOrder,
    /// Fetch a delivery and logistics snapshot for an order.
    TrackDelivery,
    /// Run automated quality checks and update vendor performance.
    QualityInspection,
    /// Profile a vendor with analytics and competitive positioning.
    VendorAnalysis,
    /// Fetch sustainability tracking data and generate a narrative.
    SustainabilityReport,
    /// Run inventory management with optional auto-reorder.
    InventoryOptimization,
    /// Aggregate cost breakdowns and derive savings opportunities.
    CostAnalysis,
    /// Score per-vendor and supply-chain risk with mitigations.
    RiskAssessment,
}

impl Action {
    /// Every recognized action, in wire-name order.
    pub const ALL: [Action; 10] = [
        Action::SearchVendors,
        Action::GenerateRfp,
        Action::PlaceOrder,
        Action::TrackDelivery,
        Action::QualityInspection,
        Action::VendorAnalysis,
        Action::SustainabilityReport,
        Action::InventoryOptimization,
        Action::CostAnalysis,
        Action::RiskAssessment,
    ];

    /// Returns the snake_case wire name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::SearchVendors => "search_vendors",
            Self::GenerateRfp => "generate_rfp",
            Self::PlaceOrder => "place_order",
            Self::TrackDelivery => "track_delivery",
            Self::QualityInspection => "quality_inspection",
            Self::VendorAnalysis => "vendor_analysis",
            Self::SustainabilityReport => "sustainability_report",
            Self::InventoryOptimization => "inventory_optimization",
            Self::CostAnalysis => "cost_analysis",
            Self::RiskAssessment => "risk_assessment",
        }
    }

    /// Static collaborator labels attached to result metadata.
    ///
    /// These are observability labels only. They describe which services
    /// the action is declared to consult, independent of what a given
    /// invocation actually calls.
    pub const fn declared_collaborators(&self) -> &'static [&'static str] {
        match self {
            Self::SearchVendors => &["procurement_engine", "vendor_intelligence"],
            Self::GenerateRfp => &["procurement_engine"],
            Self::PlaceOrder => &["supply_chain_automation", "procurement_engine"],
            Self::TrackDelivery => &["supply_chain_automation"],
            Self::QualityInspection => &["supply_chain_automation"],
            Self::VendorAnalysis => &["vendor_intelligence"],
            Self::SustainabilityReport => &["supply_chain_automation"],
            Self::InventoryOptimization => &["supply_chain_automation", "procurement_engine"],
            Self::CostAnalysis => &["procurement_engine", "vendor_intelligence"],
            Self::RiskAssessment => &["vendor_intelligence", "procurement_engine"],
        }
    }

    /// Cache lifetime for read-mostly actions.
    ///
    /// Only four actions are cache-eligible; everything else bypasses the
    /// result cache unconditionally. Lifetimes scale with how slowly each
    /// result changes.
    pub const fn cache_ttl(&self) -> Option<Duration> {
        match self {
            Self::SearchVendors => Some(Duration::from_secs(1800)),
            Self::VendorAnalysis => Some(Duration::from_secs(3600)),
            Self::CostAnalysis => Some(Duration::from_secs(7200)),
            Self::SustainabilityReport => Some(Duration::from_secs(14400)),
            _ => None,
        }
    }

    /// Returns whether results of this action may be served from cache.
    pub const fn is_cacheable(&self) -> bool {
        self.cache_ttl().is_some()
    }
}

impl FromStr for Action {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|action| action.as_str() == s)
            .copied()
            .ok_or_else(|| CoreError::unsupported_action(s))
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request and event priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Background work, drained periodically.
    Low,
    /// Default priority.
    Medium,
    /// Processed inline on emission.
    High,
    /// Processed inline on emission; reserved for escalations.
    Critical,
}

impl Priority {
    /// Returns the snake_case wire name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    /// Whether events at this priority are processed inline on emission
    /// instead of waiting for the periodic drain.
    pub const fn is_immediate(&self) -> bool {
        matches!(self, Self::High | Self::Critical)
    }
}

impl Default for Priority {
    fn default() -> Self {
        Self::Medium
    }
}

impl FromStr for Priority {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "critical" => Ok(Self::Critical),
            other => Err(CoreError::validation(format!("unknown priority '{other}'"))),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated marketplace request, produced by the request validator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketplaceRequest {
    /// School the request is scoped to.
    pub school_id: SchoolId,

    /// User acting on behalf of the school.
    pub actor_id: ActorId,

    /// The operation to perform.
    pub action: Action,

    /// Per-action parameter bag. Shape varies by action.
    pub parameters: serde_json::Value,

    /// Request priority; inherited by emitted events unless escalated.
    pub priority: Priority,

    /// Open metadata bag, passed through untouched.
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// Risk tier used by the vendor analysis and risk assessment paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskTier {
    /// No concerning signals.
    Low,
    /// One concerning signal; monitor.
    Medium,
    /// Multiple concerning signals; act.
    High,
}

impl RiskTier {
    /// Derives a tier from a 0-100 performance score.
    ///
    /// Scores below 70 are high risk, below 85 medium, otherwise low.
    pub fn from_performance_score(score: f64) -> Self {
        if score < 70.0 {
            Self::High
        } else if score < 85.0 {
            Self::Medium
        } else {
            Self::Low
        }
    }

    /// Composites three risk inputs into an overall tier.
    ///
    /// More than one high input is high overall; exactly one high input
    /// is medium; otherwise low.
    pub fn overall(financial: Self, compliance: Self, performance: Self) -> Self {
        let highs =
            [financial, compliance, performance].iter().filter(|t| **t == Self::High).count();
        match highs {
            n if n > 1 => Self::High,
            1 => Self::Medium,
            _ => Self::Low,
        }
    }

    /// Returns the snake_case wire name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_wire_names_round_trip() {
        for action in Action::ALL {
            let parsed: Action = action.as_str().parse().expect("wire name should parse");
            assert_eq!(parsed, action);
        }
    }

    #[test]
    fn unknown_action_is_unsupported() {
        let err = "optimize_everything".parse::<Action>().unwrap_err();
        assert_eq!(err.code(), "M1002");
    }

    #[test]
    fn cache_eligibility_matches_whitelist() {
        assert_eq!(Action::SearchVendors.cache_ttl(), Some(Duration::from_secs(1800)));
        assert_eq!(Action::VendorAnalysis.cache_ttl(), Some(Duration::from_secs(3600)));
        assert_eq!(Action::CostAnalysis.cache_ttl(), Some(Duration::from_secs(7200)));
        assert_eq!(Action::SustainabilityReport.cache_ttl(), Some(Duration::from_secs(14400)));

        for action in [
            Action::GenerateRfp,
            Action::PlaceOrder,
            Action::TrackDelivery,
            Action::QualityInspection,
            Action::InventoryOptimization,
            Action::RiskAssessment,
        ] {
            assert!(!action.is_cacheable(), "{action} must bypass the cache");
        }
    }

    #[test]
    fn priority_defaults_to_medium() {
        assert_eq!(Priority::default(), Priority::Medium);
    }

    #[test]
    fn only_high_and_critical_are_immediate() {
        assert!(!Priority::Low.is_immediate());
        assert!(!Priority::Medium.is_immediate());
        assert!(Priority::High.is_immediate());
        assert!(Priority::Critical.is_immediate());
    }

    #[test]
    fn performance_score_tier_thresholds() {
        assert_eq!(RiskTier::from_performance_score(60.0), RiskTier::High);
        assert_eq!(RiskTier::from_performance_score(69.9), RiskTier::High);
        assert_eq!(RiskTier::from_performance_score(70.0), RiskTier::Medium);
        assert_eq!(RiskTier::from_performance_score(80.0), RiskTier::Medium);
        assert_eq!(RiskTier::from_performance_score(85.0), RiskTier::Low);
        assert_eq!(RiskTier::from_performance_score(90.0), RiskTier::Low);
    }

    #[test]
    fn overall_tier_counts_high_inputs() {
        use RiskTier::{High, Low, Medium};

        assert_eq!(RiskTier::overall(High, High, Low), High);
        assert_eq!(RiskTier::overall(High, Low, Low), Medium);
        assert_eq!(RiskTier::overall(Low, Medium, Low), Low);
        assert_eq!(RiskTier::overall(High, High, High), High);
        assert_eq!(RiskTier::overall(Medium, Medium, Medium), Low);
    }

    #[test]
    fn declared_collaborators_match_dispatch_table() {
        assert_eq!(
            Action::SearchVendors.declared_collaborators(),
            &["procurement_engine", "vendor_intelligence"]
        );
        assert_eq!(Action::TrackDelivery.declared_collaborators(), &["supply_chain_automation"]);
        assert_eq!(
            Action::RiskAssessment.declared_collaborators(),
            &["vendor_intelligence", "procurement_engine"]
        );
    }
}
