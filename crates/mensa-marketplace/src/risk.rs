//! Vendor and supply-chain risk scoring.
//!
//! Three inputs feed the per-vendor composite: a financial tier from the
//! vendor's aggregate rating, a compliance tier from held certifications,
//! and a performance tier from the analytics score. The composition rule
//! lives on [`RiskTier`]; this module maps collaborator data onto the
//! three inputs and aggregates across vendors.

use mensa_core::{RiskTier, VendorId};
use serde::{Deserialize, Serialize};

use crate::collaborators::{VendorAnalytics, VendorProfile};

/// Composite risk picture for one vendor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VendorRiskProfile {
    /// Vendor under assessment.
    pub vendor_id: VendorId,
    /// Financial stability tier, from the aggregate rating.
    pub financial: RiskTier,
    /// Compliance tier, from held certifications.
    pub compliance: RiskTier,
    /// Performance tier, from the analytics score.
    pub performance: RiskTier,
    /// Overall tier composited from the three inputs.
    pub overall: RiskTier,
}

/// Derives the financial tier from a 0-5 aggregate rating.
fn financial_tier(rating: f64) -> RiskTier {
    if rating < 3.0 {
        RiskTier::High
    } else if rating < 4.0 {
        RiskTier::Medium
    } else {
        RiskTier::Low
    }
}

/// Derives the compliance tier from the number of held certifications.
fn compliance_tier(certifications: usize) -> RiskTier {
    match certifications {
        0 => RiskTier::High,
        1 => RiskTier::Medium,
        _ => RiskTier::Low,
    }
}

/// Assesses one vendor from its profile and analytics.
pub fn assess_vendor(profile: &VendorProfile, analytics: &VendorAnalytics) -> VendorRiskProfile {
    let financial = financial_tier(profile.rating);
    let compliance = compliance_tier(profile.certifications.len());
    let performance = RiskTier::from_performance_score(analytics.performance_score);

    VendorRiskProfile {
        vendor_id: profile.vendor_id.clone(),
        financial,
        compliance,
        performance,
        overall: RiskTier::overall(financial, compliance, performance),
    }
}

/// Supply-chain-level risk across all assessed vendors.
///
/// Conservative aggregation: the chain is only as safe as its riskiest
/// vendor. An empty vendor set reads as low.
pub fn supply_chain_risk(vendors: &[VendorRiskProfile]) -> RiskTier {
    vendors.iter().map(|v| v.overall).max().unwrap_or(RiskTier::Low)
}

/// Mitigation strategies for the assessed vendor set.
pub fn mitigation_strategies(vendors: &[VendorRiskProfile]) -> Vec<String> {
    let mut strategies = Vec::new();

    for vendor in vendors {
        match vendor.overall {
            RiskTier::High => strategies.push(format!(
                "identify backup suppliers for vendor {} before next order cycle",
                vendor.vendor_id
            )),
            RiskTier::Medium => strategies.push(format!(
                "schedule a performance review with vendor {}",
                vendor.vendor_id
            )),
            RiskTier::Low => {},
        }
    }

    if vendors.iter().filter(|v| v.overall == RiskTier::High).count() > 1 {
        strategies.push("diversify the vendor base to reduce concentration risk".to_string());
    }
    if strategies.is_empty() {
        strategies.push("maintain current monitoring cadence".to_string());
    }

    strategies
}
