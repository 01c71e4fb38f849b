//! Action routing.
//!
//! Stateless dispatch over the closed action set: every validated request
//! maps to exactly one handler, and the `match` is exhaustive so an
//! unhandled action cannot compile. Handlers call collaborator services,
//! assemble a typed response payload, and describe any integration events
//! to publish.

use futures::future::try_join_all;
use mensa_core::{
    Action, CoreError, EventDraft, EventKind, EventSource, MarketplaceRequest, Priority, Result,
    RiskTier, VendorId,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::{
    collaborators::{
        Collaborators, CompetitiveAnalysis, InspectionRecommendation, InspectionResult,
        InventoryOptimization, OrderOrchestration, ProcurementRecommendations, RfpDocument,
        SavingsOpportunity, SustainabilityData, VendorAnalytics, VendorCandidate, VendorProfile,
    },
    dashboard::DashboardPayload,
    risk::{self, VendorRiskProfile},
};

/// Analytics period used when enriching vendor candidates.
const ENRICHMENT_PERIOD: &str = "monthly";

/// A candidate vendor enriched with profile and analytics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichedVendor {
    /// The procurement engine's candidate entry.
    pub candidate: VendorCandidate,
    /// Vendor profile.
    pub profile: VendorProfile,
    /// Monthly analytics.
    pub analytics: VendorAnalytics,
}

/// Payload of a vendor search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VendorSearchResults {
    /// Enriched candidates, in recommendation order.
    pub vendors: Vec<EnrichedVendor>,
    /// Demand projection for the criteria.
    pub demand_forecast: crate::collaborators::DemandForecast,
    /// Recommended order timing.
    pub optimized_timing: String,
    /// Engine-level risk note.
    pub risk_assessment: String,
}

/// Payload of RFP generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RfpCreated {
    /// The generated document.
    pub rfp: RfpDocument,
    /// Whether the document was persisted.
    pub persisted: bool,
}

/// Payload of order placement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderPlacement {
    /// Orchestration outcome with vendor assignments.
    pub orchestration: OrderOrchestration,
}

/// Payload of delivery tracking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliverySnapshot {
    /// Order under tracking.
    pub order_id: String,
    /// Current delivery status.
    pub status: String,
    /// Carrier handling the delivery.
    pub carrier: String,
    /// Hours until estimated arrival.
    pub eta_hours: u32,
    /// Route checkpoints passed so far.
    pub checkpoints: Vec<String>,
}

/// Payload of a quality inspection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InspectionOutcome {
    /// Vendor whose shipment was inspected.
    pub vendor_id: VendorId,
    /// Automation result.
    pub result: InspectionResult,
    /// Whether the vendor performance record was updated.
    pub performance_updated: bool,
}

/// Payload of a vendor analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VendorAnalysisReport {
    /// Vendor profile.
    pub profile: VendorProfile,
    /// Analytics for the period.
    pub analytics: VendorAnalytics,
    /// Competitive positioning.
    pub competitive: CompetitiveAnalysis,
    /// Composite risk picture.
    pub risk: VendorRiskProfile,
    /// Derived recommendation flags.
    pub recommendations: Vec<String>,
}

/// Payload of a sustainability report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SustainabilityReport {
    /// Tracking data for the period.
    pub data: SustainabilityData,
    /// Generated narrative summary.
    pub narrative: String,
}

/// Payload of inventory optimization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryPlan {
    /// Inventory management outcome.
    pub optimization: InventoryOptimization,
    /// Procurement recommendations fetched when a reorder triggered.
    pub reorder_recommendations: Option<ProcurementRecommendations>,
}

/// Payload of a cost analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostAnalysisReport {
    /// Combined procurement and vendor spend.
    pub total_spend: f64,
    /// Vendor spend per category.
    pub by_category: std::collections::BTreeMap<String, f64>,
    /// Savings opportunities, procurement-side plus derived.
    pub opportunities: Vec<SavingsOpportunity>,
    /// Sum of estimated savings across opportunities.
    pub estimated_total_savings: f64,
}

/// Payload of a risk assessment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAssessmentReport {
    /// Per-vendor composite risk profiles.
    pub vendors: Vec<VendorRiskProfile>,
    /// Chain-level risk across the assessed set.
    pub supply_chain_risk: RiskTier,
    /// Recommended mitigation strategies.
    pub mitigation_strategies: Vec<String>,
}

/// Typed result payload, one variant per action plus the dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResponseData {
    /// `search_vendors` result.
    VendorSearch(VendorSearchResults),
    /// `generate_rfp` result.
    RfpGenerated(RfpCreated),
    /// `place_order` result.
    OrderPlaced(OrderPlacement),
    /// `track_delivery` result.
    DeliveryStatus(DeliverySnapshot),
    /// `quality_inspection` result.
    QualityInspection(InspectionOutcome),
    /// `vendor_analysis` result.
    VendorAnalysis(VendorAnalysisReport),
    /// `sustainability_report` result.
    Sustainability(SustainabilityReport),
    /// `inventory_optimization` result.
    InventoryOptimization(InventoryPlan),
    /// `cost_analysis` result.
    CostAnalysis(CostAnalysisReport),
    /// `risk_assessment` result.
    RiskAssessment(RiskAssessmentReport),
    /// Analytics dashboard payload.
    Dashboard(DashboardPayload),
}

/// Outcome of routing one request.
#[derive(Debug)]
pub struct RouteOutcome {
    /// Typed response payload.
    pub data: ResponseData,
    /// Integration events to publish after completion.
    pub events: Vec<EventDraft>,
}

impl RouteOutcome {
    fn data(data: ResponseData) -> Self {
        Self { data, events: Vec::new() }
    }
}

/// Dispatches validated requests to their action handlers.
#[derive(Debug, Clone)]
pub struct ActionRouter {
    collaborators: Collaborators,
}

impl ActionRouter {
    /// Creates a router over the given collaborator set.
    pub fn new(collaborators: Collaborators) -> Self {
        Self { collaborators }
    }

    /// Routes a request to exactly one handler.
    pub async fn dispatch(&self, request: &MarketplaceRequest) -> Result<RouteOutcome> {
        debug!(action = %request.action, school = %request.school_id, "dispatching request");
        match request.action {
            Action::SearchVendors => self.search_vendors(request).await,
            Action::GenerateRfp => self.generate_rfp(request).await,
            Action::PlaceOrder => self.place_order(request).await,
            Action::TrackDelivery => self.track_delivery(request).await,
            Action::QualityInspection => self.quality_inspection(request).await,
            Action::VendorAnalysis => self.vendor_analysis(request).await,
            Action::SustainabilityReport => self.sustainability_report(request).await,
            Action::InventoryOptimization => self.inventory_optimization(request).await,
            Action::CostAnalysis => self.cost_analysis(request).await,
            Action::RiskAssessment => self.risk_assessment(request).await,
        }
    }

    async fn search_vendors(&self, request: &MarketplaceRequest) -> Result<RouteOutcome> {
        let recommendations =
            self.collaborators.procurement.generate_recommendations(&request.parameters).await?;

        let enriched = try_join_all(recommendations.vendors.into_iter().map(|candidate| {
            let intelligence = self.collaborators.intelligence.clone();
            async move {
                let (profile, analytics) = tokio::try_join!(
                    intelligence.vendor_profile(&candidate.vendor_id),
                    intelligence.vendor_analytics(&candidate.vendor_id, ENRICHMENT_PERIOD),
                )?;
                Ok::<_, CoreError>(EnrichedVendor { candidate, profile, analytics })
            }
        }))
        .await?;

        Ok(RouteOutcome::data(ResponseData::VendorSearch(VendorSearchResults {
            vendors: enriched,
            demand_forecast: recommendations.demand_forecast,
            optimized_timing: recommendations.optimized_timing,
            risk_assessment: recommendations.risk_assessment,
        })))
    }

    async fn generate_rfp(&self, request: &MarketplaceRequest) -> Result<RouteOutcome> {
        let config = member_or_empty(&request.parameters, "config");
        let criteria = member_or_empty(&request.parameters, "criteria");

        let rfp = self.collaborators.procurement.generate_rfp(&config, &criteria).await?;

        self.collaborators
            .database
            .execute(
                "INSERT INTO rfp_documents (rfp_id, school_id, title, document) \
                 VALUES ($1, $2, $3, $4)",
                &[
                    json!(rfp.rfp_id),
                    json!(request.school_id.as_str()),
                    json!(rfp.title),
                    serde_json::to_value(&rfp).unwrap_or(Value::Null),
                ],
            )
            .await?;

        let event = EventDraft::new(
            EventKind::RfpGenerated,
            EventSource::MarketplaceRouter,
            json!({"rfp_id": rfp.rfp_id, "school_id": request.school_id.as_str()}),
        )
        .with_priority(request.priority);

        Ok(RouteOutcome {
            data: ResponseData::RfpGenerated(RfpCreated { rfp, persisted: true }),
            events: vec![event],
        })
    }

    async fn place_order(&self, request: &MarketplaceRequest) -> Result<RouteOutcome> {
        let orchestration =
            self.collaborators.supply_chain.orchestrate_order(&request.parameters).await?;

        let event = EventDraft::new(
            EventKind::OrderPlaced,
            EventSource::MarketplaceRouter,
            json!({
                "orchestration_id": orchestration.orchestration_id,
                "school_id": request.school_id.as_str(),
                "vendor_count": orchestration.vendor_assignments.len(),
            }),
        )
        .with_priority(request.priority);

        Ok(RouteOutcome {
            data: ResponseData::OrderPlaced(OrderPlacement { orchestration }),
            events: vec![event],
        })
    }

    async fn track_delivery(&self, request: &MarketplaceRequest) -> Result<RouteOutcome> {
        let order_id = required_str(&request.parameters, "order_id")?;

        let rows = self
            .collaborators
            .database
            .query("SELECT status, carrier FROM orders WHERE order_id = $1", &[json!(order_id)])
            .await?;

        let status = rows
            .first()
            .and_then(|row| row.get("status"))
            .and_then(Value::as_str)
            .unwrap_or("in_transit")
            .to_string();
        let carrier = rows
            .first()
            .and_then(|row| row.get("carrier"))
            .and_then(Value::as_str)
            .unwrap_or("regional_logistics")
            .to_string();

        Ok(RouteOutcome::data(ResponseData::DeliveryStatus(DeliverySnapshot {
            order_id: order_id.to_string(),
            status,
            carrier,
            eta_hours: 24,
            checkpoints: vec!["warehouse_dispatch".into(), "regional_hub".into()],
        })))
    }

    async fn quality_inspection(&self, request: &MarketplaceRequest) -> Result<RouteOutcome> {
        let vendor_id = VendorId::new(required_str(&request.parameters, "vendor_id")?);

        let result =
            self.collaborators.supply_chain.automate_quality_control(&request.parameters).await?;

        self.collaborators
            .database
            .execute(
                "UPDATE vendor_performance SET last_inspection_score = $1 WHERE vendor_id = $2",
                &[json!(result.score), json!(vendor_id.as_str())],
            )
            .await?;

        let mut events = Vec::new();
        if result.recommendation == InspectionRecommendation::Reject {
            events.push(
                EventDraft::new(
                    EventKind::QualityInspectionFailed,
                    EventSource::MarketplaceRouter,
                    json!({
                        "vendor_id": vendor_id.as_str(),
                        "school_id": request.school_id.as_str(),
                        "score": result.score,
                        "findings": result.findings,
                    }),
                )
                .with_priority(Priority::Critical),
            );
        }

        Ok(RouteOutcome {
            data: ResponseData::QualityInspection(InspectionOutcome {
                vendor_id,
                result,
                performance_updated: true,
            }),
            events,
        })
    }

    async fn vendor_analysis(&self, request: &MarketplaceRequest) -> Result<RouteOutcome> {
        let vendor_id = VendorId::new(required_str(&request.parameters, "vendor_id")?);
        let intelligence = &self.collaborators.intelligence;

        let (profile, analytics, competitive) = tokio::try_join!(
            intelligence.vendor_profile(&vendor_id),
            intelligence.vendor_analytics(&vendor_id, ENRICHMENT_PERIOD),
            intelligence.competitive_analysis(&vendor_id),
        )?;

        let risk = risk::assess_vendor(&profile, &analytics);

        let mut recommendations = Vec::new();
        if risk.overall == RiskTier::High {
            recommendations.push("treat as at-risk supplier; review contract terms".to_string());
        }
        if analytics.on_time_delivery_rate < 0.90 {
            recommendations.push("negotiate delivery service levels".to_string());
        }
        if competitive.price_index > 1.10 {
            recommendations.push("benchmark pricing against peer vendors".to_string());
        }
        if recommendations.is_empty() {
            recommendations.push("maintain current relationship".to_string());
        }

        Ok(RouteOutcome::data(ResponseData::VendorAnalysis(VendorAnalysisReport {
            profile,
            analytics,
            competitive,
            risk,
            recommendations,
        })))
    }

    async fn sustainability_report(&self, request: &MarketplaceRequest) -> Result<RouteOutcome> {
        let data =
            self.collaborators.supply_chain.track_sustainability(&request.parameters).await?;

        let narrative = format!(
            "Over the {} period the kitchen accounted for {:.1} kg CO2e, sourced {:.0}% of \
             spend locally, and produced {:.1} kg of packaging waste.",
            data.period,
            data.carbon_kg,
            data.local_sourcing_ratio * 100.0,
            data.packaging_waste_kg,
        );

        Ok(RouteOutcome::data(ResponseData::Sustainability(SustainabilityReport {
            data,
            narrative,
        })))
    }

    async fn inventory_optimization(&self, request: &MarketplaceRequest) -> Result<RouteOutcome> {
        let optimization =
            self.collaborators.supply_chain.manage_inventory(&request.parameters).await?;

        let reorder_recommendations = if optimization.auto_reorder_triggered {
            debug!(school = %request.school_id, "auto-reorder triggered, fetching recommendations");
            Some(
                self.collaborators
                    .procurement
                    .generate_recommendations(&request.parameters)
                    .await?,
            )
        } else {
            None
        };

        Ok(RouteOutcome::data(ResponseData::InventoryOptimization(InventoryPlan {
            optimization,
            reorder_recommendations,
        })))
    }

    async fn cost_analysis(&self, request: &MarketplaceRequest) -> Result<RouteOutcome> {
        let (procurement, vendor_costs) = tokio::try_join!(
            self.collaborators.procurement.cost_summary(&request.school_id),
            self.collaborators.intelligence.cost_breakdown(&request.school_id),
        )?;

        let mut opportunities = procurement.opportunities;

        // A single category dominating vendor spend is a consolidation lever.
        if let Some((category, spend)) = vendor_costs
            .by_category
            .iter()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .filter(|(_, spend)| **spend > vendor_costs.total_spend * 0.4)
        {
            opportunities.push(SavingsOpportunity {
                description: format!("consolidate {category} purchasing under a single vendor"),
                estimated_savings: spend * 0.05,
            });
        }

        let estimated_total_savings =
            opportunities.iter().map(|o| o.estimated_savings).sum::<f64>();

        Ok(RouteOutcome::data(ResponseData::CostAnalysis(CostAnalysisReport {
            total_spend: procurement.total_spend + vendor_costs.total_spend,
            by_category: vendor_costs.by_category,
            opportunities,
            estimated_total_savings,
        })))
    }

    async fn risk_assessment(&self, request: &MarketplaceRequest) -> Result<RouteOutcome> {
        let vendor_ids = required_str_list(&request.parameters, "vendor_ids")?;

        let vendors = try_join_all(vendor_ids.iter().map(|id| {
            let intelligence = self.collaborators.intelligence.clone();
            let vendor_id = VendorId::new(id.clone());
            async move {
                let (profile, analytics) = tokio::try_join!(
                    intelligence.vendor_profile(&vendor_id),
                    intelligence.vendor_analytics(&vendor_id, ENRICHMENT_PERIOD),
                )?;
                Ok::<_, CoreError>(risk::assess_vendor(&profile, &analytics))
            }
        }))
        .await?;

        let supply_chain_risk = risk::supply_chain_risk(&vendors);
        let mitigation_strategies = risk::mitigation_strategies(&vendors);

        Ok(RouteOutcome::data(ResponseData::RiskAssessment(RiskAssessmentReport {
            vendors,
            supply_chain_risk,
            mitigation_strategies,
        })))
    }
}

fn required_str<'a>(params: &'a Value, key: &str) -> Result<&'a str> {
    params
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| CoreError::validation(format!("parameter '{key}' must be a non-empty string")))
}

fn required_str_list(params: &Value, key: &str) -> Result<Vec<String>> {
    let items = params
        .get(key)
        .and_then(Value::as_array)
        .ok_or_else(|| CoreError::validation(format!("parameter '{key}' must be an array")))?;

    let list: Vec<String> = items
        .iter()
        .filter_map(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    if list.is_empty() {
        return Err(CoreError::validation(format!(
            "parameter '{key}' must contain at least one non-empty string"
        )));
    }
    Ok(list)
}

fn member_or_empty(params: &Value, key: &str) -> Value {
    params.get(key).cloned().unwrap_or_else(|| Value::Object(Default::default()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_str_rejects_missing_and_empty() {
        assert!(required_str(&json!({}), "order_id").is_err());
        assert!(required_str(&json!({"order_id": ""}), "order_id").is_err());
        assert!(required_str(&json!({"order_id": 7}), "order_id").is_err());
        assert_eq!(required_str(&json!({"order_id": "ord-1"}), "order_id").unwrap(), "ord-1");
    }

    #[test]
    fn required_str_list_filters_non_strings() {
        let params = json!({"vendor_ids": ["v-1", "", 3, "v-2"]});
        assert_eq!(required_str_list(&params, "vendor_ids").unwrap(), vec!["v-1", "v-2"]);

        assert!(required_str_list(&json!({"vendor_ids": []}), "vendor_ids").is_err());
        assert!(required_str_list(&json!({}), "vendor_ids").is_err());
    }

    #[test]
    fn member_or_empty_defaults_to_object() {
        assert_eq!(member_or_empty(&json!({}), "config"), json!({}));
        assert_eq!(member_or_empty(&json!({"config": {"a": 1}}), "config"), json!({"a": 1}));
    }
}
