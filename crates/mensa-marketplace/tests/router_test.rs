//! Integration tests for per-action routing behavior.

use mensa_core::{Priority, RiskTier};
use mensa_marketplace::{collaborators::InspectionRecommendation, ResponseData};
use mensa_testing::{init_test_logging, RequestBuilder, TestEnv};
use serde_json::json;

#[tokio::test]
async fn search_vendors_enriches_every_candidate() {
    init_test_logging();
    let env = TestEnv::new();

    let envelope = env
        .process(RequestBuilder::new("search_vendors").parameters(json!({"category": "produce"})).build())
        .await;
    assert!(envelope.success);

    let Some(ResponseData::VendorSearch(results)) = envelope.data else {
        panic!("expected vendor search payload");
    };
    assert_eq!(results.vendors.len(), 2);
    for vendor in &results.vendors {
        assert_eq!(vendor.analytics.period, "monthly");
        assert_eq!(vendor.profile.vendor_id, vendor.candidate.vendor_id);
    }
    // One profile and one analytics call per candidate.
    assert_eq!(env.calls.count("vendor_intelligence.vendor_profile"), 2);
    assert_eq!(env.calls.count("vendor_intelligence.vendor_analytics"), 2);
}

#[tokio::test]
async fn generate_rfp_persists_and_announces() {
    init_test_logging();
    let env = TestEnv::new();

    let envelope = env
        .process(
            RequestBuilder::new("generate_rfp")
                .parameters(json!({"config": {"template": "produce"}, "criteria": {"budget": 5000}}))
                .build(),
        )
        .await;
    assert!(envelope.success);

    let Some(ResponseData::RfpGenerated(created)) = envelope.data else {
        panic!("expected rfp payload");
    };
    assert!(created.persisted);
    assert_eq!(created.rfp.criteria, json!({"budget": 5000}));

    let executed = env.database.executed();
    assert_eq!(executed.len(), 1);
    assert!(executed[0].0.contains("INSERT INTO rfp_documents"));

    // The rfp_generated announcement is queued at request priority.
    assert_eq!(env.service.dispatcher().queued_events().await, 1);
    assert_eq!(env.service.stats().await.events_emitted, 1);
}

#[tokio::test]
async fn place_order_announces_order_placed() {
    init_test_logging();
    let env = TestEnv::new();

    let envelope = env
        .process(RequestBuilder::new("place_order").parameters(json!({"items": ["milk"]})).build())
        .await;
    assert!(envelope.success);

    let Some(ResponseData::OrderPlaced(placement)) = envelope.data else {
        panic!("expected order payload");
    };
    assert_eq!(placement.orchestration.orchestration_id, "orch-500");
    assert_eq!(env.service.stats().await.events_emitted, 1);
}

#[tokio::test]
async fn track_delivery_prefers_database_status() {
    init_test_logging();
    let env = TestEnv::new();
    env.database.set_rows(vec![json!({"status": "out_for_delivery", "carrier": "cold-chain-express"})]);

    let envelope = env
        .process(RequestBuilder::new("track_delivery").parameters(json!({"order_id": "ord-7"})).build())
        .await;

    let Some(ResponseData::DeliveryStatus(snapshot)) = envelope.data else {
        panic!("expected delivery payload");
    };
    assert_eq!(snapshot.order_id, "ord-7");
    assert_eq!(snapshot.status, "out_for_delivery");
    assert_eq!(snapshot.carrier, "cold-chain-express");
}

#[tokio::test]
async fn track_delivery_requires_order_id() {
    init_test_logging();
    let env = TestEnv::new();

    let envelope = env.process(RequestBuilder::new("track_delivery").build()).await;
    assert!(!envelope.success);
    assert!(envelope.error.as_deref().unwrap().contains("order_id"));
}

#[tokio::test]
async fn rejected_inspection_escalates_to_critical_event() {
    init_test_logging();
    let env = TestEnv::new();
    env.supply_chain.set_inspection_recommendation(InspectionRecommendation::Reject);

    let envelope = env
        .process(
            RequestBuilder::new("quality_inspection")
                .parameters(json!({"vendor_id": "vendor-9", "shipment_id": "shp-1"}))
                .build(),
        )
        .await;
    assert!(envelope.success);

    let Some(ResponseData::QualityInspection(outcome)) = envelope.data else {
        panic!("expected inspection payload");
    };
    assert!(!outcome.result.passed);
    assert!(outcome.performance_updated);

    // Critical events process inline: the failure notification is already out.
    let sent = env.notifications.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].priority, Priority::Critical);
    assert!(sent[0].subject.contains("Quality inspection failed"));

    // Vendor performance record updated.
    let executed = env.database.executed();
    assert!(executed.iter().any(|(sql, _)| sql.contains("UPDATE vendor_performance")));
}

#[tokio::test]
async fn passing_inspection_emits_no_event() {
    init_test_logging();
    let env = TestEnv::new();

    let envelope = env
        .process(RequestBuilder::new("quality_inspection").parameters(json!({"vendor_id": "vendor-9"})).build())
        .await;
    assert!(envelope.success);
    assert!(env.notifications.sent().is_empty());
    assert_eq!(env.service.stats().await.events_emitted, 0);
}

#[tokio::test]
async fn vendor_analysis_derives_risk_and_recommendations() {
    init_test_logging();
    let env = TestEnv::new();
    env.intelligence.set_performance_score(80.0);

    let envelope = env
        .process(RequestBuilder::new("vendor_analysis").parameters(json!({"vendor_id": "vendor-3"})).build())
        .await;

    let Some(ResponseData::VendorAnalysis(report)) = envelope.data else {
        panic!("expected analysis payload");
    };
    assert_eq!(report.risk.performance, RiskTier::Medium);
    assert_eq!(report.risk.overall, RiskTier::Low);
    assert!(!report.recommendations.is_empty());
}

#[tokio::test]
async fn sustainability_report_narrates_the_data() {
    init_test_logging();
    let env = TestEnv::new();

    let envelope = env.process(RequestBuilder::new("sustainability_report").build()).await;

    let Some(ResponseData::Sustainability(report)) = envelope.data else {
        panic!("expected sustainability payload");
    };
    assert!(report.narrative.contains("42%"));
    assert!(report.narrative.contains("1240.0 kg CO2e"));
    assert_eq!(report.data.local_sourcing_ratio, 0.42);
}

#[tokio::test]
async fn inventory_optimization_fetches_recommendations_on_reorder() {
    init_test_logging();
    let env = TestEnv::new();
    env.supply_chain.set_auto_reorder(true);

    let envelope = env.process(RequestBuilder::new("inventory_optimization").build()).await;

    let Some(ResponseData::InventoryOptimization(plan)) = envelope.data else {
        panic!("expected inventory payload");
    };
    assert!(plan.optimization.auto_reorder_triggered);
    assert!(plan.reorder_recommendations.is_some());
    assert_eq!(env.calls.count("procurement_engine.generate_recommendations"), 1);
}

#[tokio::test]
async fn inventory_optimization_skips_recommendations_without_reorder() {
    init_test_logging();
    let env = TestEnv::new();

    let envelope = env.process(RequestBuilder::new("inventory_optimization").build()).await;

    let Some(ResponseData::InventoryOptimization(plan)) = envelope.data else {
        panic!("expected inventory payload");
    };
    assert!(plan.reorder_recommendations.is_none());
    assert_eq!(env.calls.count("procurement_engine.generate_recommendations"), 0);
}

#[tokio::test]
async fn cost_analysis_aggregates_and_sums_savings() {
    init_test_logging();
    let env = TestEnv::new();

    let envelope = env.process(RequestBuilder::new("cost_analysis").build()).await;

    let Some(ResponseData::CostAnalysis(report)) = envelope.data else {
        panic!("expected cost payload");
    };
    // 12_000 procurement + 8_700 vendor spend.
    assert_eq!(report.total_spend, 20_700.0);
    // Produce dominates vendor spend (5_200 of 8_700), so a consolidation
    // opportunity is added: 400 from procurement + 5% of 5_200.
    assert_eq!(report.opportunities.len(), 2);
    assert!((report.estimated_total_savings - 660.0).abs() < 1e-9);
    assert!(report.opportunities.iter().any(|o| o.description.contains("produce")));
}

#[tokio::test]
async fn risk_assessment_composites_vendor_tiers() {
    init_test_logging();
    let env = TestEnv::new();
    // rating 2.0 -> financial high; no certifications -> compliance high;
    // score 60 -> performance high.
    env.intelligence.set_rating(2.0);
    env.intelligence.set_certifications(vec![]);
    env.intelligence.set_performance_score(60.0);

    let envelope = env
        .process(
            RequestBuilder::new("risk_assessment")
                .parameters(json!({"vendor_ids": ["vendor-1", "vendor-2"]}))
                .build(),
        )
        .await;

    let Some(ResponseData::RiskAssessment(report)) = envelope.data else {
        panic!("expected risk payload");
    };
    assert_eq!(report.vendors.len(), 2);
    assert!(report.vendors.iter().all(|v| v.overall == RiskTier::High));
    assert_eq!(report.supply_chain_risk, RiskTier::High);
    assert!(report
        .mitigation_strategies
        .iter()
        .any(|s| s.contains("diversify the vendor base")));
}

#[tokio::test]
async fn risk_assessment_requires_vendor_ids() {
    init_test_logging();
    let env = TestEnv::new();

    let envelope = env.process(RequestBuilder::new("risk_assessment").build()).await;
    assert!(!envelope.success);
    assert!(envelope.error.as_deref().unwrap().contains("vendor_ids"));
    assert!(env.calls.count("vendor_intelligence") == 0);
}
