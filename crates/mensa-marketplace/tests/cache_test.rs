//! Cache key and TTL-forwarding tests, including property coverage of
//! key determinism.

use mensa_core::{Action, SchoolId};
use mensa_marketplace::cache_key;
use mensa_testing::{init_test_logging, RequestBuilder, TestEnv};
use proptest::{prelude::*, test_runner::Config as ProptestConfig};
use serde_json::json;
use std::time::Duration;

#[tokio::test]
async fn search_ttl_is_forwarded_to_the_store() {
    init_test_logging();
    let env = TestEnv::new();

    let envelope = env
        .process(RequestBuilder::new("search_vendors").parameters(json!({"q": "bakery"})).build())
        .await;
    assert!(envelope.success);

    assert_eq!(env.cache.sets(), 1);
    assert_eq!(env.cache.last_ttl(), Some(Duration::from_secs(1800)));
}

#[tokio::test]
async fn each_cacheable_action_forwards_its_own_ttl() {
    init_test_logging();
    let env = TestEnv::new();

    assert!(env
        .process(RequestBuilder::new("vendor_analysis").parameters(json!({"vendor_id": "v-1"})).build())
        .await
        .success);
    assert_eq!(env.cache.last_ttl(), Some(Duration::from_secs(3600)));

    assert!(env.process(RequestBuilder::new("cost_analysis").build()).await.success);
    assert_eq!(env.cache.last_ttl(), Some(Duration::from_secs(7200)));

    assert!(env.process(RequestBuilder::new("sustainability_report").build()).await.success);
    assert_eq!(env.cache.last_ttl(), Some(Duration::from_secs(14400)));
}

fn any_cacheable_action() -> impl Strategy<Value = Action> {
    prop_oneof![
        Just(Action::SearchVendors),
        Just(Action::VendorAnalysis),
        Just(Action::CostAnalysis),
        Just(Action::SustainabilityReport),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 128, ..ProptestConfig::default() })]

    #[test]
    fn keys_are_deterministic(
        action in any_cacheable_action(),
        school in "[a-z0-9-]{1,16}",
        param_key in "[a-z_]{1,8}",
        param_value in "[a-zA-Z0-9 ]{0,24}",
    ) {
        let school = SchoolId::new(school);
        let params = json!({ &param_key: param_value });

        let a = cache_key(action, &school, &params);
        let b = cache_key(action, &school, &params);
        prop_assert_eq!(a, b);
    }

    #[test]
    fn keys_differ_when_any_component_differs(
        action in any_cacheable_action(),
        school in "[a-z0-9-]{1,16}",
        value_a in "[a-z]{1,12}",
        value_b in "[a-z]{1,12}",
    ) {
        prop_assume!(value_a != value_b);
        let school = SchoolId::new(school);

        let a = cache_key(action, &school, &json!({"q": value_a}));
        let b = cache_key(action, &school, &json!({"q": value_b}));
        prop_assert_ne!(a, b);
    }

    #[test]
    fn key_ignores_object_insertion_order(
        school in "[a-z0-9-]{1,16}",
        x in 0u32..1000,
        y in 0u32..1000,
    ) {
        let school = SchoolId::new(school);

        // serde_json maps are sorted, so insertion order cannot leak into
        // the derived key.
        let mut forward = serde_json::Map::new();
        forward.insert("x".into(), json!(x));
        forward.insert("y".into(), json!(y));
        let mut reverse = serde_json::Map::new();
        reverse.insert("y".into(), json!(y));
        reverse.insert("x".into(), json!(x));

        prop_assert_eq!(
            cache_key(Action::SearchVendors, &school, &forward.into()),
            cache_key(Action::SearchVendors, &school, &reverse.into())
        );
    }
}
