//! Result cache for read-mostly actions.
//!
//! Keys are derived deterministically from the `(action, school,
//! parameters)` tuple: the canonical JSON encoding of the tuple,
//! base64-encoded and prefixed with a constant tag. Only the four
//! whitelisted read-mostly actions ever touch the cache; each carries its
//! own TTL, which is forwarded to the underlying store on every write.

use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use mensa_core::{Action, Clock, Result, SchoolId};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;

use crate::collaborators::CacheStore;

const KEY_PREFIX: &str = "marketplace:";

/// Derives the cache key for a request tuple.
///
/// Parameter objects are canonicalized to sorted key order first, so
/// structurally identical bags produce identical keys regardless of
/// construction order.
pub fn cache_key(action: Action, school_id: &SchoolId, parameters: &Value) -> String {
    let tuple = serde_json::json!({
        "action": action.as_str(),
        "school_id": school_id.as_str(),
        "parameters": canonical(parameters),
    });
    format!("{KEY_PREFIX}{}", BASE64.encode(tuple.to_string()))
}

fn canonical(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut out = serde_json::Map::new();
            for key in keys {
                out.insert(key.clone(), canonical(&map[key]));
            }
            Value::Object(out)
        },
        Value::Array(items) => Value::Array(items.iter().map(canonical).collect()),
        other => other.clone(),
    }
}

/// Whitelist-enforcing wrapper over the cache accessor.
#[derive(Clone)]
pub struct ResultCache {
    store: Arc<dyn CacheStore>,
}

impl ResultCache {
    /// Wraps a cache accessor.
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    /// Looks up a cached result for the request tuple.
    ///
    /// Non-cacheable actions return `None` without consulting the store.
    /// Store failures degrade to a miss: the cache is an optimization and
    /// must not fail the request.
    pub async fn lookup(
        &self,
        action: Action,
        school_id: &SchoolId,
        parameters: &Value,
    ) -> Option<Value> {
        if !action.is_cacheable() {
            return None;
        }
        let key = cache_key(action, school_id, parameters);
        match self.store.get(&key).await {
            Ok(hit) => hit,
            Err(error) => {
                debug!(%action, %error, "cache read failed, treating as miss");
                None
            },
        }
    }

    /// Stores a freshly computed result, forwarding the action's TTL.
    ///
    /// No-op for non-cacheable actions. Store failures are logged and
    /// swallowed.
    pub async fn store(
        &self,
        action: Action,
        school_id: &SchoolId,
        parameters: &Value,
        value: Value,
    ) {
        let Some(ttl) = action.cache_ttl() else {
            return;
        };
        let key = cache_key(action, school_id, parameters);
        if let Err(error) = self.store.set(&key, value, Some(ttl)).await {
            debug!(%action, %error, "cache write failed, result not cached");
        }
    }
}

/// In-memory cache accessor with clock-driven expiry.
///
/// Entries past their deadline read as misses and are evicted lazily.
#[derive(Debug)]
pub struct InMemoryCacheStore {
    clock: Arc<dyn Clock>,
    entries: RwLock<HashMap<String, CacheEntry>>,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Value,
    expires_at: Option<Instant>,
}

impl InMemoryCacheStore {
    /// Creates an empty store using the given clock for expiry.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock, entries: RwLock::new(HashMap::new()) }
    }

    /// Number of live entries, counting not-yet-evicted expired ones.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the store holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl CacheStore for InMemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let now = self.clock.now();
        let mut entries = self.entries.write().await;
        match entries.get(key) {
            Some(entry) if entry.expires_at.is_some_and(|deadline| now >= deadline) => {
                entries.remove(key);
                Ok(None)
            },
            Some(entry) => Ok(Some(entry.value.clone())),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: Value, ttl: Option<Duration>) -> Result<()> {
        let expires_at = ttl.map(|ttl| self.clock.now() + ttl);
        self.entries.write().await.insert(key.to_string(), CacheEntry { value, expires_at });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use mensa_core::TestClock;
    use serde_json::json;

    use super::*;

    #[test]
    fn identical_tuples_derive_identical_keys() {
        let school = SchoolId::new("school-1");
        let a = cache_key(Action::SearchVendors, &school, &json!({"category": "produce"}));
        let b = cache_key(Action::SearchVendors, &school, &json!({"category": "produce"}));
        assert_eq!(a, b);
        assert!(a.starts_with(KEY_PREFIX));
    }

    #[test]
    fn any_tuple_component_changes_the_key() {
        let school = SchoolId::new("school-1");
        let params = json!({"category": "produce"});
        let base = cache_key(Action::SearchVendors, &school, &params);

        assert_ne!(base, cache_key(Action::VendorAnalysis, &school, &params));
        assert_ne!(base, cache_key(Action::SearchVendors, &SchoolId::new("school-2"), &params));
        assert_ne!(
            base,
            cache_key(Action::SearchVendors, &school, &json!({"category": "dairy"}))
        );
    }

    #[tokio::test]
    async fn entries_expire_after_ttl() {
        let clock = Arc::new(TestClock::new());
        let store = InMemoryCacheStore::new(clock.clone());

        store.set("k", json!(1), Some(Duration::from_secs(60))).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(json!(1)));

        clock.advance(Duration::from_secs(61));
        assert_eq!(store.get("k").await.unwrap(), None);
        assert!(store.is_empty().await, "expired entry should be evicted on read");
    }

    #[tokio::test]
    async fn entries_without_ttl_do_not_expire() {
        let clock = Arc::new(TestClock::new());
        let store = InMemoryCacheStore::new(clock.clone());

        store.set("k", json!("keep"), None).await.unwrap();
        clock.advance(Duration::from_secs(100_000));
        assert_eq!(store.get("k").await.unwrap(), Some(json!("keep")));
    }

    #[tokio::test]
    async fn non_cacheable_actions_never_touch_the_store() {
        let clock = Arc::new(TestClock::new());
        let store = Arc::new(InMemoryCacheStore::new(clock));
        let cache = ResultCache::new(store.clone());
        let school = SchoolId::new("school-1");

        cache.store(Action::PlaceOrder, &school, &json!({}), json!({"ok": true})).await;
        assert!(store.is_empty().await);
        assert!(cache.lookup(Action::PlaceOrder, &school, &json!({})).await.is_none());
    }

    #[tokio::test]
    async fn cacheable_round_trip_preserves_value() {
        let clock = Arc::new(TestClock::new());
        let cache = ResultCache::new(Arc::new(InMemoryCacheStore::new(clock)));
        let school = SchoolId::new("school-1");
        let params = json!({"q": "bakery"});

        assert!(cache.lookup(Action::SearchVendors, &school, &params).await.is_none());
        cache.store(Action::SearchVendors, &school, &params, json!({"vendors": []})).await;
        assert_eq!(
            cache.lookup(Action::SearchVendors, &school, &params).await,
            Some(json!({"vendors": []}))
        );
    }
}
