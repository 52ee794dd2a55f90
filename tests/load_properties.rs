//! Behavioural tests for cache-aside loading
//!
//! Everything runs against in-memory storage, a manual clock and a scripted
//! fetcher, so cache age and network calls are fully controlled.

mod common;

use serde_json::{json, Value};
use std::time::Duration;

use common::{Harness, ScriptedFetcher, T0};
use portal_cache::resources::{apps, news, AppEntry};
use portal_cache::{CacheRecord, MemoryStorage, Resource, ServedFrom, Storage, Validator};

const KEY: &str = "APP_SYSTEMS_CACHE_V1";
const TTL_MS: i64 = 600_000;

fn systems_resource() -> Resource<Value> {
    Resource::new(
        KEY,
        "https://teso.mn/api/systems",
        Duration::from_millis(TTL_MS as u64),
        Validator::predicate("expected {status, result: array}", |v| {
            v.get("status").is_some() && v["result"].is_array()
        }),
    )
    .unwrap()
}

fn payload(name: &str) -> Value {
    json!({"status": 200, "result": [{"id": 1, "name": name, "link": "https://example.test/"}]})
}

fn stored(h: &Harness) -> Option<CacheRecord<Value>> {
    h.store().record(KEY)
}

#[tokio::test]
async fn test_cache_hit_avoids_network() {
    let h = Harness::new();
    h.store().set(KEY, &payload("cached"));
    h.clock.set(T0 + 300_000);

    let outcome = h.loader.load(&systems_resource(), false).await;

    assert_eq!(outcome.served_from, ServedFrom::Cache);
    assert_eq!(outcome.data, Some(payload("cached")));
    assert!(outcome.notice.is_none());
    assert_eq!(h.fetcher().calls(), 0);
}

#[tokio::test]
async fn test_expiry_forces_refetch() {
    let h = Harness::new();
    h.store().set(KEY, &payload("cached"));
    h.clock.set(T0 + 700_000);
    h.fetcher().push_ok(payload("fresh"));

    let outcome = h.loader.load(&systems_resource(), false).await;

    assert_eq!(h.fetcher().calls(), 1);
    assert_eq!(outcome.served_from, ServedFrom::Network);
    assert_eq!(outcome.data, Some(payload("fresh")));

    let record = stored(&h).unwrap();
    assert_eq!(record.timestamp, T0 + 700_000);
    assert_eq!(record.data, payload("fresh"));
}

#[tokio::test]
async fn test_stale_fallback_on_transport_failure() {
    let h = Harness::new();
    h.store().set(KEY, &payload("yesterday"));
    h.clock.set(T0 + 86_400_000);

    let outcome = h.loader.load(&systems_resource(), false).await;

    assert_eq!(h.fetcher().calls(), 1);
    assert_eq!(outcome.served_from, ServedFrom::Stale);
    assert_eq!(outcome.data, Some(payload("yesterday")));
    assert!(outcome.notice.unwrap().contains("network unreachable"));
    // The stale record is left in place for the next outage
    assert_eq!(stored(&h).unwrap().timestamp, T0);
}

#[tokio::test]
async fn test_no_cache_and_network_down_is_empty() {
    let h = Harness::new();

    let outcome = h.loader.load(&systems_resource(), false).await;

    assert_eq!(outcome.served_from, ServedFrom::None);
    assert!(outcome.is_empty());
    assert!(outcome.notice.is_some());
    assert!(h.storage.is_empty(), "no record should be written");
}

#[tokio::test]
async fn test_invalid_payload_falls_back_to_stale() {
    let h = Harness::new();
    h.store().set(KEY, &payload("old"));
    h.clock.set(T0 + 700_000);
    h.fetcher().push_ok(json!({"unexpected": true}));

    let outcome = h.loader.load(&systems_resource(), false).await;

    assert_eq!(outcome.served_from, ServedFrom::Stale);
    assert_eq!(outcome.data, Some(payload("old")));
    assert!(outcome.notice.unwrap().contains("validation"));

    let record = stored(&h).unwrap();
    assert_eq!(record.timestamp, T0, "invalid payload must not be cached");
    assert_eq!(record.data, payload("old"));
}

#[tokio::test]
async fn test_invalid_payload_without_cache_is_empty() {
    let h = Harness::new();
    h.fetcher().push_ok(json!({"unexpected": true}));

    let outcome = h.loader.load(&systems_resource(), false).await;

    assert_eq!(outcome.served_from, ServedFrom::None);
    assert!(h.storage.is_empty());
}

#[tokio::test]
async fn test_force_bypasses_fresh_cache() {
    let h = Harness::new();
    h.store().set(KEY, &payload("cached"));
    h.clock.set(T0 + 1_000);
    h.fetcher().push_ok(payload("forced"));

    let outcome = h.loader.load(&systems_resource(), true).await;

    assert_eq!(h.fetcher().calls(), 1);
    assert_eq!(outcome.served_from, ServedFrom::Network);
    assert_eq!(outcome.data, Some(payload("forced")));

    let record = stored(&h).unwrap();
    assert_eq!(record.timestamp, T0 + 1_000);
    assert_eq!(record.data, payload("forced"));
}

#[tokio::test]
async fn test_forced_failure_still_serves_cached_data() {
    let h = Harness::new();
    h.store().set(KEY, &payload("cached"));

    let outcome = h.loader.load(&systems_resource(), true).await;

    assert_eq!(outcome.served_from, ServedFrom::Stale);
    assert_eq!(outcome.data, Some(payload("cached")));
}

#[tokio::test]
async fn test_corrupt_record_self_heals() {
    let h = Harness::new();
    h.storage.write(KEY, "{\"timestamp\": oops").unwrap();

    assert!(h
        .store()
        .get::<Value>(KEY, Duration::from_millis(TTL_MS as u64))
        .is_none());
    assert!(h.storage.read(KEY).unwrap().is_none(), "corrupt record should be removed");

    h.fetcher().push_ok(payload("fresh"));
    let outcome = h.loader.load(&systems_resource(), false).await;

    assert_eq!(outcome.served_from, ServedFrom::Network);
    assert_eq!(stored(&h).unwrap().data, payload("fresh"));
}

#[tokio::test]
async fn test_corrupt_record_is_a_miss_for_load() {
    let h = Harness::new();
    h.storage.write(KEY, "not json at all").unwrap();
    h.fetcher().push_ok(payload("fresh"));

    let outcome = h.loader.load(&systems_resource(), false).await;

    assert_eq!(h.fetcher().calls(), 1);
    assert_eq!(outcome.data, Some(payload("fresh")));
}

#[test]
fn test_set_is_idempotent_on_data() {
    let h = Harness::new();
    let x = payload("same");

    h.store().set(KEY, &x);
    let first = stored(&h).unwrap();
    h.clock.advance(42);
    h.store().set(KEY, &x);
    let second = stored(&h).unwrap();

    assert_eq!(second.timestamp, first.timestamp + 42);
    assert_eq!(second.data, first.data);
    assert_eq!(
        h.store().get::<Value>(KEY, Duration::from_millis(TTL_MS as u64)),
        Some(x)
    );
}

#[tokio::test]
async fn test_invalid_stale_record_is_removed() {
    let h = Harness::new();
    h.store().set(KEY, &json!({"legacy": "format"}));
    h.clock.set(T0 + 700_000);

    let outcome = h.loader.load(&systems_resource(), false).await;

    assert_eq!(outcome.served_from, ServedFrom::None);
    assert!(h.storage.is_empty(), "invalid stale record should be deleted");
}

#[tokio::test]
async fn test_invalid_fresh_record_is_removed_and_refetched() {
    let h = Harness::new();
    h.store().set(KEY, &json!({"legacy": "format"}));
    h.fetcher().push_ok(payload("fresh"));

    let outcome = h.loader.load(&systems_resource(), false).await;

    assert_eq!(h.fetcher().calls(), 1);
    assert_eq!(outcome.served_from, ServedFrom::Network);
    assert_eq!(stored(&h).unwrap().data, payload("fresh"));
}

#[tokio::test]
async fn test_full_storage_still_returns_fresh_data() {
    let h = Harness::with_storage(ScriptedFetcher::default(), MemoryStorage::with_quota(16));
    h.fetcher().push_ok(payload("uncacheable"));

    let outcome = h.loader.load(&systems_resource(), false).await;

    assert_eq!(outcome.served_from, ServedFrom::Network);
    assert_eq!(outcome.data, Some(payload("uncacheable")));
    assert!(h.storage.is_empty());
}

#[tokio::test]
async fn test_concurrent_loads_share_one_request() {
    let h = Harness::with_fetcher(ScriptedFetcher::with_delay(Duration::from_millis(20)));
    h.fetcher().push_ok(payload("shared"));
    let resource = systems_resource();

    let (a, b) = tokio::join!(
        h.loader.load(&resource, false),
        h.loader.load(&resource, true)
    );

    assert_eq!(h.fetcher().calls(), 1);
    assert_eq!(a.served_from, ServedFrom::Network);
    assert_eq!(b.served_from, ServedFrom::Network);
    assert_eq!(a.data, b.data);
    assert_eq!(h.loader.in_flight(), 0);
}

#[tokio::test]
async fn test_sequential_loads_after_completion_fetch_again() {
    let h = Harness::new();
    h.fetcher().push_ok(payload("one"));
    h.fetcher().push_ok(payload("two"));
    let resource = systems_resource();

    h.loader.load(&resource, true).await;
    let second = h.loader.load(&resource, true).await;

    assert_eq!(h.fetcher().calls(), 2);
    assert_eq!(second.data, Some(payload("two")));
}

#[tokio::test]
async fn test_abandoned_load_still_writes_cache() {
    let h = Harness::with_fetcher(ScriptedFetcher::with_delay(Duration::from_millis(50)));
    h.fetcher().push_ok(payload("late"));

    let abandoned =
        tokio::time::timeout(Duration::from_millis(5), h.loader.load(&systems_resource(), false))
            .await;
    assert!(abandoned.is_err(), "load should still be in flight");

    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(stored(&h).unwrap().data, payload("late"));
    assert_eq!(h.loader.in_flight(), 0);
}

#[tokio::test]
async fn test_typed_widget_resources() {
    let h = Harness::new();
    h.fetcher().push_ok(payload("ERP"));

    let outcome = h.loader.load(&apps("/api/systems").unwrap(), false).await;

    assert_eq!(outcome.served_from, ServedFrom::Network);
    let entries: Vec<AppEntry> = outcome.data.unwrap();
    assert_eq!(entries[0].name, "ERP");

    // The news feed has its own key, so the app record does not satisfy it
    let news_outcome = h.loader.load(&news("/news.json").unwrap(), false).await;
    assert_eq!(news_outcome.served_from, ServedFrom::None);
}
