//! Cache metrics regression tests

use super::helpers::*;
use cache_probe_cache::{CacheLayer, EventKind, NamedCache};
use cache_probe_harness::{ClassScope, ContextConfig, SqrtCacheFixture, SqrtCall};
use serial_test::serial;
use std::time::Duration;
use tower::{Layer, Service, ServiceExt};

#[tokio::test]
#[serial]
async fn request_metrics_exist() {
    init_recorder();

    let layer: CacheLayer<u64, u64, &'static str> = CacheLayer::builder()
        .name("request_cache")
        .max_size(10)
        .key_extractor(|req: &u64| *req)
        .build();

    let service = tower::service_fn(|_: u64| async move { Ok::<_, &'static str>("response") });
    let mut service = layer.layer(service);

    // First call - cache miss
    let _ = service.ready().await.unwrap().call(1).await;

    // Second call with same key - cache hit
    let _ = service.ready().await.unwrap().call(1).await;

    assert_counter_exists("cache_requests_total");
    assert_metric_has_label("cache_requests_total", "cache", "request_cache");
    assert_metric_has_label("cache_requests_total", "result", "hit");
    assert_metric_has_label("cache_requests_total", "result", "miss");

    assert_gauge_exists("cache_size");
    assert_metric_has_label("cache_size", "cache", "request_cache");
}

#[tokio::test]
#[serial]
async fn entry_event_metrics_carry_the_kind() {
    init_recorder();

    let cache: NamedCache<u64, u64> =
        NamedCache::new("event_cache", 2, Some(Duration::from_millis(20)), &EventKind::ALL);

    cache.put(1, 1);
    cache.put(1, 2);
    cache.put(2, 2);
    cache.put(3, 3);
    cache.remove(&3);
    cache.put(4, 4);
    tokio::time::sleep(Duration::from_millis(50)).await;
    cache.purge_expired();

    assert_counter_exists("cache_entry_events_total");
    assert_metric_has_label("cache_entry_events_total", "cache", "event_cache");
    for kind in EventKind::ALL {
        assert_metric_has_label("cache_entry_events_total", "kind", kind.as_str());
    }
}

#[tokio::test]
#[serial]
async fn harness_run_reports_under_the_context_cache_name() {
    init_recorder();

    let config = ContextConfig::builder().cache_name("metered_sqrt").build();
    let mut scope = ClassScope::start("Metered", config).unwrap();
    let mut fixture: SqrtCacheFixture = scope.instantiate().unwrap();
    let guard = fixture.begin().unwrap();

    guard.test().direct().sqrt(2).await;
    guard.test().indirect().sqrt(2).await;

    assert_metric_has_label("cache_requests_total", "cache", "metered_sqrt");
    assert_metric_has_label("cache_entry_events_total", "cache", "metered_sqrt");
    assert_metric_has_label("cache_entry_events_total", "kind", "created");

    guard.finish().unwrap();
    scope.stop().unwrap();
}
