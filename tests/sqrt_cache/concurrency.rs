//! Buckets fed from several tasks at once.

use super::init_tracing;
use cache_probe_harness::{ClassScope, ContextConfig, EventKind, SqrtCacheFixture, SqrtCall};
use std::collections::HashSet;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_distinct_calls_each_create_once() {
    init_tracing();
    let mut scope = ClassScope::start("Concurrent", ContextConfig::default()).unwrap();
    let mut fixture: SqrtCacheFixture = scope.instantiate().unwrap();
    let guard = fixture.begin().unwrap();

    let handles: Vec<_> = (0..200)
        .map(|i| {
            let direct = guard.test().direct().clone();
            let indirect = guard.test().indirect().clone();
            tokio::spawn(async move {
                if i % 2 == 0 {
                    direct.sqrt(i).await
                } else {
                    indirect.sqrt(i).await
                }
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap();
    }

    let created = guard.test().events(EventKind::Created);
    assert_eq!(created.len(), 200);
    let keys: HashSet<i32> = created.iter().map(|e| *e.key()).collect();
    assert_eq!(keys.len(), 200);

    guard.finish().unwrap();
    scope.stop().unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_replays_add_nothing() {
    init_tracing();
    let mut scope = ClassScope::start("ConcurrentReplay", ContextConfig::default()).unwrap();
    let mut fixture: SqrtCacheFixture = scope.instantiate().unwrap();
    let guard = fixture.begin().unwrap();

    for i in 0..50 {
        guard.test().direct().sqrt(i).await;
    }

    let handles: Vec<_> = (0..50)
        .cycle()
        .take(400)
        .map(|i| {
            let direct = guard.test().direct().clone();
            tokio::spawn(async move { (i, direct.sqrt(i).await) })
        })
        .collect();
    for handle in handles {
        let (i, root) = handle.await.unwrap();
        assert_eq!(root.to_bits(), f64::from(i).sqrt().to_bits());
    }

    assert_eq!(guard.test().bucket().count(EventKind::Created), 50);
    assert_eq!(guard.test().bucket().total(), 50);

    guard.finish().unwrap();
    scope.stop().unwrap();
}
