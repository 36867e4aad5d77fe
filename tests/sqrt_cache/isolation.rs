//! Isolation between test methods and between test classes.

use super::init_tracing;
use cache_probe_harness::{
    CachedCallVerifier, ClassScope, ContextConfig, EventKind, SqrtCacheFixture, SqrtCall,
};

#[tokio::test]
async fn methods_in_one_class_share_the_context_but_not_state() {
    init_tracing();
    let mut scope = ClassScope::new("SharedContext", ContextConfig::default());

    let mut first: SqrtCacheFixture = scope.instantiate().unwrap();
    let cache = first.instance().cache().clone();
    let guard = first.begin().unwrap();
    CachedCallVerifier::range(10)
        .verify(guard.test().direct(), guard.test().bucket())
        .await
        .unwrap();
    assert_eq!(cache.len(), 10);
    guard.finish().unwrap();

    let mut second: SqrtCacheFixture = scope.instantiate().unwrap();
    // same class, same cache instance
    second.instance().cache().put(99, 1.0);
    assert_eq!(cache.len(), 1);
    cache.clear();

    let guard = second.begin().unwrap();
    assert!(guard.test().bucket().is_empty());
    CachedCallVerifier::range(10)
        .verify(guard.test().indirect(), guard.test().bucket())
        .await
        .unwrap();
    guard.finish().unwrap();

    scope.stop().unwrap();
    assert!(cache.is_empty());
    assert_eq!(cache.listener_count(), 0);
}

#[tokio::test]
async fn classes_never_see_each_other() {
    init_tracing();
    let mut a = ClassScope::start("ClassA", ContextConfig::default()).unwrap();
    let mut b = ClassScope::start("ClassB", ContextConfig::default()).unwrap();

    let mut fixture_a: SqrtCacheFixture = a.instantiate().unwrap();
    let mut fixture_b: SqrtCacheFixture = b.instantiate().unwrap();
    let guard_a = fixture_a.begin().unwrap();
    let guard_b = fixture_b.begin().unwrap();

    guard_a.test().direct().sqrt(7).await;

    assert_eq!(guard_a.test().bucket().count(EventKind::Created), 1);
    assert!(guard_b.test().bucket().is_empty());
    assert!(guard_b.test().cache().is_empty());

    // the same argument is a fresh entry in the other class
    guard_b.test().direct().sqrt(7).await;
    assert_eq!(guard_b.test().bucket().count(EventKind::Created), 1);
    assert_eq!(guard_a.test().bucket().count(EventKind::Created), 1);

    guard_a.finish().unwrap();
    guard_b.finish().unwrap();
    a.stop().unwrap();
    b.stop().unwrap();
}

#[tokio::test]
async fn second_class_run_starts_from_scratch() {
    init_tracing();

    for run in 0..2 {
        let mut scope = ClassScope::new(format!("Repeated#{run}"), ContextConfig::default());
        let mut fixture: SqrtCacheFixture = scope.instantiate().unwrap();
        let guard = fixture.begin().unwrap();

        let results = CachedCallVerifier::range(25)
            .verify(guard.test().direct(), guard.test().bucket())
            .await
            .unwrap();
        assert_eq!(results[25 - 1], 24f64.sqrt());
        assert_eq!(guard.test().direct().computations(), 25);

        guard.finish().unwrap();
        scope.stop().unwrap();
    }
}

#[tokio::test]
async fn dropped_guard_still_cleans_up() {
    init_tracing();
    let mut scope = ClassScope::start("Dropped", ContextConfig::default()).unwrap();
    let mut fixture: SqrtCacheFixture = scope.instantiate().unwrap();
    let cache = fixture.instance().cache().clone();

    {
        let guard = fixture.begin().unwrap();
        guard.test().indirect().sqrt(3).await;
        assert_eq!(cache.listener_count(), EventKind::ALL.len());
    }

    assert_eq!(cache.listener_count(), 0);
    assert!(cache.is_empty());
    assert!(fixture.instance().bucket().is_empty());
    scope.stop().unwrap();
}
