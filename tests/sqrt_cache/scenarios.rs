//! The cached-bean class, run the way a test driver runs it: one context for
//! the class, fresh fixture state for every method.

use super::init_tracing;
use cache_probe_harness::{
    assert_path_equivalence, CachedCallVerifier, CallPath, ClassRunner, ContextConfig,
    EventKind, HarnessError, SqrtCacheTest, SqrtCall,
};
use futures::future::{BoxFuture, FutureExt};
use std::sync::{Arc, Mutex};

const N: i32 = 25;

type Results = Arc<Mutex<Vec<(CallPath, Vec<f64>)>>>;

/// A test method that verifies `0..N` on `path` and records the results.
fn verifying(
    path: CallPath,
    results: Results,
) -> impl Fn(SqrtCacheTest) -> BoxFuture<'static, Result<(), HarnessError>> + Send + Sync + 'static
{
    move |test| {
        let results = Arc::clone(&results);
        async move {
            let values = CachedCallVerifier::range(N)
                .verify(test.handle(path), test.bucket())
                .await?;
            results.lock().unwrap().push((path, values));
            Ok(())
        }
        .boxed()
    }
}

#[tokio::test]
async fn cached_bean_class_passes_on_both_paths() {
    init_tracing();
    let results: Results = Arc::default();

    let report = ClassRunner::new("CachedBeanTest", ContextConfig::default())
        .method("direct", verifying(CallPath::Direct, Arc::clone(&results)))
        .method("indirect", verifying(CallPath::Indirect, Arc::clone(&results)))
        .run()
        .await;

    assert!(report.passed(), "{report:#?}");

    let results = results.lock().unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].0, CallPath::Direct);
    assert_eq!(results[1].0, CallPath::Indirect);
    assert_path_equivalence(&results[0].1, &results[1].1).unwrap();
}

#[tokio::test]
async fn direct_calls_create_one_entry_each() {
    init_tracing();

    let report = ClassRunner::new("DirectOnly", ContextConfig::default())
        .method("counts", |test| {
            async move {
                for i in 0..N {
                    let before = test.bucket().count(EventKind::Created);
                    assert_eq!(before, i as usize);
                    test.direct().sqrt(i).await;
                    assert_eq!(test.bucket().count(EventKind::Created), i as usize + 1);
                }
                assert_eq!(test.direct().computations(), N as usize);
                Ok(())
            }
            .boxed()
        })
        .run()
        .await;

    assert!(report.passed(), "{report:#?}");
}

#[tokio::test]
async fn replay_returns_identical_values_without_new_entries() {
    init_tracing();

    let report = ClassRunner::new("Replay", ContextConfig::default())
        .method("replay", |test| {
            async move {
                let mut first = Vec::new();
                for i in 0..N {
                    first.push(test.direct().sqrt(i).await);
                }
                for (i, value) in (0..N).zip(first) {
                    let again = test.direct().sqrt(i).await;
                    assert_eq!(again.to_bits(), value.to_bits());
                    assert_eq!(test.bucket().count(EventKind::Created), N as usize);
                }
                assert_eq!(test.direct().computations(), N as usize);
                assert!(test.bucket().get(EventKind::Updated).is_empty());
                Ok(())
            }
            .boxed()
        })
        .run()
        .await;

    assert!(report.passed(), "{report:#?}");
}

#[tokio::test]
async fn indirect_path_starts_from_a_fresh_bucket() {
    init_tracing();
    let results: Results = Arc::default();

    let report = ClassRunner::new("CachedBeanTest", ContextConfig::default())
        .method("direct", verifying(CallPath::Direct, Arc::clone(&results)))
        .method("indirect", |test| {
            async move {
                if !test.bucket().is_empty() || !test.cache().is_empty() {
                    return Err(HarnessError::assertion("indirect method saw leftovers"));
                }
                let values = CachedCallVerifier::range(N)
                    .verify(test.indirect(), test.bucket())
                    .await?;
                // the delegate reached the cache, never its own computation
                assert_eq!(test.indirect().computations(), N as usize);
                assert_eq!(test.direct().computations(), 0);
                assert_eq!(values[4], 2.0);
                Ok(())
            }
            .boxed()
        })
        .run()
        .await;

    assert!(report.passed(), "{report:#?}");
}

#[tokio::test]
async fn panic_inside_call_loop_does_not_leak_into_next_method() {
    init_tracing();

    let report = ClassRunner::new("PanicRecovery", ContextConfig::default())
        .method("panics_midway", |test| {
            async move {
                for i in 0..10 {
                    test.direct().sqrt(i).await;
                    assert!(i < 5, "gave up after f({i})");
                }
                Ok(())
            }
            .boxed()
        })
        .method("starts_clean", |test| {
            async move {
                if !test.bucket().is_empty() {
                    return Err(HarnessError::assertion("bucket kept events"));
                }
                if !test.cache().is_empty() {
                    return Err(HarnessError::assertion("cache kept entries"));
                }
                CachedCallVerifier::range(N)
                    .verify(test.direct(), test.bucket())
                    .await
                    .map(drop)
            }
            .boxed()
        })
        .run()
        .await;

    let failed = report.outcome("panics_midway").unwrap();
    let err = failed.assertion.as_ref().unwrap();
    assert!(err.is_assertion());
    assert!(err.to_string().contains("gave up after f(5)"), "{err}");
    assert!(failed.teardown.is_none());

    assert!(report.outcome("starts_clean").unwrap().passed(), "{report:#?}");
    assert!(report.teardown_error.is_none());
    assert!(report.skipped.is_empty());
}

#[tokio::test]
async fn reused_argument_is_reported_not_panicked() {
    init_tracing();

    let report = ClassRunner::new("ReusedArgs", ContextConfig::default())
        .method("reuse", |test| {
            async move {
                CachedCallVerifier::new([1, 2, 1])
                    .verify(test.direct(), test.bucket())
                    .await
                    .map(drop)
            }
            .boxed()
        })
        .run()
        .await;

    let outcome = report.outcome("reuse").unwrap();
    assert!(outcome.assertion.as_ref().unwrap().is_assertion());
    assert!(outcome.teardown.is_none());
}
