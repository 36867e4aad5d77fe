//! Setup failures abort a class before any test method runs.

use super::init_tracing;
use cache_probe_harness::{
    ClassRunner, ClassScope, ContextConfig, EventKind, HarnessError, SqrtCacheFixture,
    TestContext,
};
use futures::FutureExt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn runner_with_counted_methods(config: ContextConfig, ran: &Arc<AtomicUsize>) -> ClassRunner {
    let mut runner = ClassRunner::new("Aborted", config);
    for name in ["first", "second", "third"] {
        let ran = Arc::clone(ran);
        runner = runner.method(name, move |_test| {
            ran.fetch_add(1, Ordering::SeqCst);
            async { Ok(()) }.boxed()
        });
    }
    runner
}

#[tokio::test]
async fn malformed_context_aborts_every_method() {
    init_tracing();

    let broken = [
        ContextConfig::builder().cache_name("").build(),
        ContextConfig::builder().max_size(0).build(),
        ContextConfig::builder().event_kinds(Vec::new()).build(),
        ContextConfig::builder().ttl(Duration::ZERO).build(),
    ];

    for config in broken {
        let ran = Arc::new(AtomicUsize::new(0));
        let report = runner_with_counted_methods(config, &ran).run().await;

        assert!(report.setup_error.as_ref().unwrap().is_setup(), "{report:?}");
        assert_eq!(report.skipped, ["first", "second", "third"]);
        assert!(report.methods.is_empty());
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }
}

#[tokio::test]
async fn unsupported_listener_kind_names_the_kind() {
    init_tracing();
    let config = ContextConfig::builder()
        .event_kinds([EventKind::Created, EventKind::Removed])
        .build();

    let ran = Arc::new(AtomicUsize::new(0));
    let report = runner_with_counted_methods(config, &ran)
        .listen_for([EventKind::Created, EventKind::Updated])
        .run()
        .await;

    let err = report.setup_error.unwrap();
    assert_eq!(
        err,
        HarnessError::UnsupportedEventKind {
            kind: EventKind::Updated,
            cache: "sqrt".to_string(),
        }
    );
    assert!(err.to_string().contains("updated"));
    assert_eq!(ran.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn narrowed_listeners_run_when_supported() {
    init_tracing();
    let config = ContextConfig::builder()
        .event_kinds([EventKind::Created])
        .build();

    let ran = Arc::new(AtomicUsize::new(0));
    let report = runner_with_counted_methods(config, &ran)
        .listen_for([EventKind::Created])
        .run()
        .await;

    assert!(report.passed(), "{report:?}");
    assert_eq!(ran.load(Ordering::SeqCst), 3);
}

#[test]
fn subscription_failure_leaves_no_listener_behind() {
    let config = ContextConfig::builder()
        .event_kinds([EventKind::Created, EventKind::Updated])
        .build();
    let ctx = TestContext::create(config).unwrap();
    let mut fixture = SqrtCacheFixture::with_kinds(&ctx, &EventKind::ALL).unwrap();

    assert!(fixture.before_each().unwrap_err().is_setup());
    assert_eq!(ctx.cache().listener_count(), 0);
    ctx.destroy().unwrap();
}

#[test]
fn eager_scope_reports_the_offending_cache() {
    let err = ClassScope::start(
        "Eager",
        ContextConfig::builder().cache_name("roots").max_size(0).build(),
    )
    .err()
    .unwrap();

    match err {
        HarnessError::Setup { scope, reason } => {
            assert_eq!(scope, "roots");
            assert!(reason.contains("max_size"));
        }
        other => panic!("expected a setup error, got {other:?}"),
    }
}
