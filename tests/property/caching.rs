//! Property tests for memoized calls.
//!
//! Invariants tested:
//! - Every distinct argument creates exactly one entry
//! - Replayed calls return bit-identical results
//! - Direct and indirect paths agree
//! - A repeated argument always trips the creation oracle

use cache_probe_harness::{
    assert_path_equivalence, CachedCallVerifier, CallPath, ClassScope, ContextConfig, EventKind,
    HarnessError, SqrtCacheFixture, SqrtCall,
};
use proptest::prelude::*;
use std::collections::HashSet;
use tokio::runtime::Runtime;

fn distinct_args() -> impl Strategy<Value = Vec<i32>> {
    prop::collection::hash_set(any::<i32>(), 0..60).prop_map(|set| set.into_iter().collect())
}

/// Runs the verifier for `args` on `path` inside a fresh class.
async fn verify_in_fresh_class(path: CallPath, args: &[i32]) -> Result<Vec<f64>, HarnessError> {
    let mut scope = ClassScope::new("Property", ContextConfig::default());
    let mut fixture: SqrtCacheFixture = scope.instantiate()?;
    let guard = fixture.begin()?;
    let results = CachedCallVerifier::new(args.iter().copied())
        .verify(guard.test().handle(path), guard.test().bucket())
        .await;
    guard.finish()?;
    scope.stop()?;
    results
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: distinct arguments each create exactly one entry, and the
    /// results are the square roots of the arguments
    #[test]
    fn distinct_arguments_create_once(args in distinct_args()) {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let results = verify_in_fresh_class(CallPath::Direct, &args).await;
            prop_assert!(results.is_ok(), "verification failed: {:?}", results);

            let results = results.unwrap();
            prop_assert_eq!(results.len(), args.len());
            for (&i, root) in args.iter().zip(&results) {
                prop_assert_eq!(root.to_bits(), f64::from(i).sqrt().to_bits());
            }
            Ok(())
        })?;
    }

    /// Property: both call paths produce the same values for the same arguments
    #[test]
    fn paths_agree(args in distinct_args()) {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let direct = verify_in_fresh_class(CallPath::Direct, &args).await;
            let indirect = verify_in_fresh_class(CallPath::Indirect, &args).await;
            prop_assert!(direct.is_ok() && indirect.is_ok());

            let outcome = assert_path_equivalence(&direct.unwrap(), &indirect.unwrap());
            prop_assert!(outcome.is_ok(), "{:?}", outcome);
            Ok(())
        })?;
    }

    /// Property: a repeated argument is a cache hit and fails the oracle
    #[test]
    fn repeated_argument_is_detected(
        mut args in distinct_args().prop_filter("need one argument", |a| !a.is_empty()),
        pick in any::<prop::sample::Index>(),
    ) {
        let repeated = args[pick.index(args.len())];
        args.push(repeated);

        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let outcome = verify_in_fresh_class(CallPath::Indirect, &args).await;
            prop_assert!(matches!(outcome, Err(HarnessError::Assertion(_))), "{:?}", outcome);
            Ok(())
        })?;
    }

    /// Property: for any call sequence, creations equal the number of
    /// distinct arguments and computations never exceed it
    #[test]
    fn creations_match_distinct_arguments(
        calls in prop::collection::vec((-50i32..50, any::<bool>()), 0..200),
    ) {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let mut scope = ClassScope::new("Sequence", ContextConfig::default());
            let mut fixture: SqrtCacheFixture = scope.instantiate().unwrap();
            let guard = fixture.begin().unwrap();
            let test = guard.test();

            for &(i, direct) in &calls {
                let root = if direct {
                    test.direct().sqrt(i).await
                } else {
                    test.indirect().sqrt(i).await
                };
                prop_assert_eq!(root.to_bits(), f64::from(i).sqrt().to_bits());
            }

            let distinct: HashSet<i32> = calls.iter().map(|&(i, _)| i).collect();
            prop_assert_eq!(test.bucket().count(EventKind::Created), distinct.len());
            prop_assert_eq!(
                test.direct().computations() + test.indirect().computations(),
                distinct.len()
            );
            prop_assert_eq!(test.bucket().count(EventKind::Updated), 0);

            guard.finish().unwrap();
            scope.stop().unwrap();
            Ok(())
        })?;
    }
}
