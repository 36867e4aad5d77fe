//! Checks that a cached call creates exactly one entry per new argument and
//! keeps returning the same value afterwards.

use crate::bucket::EventBucket;
use crate::components::SqrtCall;
use crate::error::HarnessError;
use cache_probe_cache::EventKind;

#[cfg(feature = "tracing")]
use tracing::trace;

/// Drives a [`SqrtCall`] over a list of arguments and checks the creation
/// events captured in a bucket against it.
///
/// The oracle counts Created events: before the `n`-th call exactly `n` must
/// have been seen, after it exactly `n + 1`. Arguments are therefore expected
/// to be distinct. A repeated argument is a cache hit, produces no event and
/// fails the check; that is the point of the oracle, not a defect in it.
///
/// # Examples
///
/// ```
/// use cache_probe_harness::{ClassScope, ContextConfig, CachedCallVerifier, SqrtCacheFixture};
///
/// # async fn example() -> Result<(), cache_probe_harness::HarnessError> {
/// let mut scope = ClassScope::new("CachedBeanTest", ContextConfig::default());
/// let mut fixture: SqrtCacheFixture = scope.instantiate()?;
///
/// let guard = fixture.begin()?;
/// let test = guard.test();
/// let results = CachedCallVerifier::range(25)
///     .verify(test.direct(), test.bucket())
///     .await?;
/// assert_eq!(results[16], 4.0);
/// guard.finish()?;
/// scope.stop()
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedCallVerifier {
    args: Vec<i32>,
}

impl CachedCallVerifier {
    /// Verifies the given arguments, in order.
    pub fn new(args: impl IntoIterator<Item = i32>) -> Self {
        Self {
            args: args.into_iter().collect(),
        }
    }

    /// Verifies `0..n`.
    pub fn range(n: i32) -> Self {
        Self::new(0..n)
    }

    /// Runs the check and returns the first-pass results, one per argument.
    ///
    /// `bucket` must be subscribed to Created events of the cache behind
    /// `call` and must not have captured anything yet.
    pub async fn verify(
        &self,
        call: &dyn SqrtCall,
        bucket: &EventBucket<i32, f64>,
    ) -> Result<Vec<f64>, HarnessError> {
        let created = || bucket.count(EventKind::Created);

        let initial = created();
        if initial != 0 {
            return Err(HarnessError::assertion(format!(
                "expected no creation events before the first {} call, found {initial}",
                call.path()
            )));
        }

        let mut results = Vec::with_capacity(self.args.len());
        for (n, &i) in self.args.iter().enumerate() {
            let before = created();
            if before != n {
                return Err(HarnessError::assertion(format!(
                    "before f({i}): expected {n} creation events, found {before}"
                )));
            }

            let result = call.sqrt(i).await;

            #[cfg(feature = "tracing")]
            trace!(path = %call.path(), "f({i}) = {result}");

            let after = created();
            if after != n + 1 {
                return Err(HarnessError::assertion(format!(
                    "after f({i}): expected {} creation events, found {after}",
                    n + 1
                )));
            }
            results.push(result);
        }

        let expected = self.args.len();
        for (&i, &first) in self.args.iter().zip(&results) {
            let again = call.sqrt(i).await;
            if again.to_bits() != first.to_bits() {
                return Err(HarnessError::assertion(format!(
                    "f({i}) returned {again} on replay, {first} the first time"
                )));
            }
            let count = created();
            if count != expected {
                return Err(HarnessError::assertion(format!(
                    "replaying f({i}) changed the creation count from {expected} to {count}"
                )));
            }
        }

        Ok(results)
    }
}

/// Checks that the direct and indirect paths produced the same values, bit
/// for bit.
pub fn assert_path_equivalence(direct: &[f64], indirect: &[f64]) -> Result<(), HarnessError> {
    if direct.len() != indirect.len() {
        return Err(HarnessError::assertion(format!(
            "direct path produced {} results, indirect path {}",
            direct.len(),
            indirect.len()
        )));
    }
    match direct
        .iter()
        .zip(indirect)
        .position(|(d, i)| d.to_bits() != i.to_bits())
    {
        Some(at) => Err(HarnessError::assertion(format!(
            "result {at} differs: direct {} vs indirect {}",
            direct[at], indirect[at]
        ))),
        None => Ok(()),
    }
}
