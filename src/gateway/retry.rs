//! Bounded retry policy for remote calls.
//!
//! Rate-limit responses back off linearly (`base_delay * attempt`),
//! connection failures and timeouts wait `base_delay`, anything else fails
//! at once. All of them share the same attempt budget.

use async_trait::async_trait;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::GatewayError;

/// Default number of attempts per operation.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default base delay between attempts.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(2);

/// Retry limits for a single remote operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum attempts, including the first one.
    pub max_attempts: u32,
    /// Base delay used for both backoff kinds.
    pub base_delay: Duration,
}

/// Something that can wait.
#[async_trait]
pub trait Sleeper: Send + Sync + fmt::Debug {
    /// Suspends the caller for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// Sleeper backed by the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

/// Runs operations under a [`RetryPolicy`].
#[derive(Debug, Clone)]
pub struct Retrier {
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy.
    #[must_use]
    pub const fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
        }
    }

    /// A policy that never waits, for tests.
    #[must_use]
    pub const fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Duration::ZERO)
    }
}

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

impl Retrier {
    /// Creates a retrier that sleeps on the tokio timer.
    #[must_use]
    pub fn new(policy: RetryPolicy) -> Self {
        Self::with_sleeper(policy, Arc::new(TokioSleeper))
    }

    /// Creates a retrier with a custom sleeper.
    #[must_use]
    pub fn with_sleeper(policy: RetryPolicy, sleeper: Arc<dyn Sleeper>) -> Self {
        Self { policy, sleeper }
    }

    /// Returns the policy.
    #[must_use]
    pub const fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Runs `attempt` until it succeeds, fails permanently, or the budget
    /// is spent.
    ///
    /// # Errors
    ///
    /// Returns the first non-retryable error as is, or
    /// `GatewayError::RetriesExhausted` wrapping the last retryable one.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut attempt: F) -> Result<T, GatewayError>
    where
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = Result<T, GatewayError>> + Send,
        T: Send,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut last_error = GatewayError::network("no attempt made");

        for n in 1..=max_attempts {
            debug!(operation, attempt = n, max_attempts, "sending request");

            let wait = match attempt().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_rate_limited() => {
                    let wait = self.policy.base_delay.saturating_mul(n);
                    warn!(operation, attempt = n, wait_secs = wait.as_secs_f64(), "rate limited");
                    last_error = err;
                    wait
                }
                Err(err) if err.is_transient() => {
                    warn!(operation, attempt = n, error = %err, "transient failure");
                    last_error = err;
                    self.policy.base_delay
                }
                Err(err) => return Err(err),
            };

            if n < max_attempts {
                self.sleeper.sleep(wait).await;
            }
        }

        Err(GatewayError::RetriesExhausted {
            attempts: max_attempts,
            last: Box::new(last_error),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingSleeper;
    use std::sync::Mutex;

    fn retrier(sleeper: &Arc<RecordingSleeper>) -> Retrier {
        Retrier::with_sleeper(
            RetryPolicy::new(3, Duration::from_secs(2)),
            Arc::clone(sleeper) as Arc<dyn Sleeper>,
        )
    }

    /// Returns the scripted results in order, one per attempt.
    fn scripted(
        results: Vec<Result<u32, GatewayError>>,
    ) -> (Arc<Mutex<u32>>, impl FnMut() -> std::future::Ready<Result<u32, GatewayError>> + Send)
    {
        let calls = Arc::new(Mutex::new(0_u32));
        let counter = Arc::clone(&calls);
        let mut results = results.into_iter();
        let f = move || {
            *counter.lock().unwrap() += 1;
            std::future::ready(results.next().unwrap_or(Ok(0)))
        };
        (calls, f)
    }

    #[tokio::test]
    async fn test_rate_limited_twice_then_success() {
        let sleeper = Arc::new(RecordingSleeper::default());
        let (calls, f) = scripted(vec![
            Err(GatewayError::RateLimited),
            Err(GatewayError::RateLimited),
            Ok(42),
        ]);

        let result = retrier(&sleeper).run("create", f).await;

        assert_eq!(result, Ok(42));
        assert_eq!(*calls.lock().unwrap(), 3);
        assert_eq!(
            sleeper.waits(),
            vec![Duration::from_secs(2), Duration::from_secs(4)]
        );
    }

    #[tokio::test]
    async fn test_network_error_waits_base_delay() {
        let sleeper = Arc::new(RecordingSleeper::default());
        let (_, f) = scripted(vec![Err(GatewayError::network("refused")), Ok(1)]);

        let result = retrier(&sleeper).run("list", f).await;

        assert_eq!(result, Ok(1));
        assert_eq!(sleeper.waits(), vec![Duration::from_secs(2)]);
    }

    #[tokio::test]
    async fn test_api_error_fails_immediately() {
        let sleeper = Arc::new(RecordingSleeper::default());
        let (calls, f) = scripted(vec![Err(GatewayError::api_error(400, "bad hostname")), Ok(1)]);

        let result = retrier(&sleeper).run("create", f).await;

        assert_eq!(result, Err(GatewayError::api_error(400, "bad hostname")));
        assert_eq!(*calls.lock().unwrap(), 1);
        assert!(sleeper.waits().is_empty());
    }

    #[tokio::test]
    async fn test_budget_exhausted() {
        let sleeper = Arc::new(RecordingSleeper::default());
        let (calls, f) = scripted(vec![
            Err(GatewayError::network("refused")),
            Err(GatewayError::RateLimited),
            Err(GatewayError::network("refused")),
        ]);

        let result = retrier(&sleeper).run("delete", f).await;

        assert_eq!(
            result,
            Err(GatewayError::RetriesExhausted {
                attempts: 3,
                last: Box::new(GatewayError::network("refused")),
            })
        );
        assert_eq!(*calls.lock().unwrap(), 3);
        // No wait after the final attempt.
        assert_eq!(
            sleeper.waits(),
            vec![Duration::from_secs(2), Duration::from_secs(4)]
        );
    }

    #[test]
    fn test_zero_attempts_still_tries_once() {
        let sleeper = Arc::new(RecordingSleeper::default());
        let retrier = Retrier::with_sleeper(
            RetryPolicy::new(0, Duration::from_secs(2)),
            Arc::clone(&sleeper) as Arc<dyn Sleeper>,
        );
        let (calls, f) = scripted(vec![Err(GatewayError::RateLimited)]);

        let result = tokio_test::block_on(retrier.run("list", f));

        assert!(matches!(
            result,
            Err(GatewayError::RetriesExhausted { attempts: 1, .. })
        ));
        assert_eq!(*calls.lock().unwrap(), 1);
        assert!(sleeper.waits().is_empty());
    }

    #[tokio::test]
    async fn test_huge_base_delay_saturates() {
        let sleeper = Arc::new(RecordingSleeper::default());
        let retrier = Retrier::with_sleeper(
            RetryPolicy::new(3, Duration::from_secs(u64::MAX)),
            Arc::clone(&sleeper) as Arc<dyn Sleeper>,
        );
        let (_, f) = scripted(vec![
            Err(GatewayError::RateLimited),
            Err(GatewayError::RateLimited),
            Ok(7),
        ]);

        let result = retrier.run("create", f).await;

        assert_eq!(result, Ok(7));
        assert_eq!(sleeper.waits(), vec![Duration::from_secs(u64::MAX), Duration::MAX]);
    }

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.base_delay, Duration::from_secs(2));
        assert_eq!(RetryPolicy::immediate(5).base_delay, Duration::ZERO);
    }
}
