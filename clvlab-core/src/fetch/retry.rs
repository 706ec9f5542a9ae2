//! Retry loop with exponential-jitter backoff and a soft-failure contract.
//!
//! A source's retries are strictly sequential: attempt *k+1* starts only
//! after attempt *k*'s outcome and the backoff delay. The loop never raises:
//! after the final failed attempt it returns a terminal `Fail` status with
//! the last error preserved, so one source's exhaustion cannot abort other
//! sources' fetches. Every attempt emits a tracing event for audit.

use std::time::Duration;

use chrono::Utc;
use rand::Rng;

use crate::cancel::CancelToken;
use crate::domain::Source;
use crate::fetch::provider::{FeedError, FeedProvider, FetchResult, FetchStatus};

/// Backoff and attempt-cap configuration.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RetryPolicy {
    /// Maximum attempts per source (>= 1).
    pub max_attempts: u32,
    /// Lower bound of every backoff interval.
    pub base_delay: Duration,
    /// Upper bound the growing interval is capped at.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    /// Delay after failed attempt `attempt` (1-based), drawn uniformly from
    /// `[base, min(base * 2^(attempt-1), cap)]`. The jitter de-synchronizes
    /// retry storms across sources.
    pub fn backoff_delay(&self, attempt: u32, rng: &mut impl Rng) -> Duration {
        let base = self.base_delay.as_millis() as u64;
        let cap = self.max_delay.as_millis() as u64;
        let exp = attempt.saturating_sub(1).min(32);
        let grown = base.saturating_mul(1u64 << exp);
        let upper = grown.min(cap).max(base);
        Duration::from_millis(rng.gen_range(base..=upper))
    }
}

/// Fetch one source with retries, returning a terminal result.
///
/// Transient errors are retried up to `policy.max_attempts`; non-transient
/// errors (malformed payload, cancellation) end the loop immediately. The
/// returned `attempts` counts attempts actually performed.
pub fn fetch_with_retry(
    provider: &dyn FeedProvider,
    source: &Source,
    policy: &RetryPolicy,
    cancel: &CancelToken,
) -> FetchResult {
    let max_attempts = policy.max_attempts.max(1);
    let mut last_error = FeedError::Cancelled.to_string();

    for attempt in 1..=max_attempts {
        if cancel.is_cancelled() {
            return terminal_fail(source, FeedError::Cancelled.to_string(), attempt - 1);
        }

        match provider.pull(source) {
            Ok(payload) => {
                tracing::info!(
                    source = %source.name,
                    provider = provider.name(),
                    attempt,
                    rows = payload.row_count(),
                    "fetch succeeded"
                );
                return FetchResult {
                    source: source.name.clone(),
                    status: FetchStatus::Ok { payload },
                    attempts: attempt,
                    fetched_at: Utc::now(),
                };
            }
            Err(err) => {
                tracing::warn!(
                    source = %source.name,
                    provider = provider.name(),
                    attempt,
                    max_attempts,
                    error = %err,
                    "fetch attempt failed"
                );
                let transient = err.is_transient();
                last_error = err.to_string();
                if !transient || attempt == max_attempts {
                    return terminal_fail(source, last_error, attempt);
                }
                let delay = policy.backoff_delay(attempt, &mut rand::thread_rng());
                if !cancel.sleep(delay) {
                    return terminal_fail(source, FeedError::Cancelled.to_string(), attempt);
                }
            }
        }
    }

    terminal_fail(source, last_error, max_attempts)
}

fn terminal_fail(source: &Source, error: String, attempts: u32) -> FetchResult {
    FetchResult {
        source: source.name.clone(),
        status: FetchStatus::Fail { error },
        attempts,
        fetched_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::provider::FeedPayload;
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Millisecond-scale policy so retry tests stay fast.
    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(4),
        }
    }

    struct FlakyProvider {
        calls: AtomicU32,
        /// Number of failing pulls before the first success.
        failures_before_success: u32,
        error: fn(&Source) -> FeedError,
    }

    impl FlakyProvider {
        fn failing_forever(error: fn(&Source) -> FeedError) -> Self {
            Self {
                calls: AtomicU32::new(0),
                failures_before_success: u32::MAX,
                error,
            }
        }

        fn succeeding_after(failures: u32) -> Self {
            Self {
                calls: AtomicU32::new(0),
                failures_before_success: failures,
                error: |_| FeedError::Network("connection refused".into()),
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl FeedProvider for FlakyProvider {
        fn name(&self) -> &str {
            "flaky"
        }

        fn pull(&self, source: &Source) -> Result<FeedPayload, FeedError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures_before_success {
                Err((self.error)(source))
            } else {
                Ok(FeedPayload::default())
            }
        }
    }

    #[test]
    fn always_failing_source_uses_exactly_r_attempts() {
        for r in 1..=6 {
            let provider =
                FlakyProvider::failing_forever(|_| FeedError::Network("refused".into()));
            let source = Source::new("pinnacle", "http://feeds/pinnacle");
            let result =
                fetch_with_retry(&provider, &source, &fast_policy(r), &CancelToken::new());
            assert!(!result.is_ok());
            assert_eq!(result.attempts, r);
            assert_eq!(provider.calls(), r);
        }
    }

    #[test]
    fn last_error_is_preserved() {
        let provider = FlakyProvider::failing_forever(|s| FeedError::HttpStatus {
            source: s.name.clone(),
            status: 502,
        });
        let source = Source::new("sbo", "http://feeds/sbo");
        let result = fetch_with_retry(&provider, &source, &fast_policy(3), &CancelToken::new());
        assert_eq!(result.error(), Some("HTTP 502 from 'sbo'"));
    }

    #[test]
    fn recovers_after_transient_failures() {
        let provider = FlakyProvider::succeeding_after(2);
        let source = Source::new("betfair", "http://feeds/betfair");
        let result = fetch_with_retry(&provider, &source, &fast_policy(5), &CancelToken::new());
        assert!(result.is_ok());
        assert_eq!(result.attempts, 3);
        assert_eq!(provider.calls(), 3);
    }

    #[test]
    fn malformed_payload_fails_without_retry() {
        let provider = FlakyProvider::failing_forever(|s| FeedError::Malformed {
            source: s.name.clone(),
            reason: "not an array".into(),
        });
        let source = Source::new("isn", "http://feeds/isn");
        let result = fetch_with_retry(&provider, &source, &fast_policy(5), &CancelToken::new());
        assert!(!result.is_ok());
        assert_eq!(provider.calls(), 1);
        assert_eq!(result.attempts, 1);
    }

    #[test]
    fn pre_cancelled_token_skips_all_attempts() {
        let provider = FlakyProvider::succeeding_after(0);
        let source = Source::new("pinnacle", "http://feeds/pinnacle");
        let cancel = CancelToken::new();
        cancel.cancel();
        let result = fetch_with_retry(&provider, &source, &fast_policy(5), &cancel);
        assert!(!result.is_ok());
        assert_eq!(provider.calls(), 0);
        assert_eq!(result.error(), Some("fetch cancelled"));
    }

    proptest! {
        /// Backoff delays stay inside [base, cap] for every attempt number,
        /// and the interval's upper bound never shrinks as attempts grow.
        #[test]
        fn backoff_delay_bounded(
            attempt in 1u32..12,
            base_ms in 1u64..500,
            cap_ms in 500u64..5000,
            seed in any::<u64>(),
        ) {
            use rand::SeedableRng;
            let policy = RetryPolicy {
                max_attempts: 5,
                base_delay: Duration::from_millis(base_ms),
                max_delay: Duration::from_millis(cap_ms),
            };
            let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
            let delay = policy.backoff_delay(attempt, &mut rng);
            prop_assert!(delay >= policy.base_delay);
            prop_assert!(delay <= policy.max_delay);
        }

        /// With jitter pinned to the interval's top (seed search), the delay
        /// never shrinks as attempts grow: the interval's upper bound is
        /// monotone in the attempt number.
        #[test]
        fn backoff_upper_bound_monotone(base_ms in 1u64..200, cap_ms in 200u64..4000) {
            let upper = |attempt: u32| {
                let exp = attempt.saturating_sub(1).min(32);
                base_ms.saturating_mul(1u64 << exp).min(cap_ms).max(base_ms)
            };
            for attempt in 1u32..10 {
                prop_assert!(upper(attempt + 1) >= upper(attempt));
            }
        }
    }
}
