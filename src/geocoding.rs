//! Geocoding retry boundary.
//!
//! Backends return `Result` and may fail transiently. [`RetryingGeocoder`]
//! wraps one in a [`RetryPolicy`] and exposes the never-failing
//! [`GeocodeProvider`] the assembler consumes.

use async_trait::async_trait;
use backon::{ConstantBuilder, Retryable};
use metrics::counter;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use crate::app::ports::{GeocodeProvider, ReverseAddress, StructuredPlace};
use crate::constants::{GEOCODE_MAX_ATTEMPTS, GEOCODE_RETRY_DELAY_MS};
use crate::error::GeocodeError;
use crate::types::Coordinates;

pub type GeocodeResult<T> = std::result::Result<Option<T>, GeocodeError>;

/// Raw geocoding transport. `Ok(None)` means the service answered with no match.
#[async_trait]
pub trait GeocodeBackend: Send + Sync {
    async fn forward(&self, text: &str) -> GeocodeResult<Coordinates>;
    async fn reverse(&self, coordinates: Coordinates) -> GeocodeResult<ReverseAddress>;
    async fn structured_lookup(&self, text: &str) -> GeocodeResult<StructuredPlace>;
}

/// How many times to try a geocoding call and how long to wait in between.
#[derive(Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts including the first
    pub max_attempts: usize,
    pub fixed_delay: Duration,
    /// Only errors this accepts are retried
    pub retryable: fn(&GeocodeError) -> bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: GEOCODE_MAX_ATTEMPTS,
            fixed_delay: Duration::from_millis(GEOCODE_RETRY_DELAY_MS),
            retryable: GeocodeError::is_unavailable,
        }
    }
}

impl std::fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("fixed_delay", &self.fixed_delay)
            .finish_non_exhaustive()
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: usize, fixed_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            fixed_delay,
            ..Self::default()
        }
    }

    /// Run `call` under this policy. Exhausted retries and non-retryable errors become `None`.
    pub async fn run<T, F, Fut>(&self, operation: &'static str, mut call: F) -> Option<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = GeocodeResult<T>>,
    {
        let retryable = self.retryable;
        let backoff = ConstantBuilder::default()
            .with_delay(self.fixed_delay)
            .with_max_times(self.max_attempts.saturating_sub(1));

        let attempt = || {
            counter!("geocode_attempts_total", "operation" => operation).increment(1);
            call()
        };

        let outcome = attempt
            .retry(backoff)
            .when(move |e: &GeocodeError| retryable(e))
            .notify(|e: &GeocodeError, delay: Duration| {
                warn!(
                    operation,
                    "Geocoding failed, retrying after {:.2}s: {}",
                    delay.as_secs_f64(),
                    e
                );
            })
            .await;

        match outcome {
            Ok(value) => value,
            Err(e) => {
                counter!("geocode_failures_total", "operation" => operation).increment(1);
                warn!(operation, error = %e, "Giving up on geocoding call");
                None
            }
        }
    }
}

/// A [`GeocodeProvider`] that retries a backend under a [`RetryPolicy`].
pub struct RetryingGeocoder<B> {
    backend: B,
    policy: RetryPolicy,
}

impl<B: GeocodeBackend> RetryingGeocoder<B> {
    pub fn new(backend: B, policy: RetryPolicy) -> Self {
        Self { backend, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }
}

#[async_trait]
impl<B: GeocodeBackend> GeocodeProvider for RetryingGeocoder<B> {
    async fn forward(&self, text: &str) -> Option<Coordinates> {
        let result = self.policy.run("forward", || self.backend.forward(text)).await;
        debug!(text, found = result.is_some(), "forward geocode");
        result
    }

    async fn reverse(&self, coordinates: Coordinates) -> Option<ReverseAddress> {
        self.policy
            .run("reverse", || self.backend.reverse(coordinates))
            .await
    }

    async fn structured_lookup(&self, text: &str) -> Option<StructuredPlace> {
        self.policy
            .run("structured_lookup", || self.backend.structured_lookup(text))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Fails with `error` for the first `failures` calls, then answers with `coords`.
    struct ScriptedBackend {
        failures: usize,
        error: GeocodeError,
        coords: Option<Coordinates>,
        calls: AtomicUsize,
    }

    impl ScriptedBackend {
        fn new(failures: usize, error: GeocodeError, coords: Option<Coordinates>) -> Self {
            Self {
                failures,
                error,
                coords,
                calls: AtomicUsize::new(0),
            }
        }

        fn next(&self) -> GeocodeResult<Coordinates> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                Err(self.error.clone())
            } else {
                Ok(self.coords)
            }
        }
    }

    #[async_trait]
    impl GeocodeBackend for ScriptedBackend {
        async fn forward(&self, _text: &str) -> GeocodeResult<Coordinates> {
            self.next()
        }

        async fn reverse(&self, _coordinates: Coordinates) -> GeocodeResult<ReverseAddress> {
            self.next().map(|_| None)
        }

        async fn structured_lookup(&self, _text: &str) -> GeocodeResult<StructuredPlace> {
            self.next().map(|_| None)
        }
    }

    fn quick_policy() -> RetryPolicy {
        RetryPolicy::new(3, Duration::ZERO)
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let backend = ScriptedBackend::new(
            usize::MAX,
            GeocodeError::Unavailable("503".into()),
            None,
        );
        let geocoder = RetryingGeocoder::new(backend, quick_policy());

        assert_eq!(geocoder.forward("123 Main St").await, None);
        assert_eq!(geocoder.backend.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_recovers_after_transient_failure() {
        let coords = Coordinates::new(45.5, -73.6);
        let backend = ScriptedBackend::new(
            2,
            GeocodeError::Unavailable("timeout".into()),
            Some(coords),
        );
        let geocoder = RetryingGeocoder::new(backend, quick_policy());

        assert_eq!(geocoder.forward("123 Main St").await, Some(coords));
        assert_eq!(geocoder.backend.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_waits_between_attempts() {
        let backend = ScriptedBackend::new(
            usize::MAX,
            GeocodeError::Unavailable("503".into()),
            None,
        );
        let geocoder = RetryingGeocoder::new(backend, RetryPolicy::new(3, Duration::from_millis(50)));

        let started = std::time::Instant::now();
        assert_eq!(geocoder.forward("123 Main St").await, None);

        // two pauses between three attempts
        assert!(started.elapsed() >= Duration::from_millis(100));
        assert_eq!(geocoder.backend.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_failure_is_not_retried() {
        let backend = ScriptedBackend::new(
            usize::MAX,
            GeocodeError::Malformed("not json".into()),
            None,
        );
        let geocoder = RetryingGeocoder::new(backend, quick_policy());

        assert_eq!(geocoder.forward("123 Main St").await, None);
        assert_eq!(geocoder.backend.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_custom_retry_predicate() {
        fn retry_everything(_: &GeocodeError) -> bool {
            true
        }
        let policy = RetryPolicy {
            retryable: retry_everything,
            ..quick_policy()
        };
        let backend = ScriptedBackend::new(
            usize::MAX,
            GeocodeError::Rejected("400".into()),
            None,
        );
        let geocoder = RetryingGeocoder::new(backend, policy);

        assert_eq!(geocoder.structured_lookup("x").await, None);
        assert_eq!(geocoder.backend.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.fixed_delay, Duration::from_secs(2));
        assert!((policy.retryable)(&GeocodeError::Unavailable("x".into())));
        assert!(!(policy.retryable)(&GeocodeError::Rejected("x".into())));
    }
}
