//! Per-provider request pacing with a bounded throttle retry
//!
//! Every provider gets its own [`RateLimiter`]. Callers queue on the limiter
//! and are released one at a time once the minimum interval since the
//! previous dispatch has elapsed. A throttling answer from the provider is
//! retried exactly as often as the [`ThrottleRetryPolicy`] allows.

use std::future::Future;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, warn};

use crate::ports::ProviderError;

/// Default minimum delay between two requests to the same provider
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_millis(500);

/// Default fixed delay before retrying a throttled request
pub const DEFAULT_THROTTLE_BACKOFF: Duration = Duration::from_secs(2);

/// Bounded retry behaviour for throttled requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrottleRetryPolicy {
    /// Retries after the first throttled attempt
    pub max_retries: u32,
    /// Fixed wait before each retry
    pub backoff: Duration,
}

impl Default for ThrottleRetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 1,
            backoff: DEFAULT_THROTTLE_BACKOFF,
        }
    }
}

impl ThrottleRetryPolicy {
    /// One retry after `backoff`
    #[must_use]
    pub const fn single(backoff: Duration) -> Self {
        Self {
            max_retries: 1,
            backoff,
        }
    }

    /// Never retry
    #[must_use]
    pub const fn none() -> Self {
        Self {
            max_retries: 0,
            backoff: Duration::ZERO,
        }
    }
}

/// Serialized request queue for one provider
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    retry: ThrottleRetryPolicy,
    last_dispatch: Mutex<Option<Instant>>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_INTERVAL, ThrottleRetryPolicy::default())
    }
}

impl RateLimiter {
    /// Create a limiter
    #[must_use]
    pub fn new(min_interval: Duration, retry: ThrottleRetryPolicy) -> Self {
        Self {
            min_interval,
            retry,
            last_dispatch: Mutex::new(None),
        }
    }

    /// Limiter that never waits and never retries
    #[must_use]
    pub fn unlimited() -> Self {
        Self::new(Duration::ZERO, ThrottleRetryPolicy::none())
    }

    /// Minimum spacing between dispatches
    #[must_use]
    pub const fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Retry policy applied by [`Self::dispatch`]
    #[must_use]
    pub const fn retry_policy(&self) -> ThrottleRetryPolicy {
        self.retry
    }

    /// Wait for this caller's dispatch slot
    ///
    /// Waiters are released in arrival order, each at least `min_interval`
    /// after the previous one.
    #[allow(clippy::cast_possible_truncation)]
    pub async fn acquire(&self) {
        let mut last = self.last_dispatch.lock().await;
        if let Some(previous) = *last {
            let ready_at = previous + self.min_interval;
            if ready_at > Instant::now() {
                debug!(wait_ms = (ready_at - Instant::now()).as_millis() as u64, "Pacing request");
                sleep_until(ready_at).await;
            }
        }
        *last = Some(Instant::now());
    }

    /// Run `operation` in a paced slot, retrying throttled attempts per policy
    ///
    /// Every attempt (including retries) waits for its own slot. A throttle
    /// signal after the retries are used up is returned to the caller.
    #[allow(clippy::cast_possible_truncation)]
    pub async fn dispatch<F, Fut, T>(&self, mut operation: F) -> Result<T, ProviderError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let mut retries = 0u32;
        loop {
            self.acquire().await;
            match operation().await {
                Err(err) if err.is_throttle() && retries < self.retry.max_retries => {
                    retries += 1;
                    warn!(
                        retry = retries,
                        backoff_ms = self.retry.backoff.as_millis() as u64,
                        "Provider throttled request, backing off"
                    );
                    tokio::time::sleep(self.retry.backoff).await;
                },
                Err(err) if err.is_throttle() => {
                    warn!(retries, "Provider still throttling, giving up");
                    return Err(err);
                },
                result => return result,
            }
        }
    }
}
