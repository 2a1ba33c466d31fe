use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::trace;

/// Spaces provider calls so that consecutive calls start at least
/// `min_interval` apart. One pacer is shared (behind an `Arc`) by every
/// worker in a batch, so the spacing holds across workers.
pub struct CallPacer {
    min_interval: Duration,
    /// `None` when the interval is zero
    limiter: Option<DefaultDirectRateLimiter>,
    total_calls: AtomicU64,
    total_wait_ms: AtomicU64,
}

impl CallPacer {
    pub fn new(min_interval: Duration) -> Self {
        // with_period allows a burst of one cell
        let limiter = Quota::with_period(min_interval).map(RateLimiter::direct);
        Self {
            min_interval,
            limiter,
            total_calls: AtomicU64::new(0),
            total_wait_ms: AtomicU64::new(0),
        }
    }

    /// No spacing at all; used by tests
    pub fn unpaced() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Waits for this caller's slot.
    pub async fn wait(&self) {
        let started = Instant::now();
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }

        let waited = started.elapsed();
        if !waited.is_zero() {
            trace!(wait_ms = waited.as_millis() as u64, "Paced provider call");
        }
        self.total_calls.fetch_add(1, Ordering::Relaxed);
        self.total_wait_ms
            .fetch_add(waited.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn total_calls(&self) -> u64 {
        self.total_calls.load(Ordering::Relaxed)
    }

    pub fn total_wait(&self) -> Duration {
        Duration::from_millis(self.total_wait_ms.load(Ordering::Relaxed))
    }
}

impl fmt::Debug for CallPacer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallPacer")
            .field("min_interval", &self.min_interval)
            .field("paced", &self.limiter.is_some())
            .field("total_calls", &self.total_calls())
            .finish()
    }
}
