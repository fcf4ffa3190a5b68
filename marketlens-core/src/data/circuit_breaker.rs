//! Circuit breaker for upstream rate limiting and IP bans.
//!
//! When a provider returns HTTP 403 (IP ban) or keeps failing, the breaker
//! trips and refuses all subsequent requests for a cooldown period (default
//! 30 minutes). Open breakers close again lazily on the next check.

use crate::cache::{Clock, SystemClock};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::warn;

/// State of the circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    /// Normal operation — requests are allowed.
    Closed,
    /// Tripped — all requests are refused until cooldown expires.
    Open { tripped_at: Instant },
}

#[derive(Debug)]
struct Inner {
    state: BreakerState,
    consecutive_failures: u32,
}

/// Circuit breaker shared by every request to one upstream.
#[derive(Debug)]
pub struct CircuitBreaker {
    inner: Mutex<Inner>,
    cooldown: Duration,
    failure_threshold: u32,
    clock: Arc<dyn Clock>,
}

impl CircuitBreaker {
    pub fn new(cooldown: Duration) -> Self {
        Self::with_clock(cooldown, Arc::new(SystemClock))
    }

    pub fn with_clock(cooldown: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: BreakerState::Closed,
                consecutive_failures: 0,
            }),
            cooldown,
            failure_threshold: 3,
            clock,
        }
    }

    /// 30-minute cooldown, trips after 3 consecutive failures.
    pub fn default_provider() -> Self {
        Self::new(Duration::from_secs(30 * 60))
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Check if requests are currently allowed.
    pub fn is_allowed(&self) -> bool {
        let mut inner = self.lock();
        match inner.state {
            BreakerState::Closed => true,
            BreakerState::Open { tripped_at } => {
                if self.clock.now().duration_since(tripped_at) >= self.cooldown {
                    inner.state = BreakerState::Closed;
                    inner.consecutive_failures = 0;
                    true
                } else {
                    false
                }
            }
        }
    }

    pub fn record_success(&self) {
        self.lock().consecutive_failures = 0;
    }

    /// Record a failure; trips once the threshold is reached.
    pub fn record_failure(&self) {
        let mut inner = self.lock();
        inner.consecutive_failures += 1;
        if inner.consecutive_failures >= self.failure_threshold
            && inner.state == BreakerState::Closed
        {
            warn!(
                failures = inner.consecutive_failures,
                "circuit breaker tripped after consecutive failures"
            );
            inner.state = BreakerState::Open {
                tripped_at: self.clock.now(),
            };
        }
    }

    /// Immediately trip the breaker (403 Forbidden / IP ban).
    pub fn trip(&self) {
        warn!("circuit breaker tripped");
        self.lock().state = BreakerState::Open {
            tripped_at: self.clock.now(),
        };
    }

    /// Remaining cooldown time (zero if not tripped).
    pub fn remaining_cooldown(&self) -> Duration {
        match self.lock().state {
            BreakerState::Closed => Duration::ZERO,
            BreakerState::Open { tripped_at } => self
                .cooldown
                .saturating_sub(self.clock.now().duration_since(tripped_at)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ManualClock;

    fn breaker() -> (CircuitBreaker, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        (
            CircuitBreaker::with_clock(Duration::from_secs(60), clock.clone()),
            clock,
        )
    }

    #[test]
    fn trips_after_threshold_failures() {
        let (cb, _) = breaker();
        assert!(cb.is_allowed());
        cb.record_failure();
        cb.record_failure();
        assert!(cb.is_allowed());
        cb.record_failure();
        assert!(!cb.is_allowed());
    }

    #[test]
    fn success_resets_counter() {
        let (cb, _) = breaker();
        cb.record_failure();
        cb.record_failure();
        cb.record_success();
        cb.record_failure();
        assert!(cb.is_allowed());
    }

    #[test]
    fn closes_after_cooldown() {
        let (cb, clock) = breaker();
        cb.trip();
        assert!(!cb.is_allowed());
        clock.advance(Duration::from_secs(30));
        assert_eq!(cb.remaining_cooldown(), Duration::from_secs(30));
        assert!(!cb.is_allowed());
        clock.advance(Duration::from_secs(30));
        assert!(cb.is_allowed());
        assert_eq!(cb.remaining_cooldown(), Duration::ZERO);
    }
}
