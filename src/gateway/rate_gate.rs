//! Global minimum-interval gate in front of all upstream calls
//!
//! Built on a governor GCRA limiter with a burst of one, so at most one
//! dispatch passes per period. A rejected check leaves the limiter state
//! untouched.

use governor::clock::{Clock, DefaultClock};
use governor::middleware::NoOpMiddleware;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use std::num::NonZeroU32;
use std::time::Duration;

type DirectLimiter<C> =
    RateLimiter<NotKeyed, InMemoryState, C, NoOpMiddleware<<C as Clock>::Instant>>;

/// Result of an admission check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admitted,
    Rejected { retry_after: Duration },
}

/// A single global token: at most one dispatch passes per `min_interval`,
/// regardless of credential or caller.
pub struct RateGate<C: Clock = DefaultClock> {
    min_interval: Duration,
    clock: C,
    // None when the interval is zero
    limiter: Option<DirectLimiter<C>>,
}

impl RateGate<DefaultClock> {
    pub fn new(min_interval: Duration) -> Self {
        Self::with_clock(min_interval, DefaultClock::default())
    }
}

impl<C: Clock> RateGate<C> {
    /// Gate driven by an explicit clock
    pub fn with_clock(min_interval: Duration, clock: C) -> Self {
        let limiter = Quota::with_period(min_interval).map(|quota| {
            RateLimiter::direct_with_clock(quota.allow_burst(NonZeroU32::MIN), &clock)
        });

        Self {
            min_interval,
            clock,
            limiter,
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    pub fn admit(&self) -> Admission {
        let Some(limiter) = &self.limiter else {
            return Admission::Admitted;
        };

        match limiter.check() {
            Ok(()) => Admission::Admitted,
            Err(not_until) => Admission::Rejected {
                retry_after: not_until.wait_time_from(self.clock.now()),
            },
        }
    }
}

impl<C: Clock> std::fmt::Debug for RateGate<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateGate")
            .field("min_interval", &self.min_interval)
            .finish()
    }
}
