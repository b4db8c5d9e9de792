use governor::clock::{Clock, DefaultClock};
use governor::middleware::NoOpMiddleware;
use governor::state::{InMemoryState, NotKeyed};
use governor::Quota;
use std::fmt;
use std::num::NonZeroU32;
use std::time::Duration;
use tracing::trace;

type Direct<C = DefaultClock> =
    governor::RateLimiter<NotKeyed, InMemoryState, C, NoOpMiddleware<<C as Clock>::Instant>>;

/// One request per `delay`, no burst: a slot frees up `delay` after the previous slot was
/// claimed, so consecutive request *starts* are at least `delay` apart. `None` for no delay.
pub(crate) fn quota(delay: Duration) -> Option<Quota> {
    Quota::with_period(delay).map(|quota| quota.allow_burst(NonZeroU32::MIN))
}

/// Spaces quote page requests. Owned by the fetcher and never shared.
///
/// A slow response eats into the wait instead of adding to it, because the gap is measured
/// from the start of the previous request.
pub struct RateLimiter {
    delay: Duration,
    limiter: Option<Direct>,
}

impl RateLimiter {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            limiter: quota(delay).map(Direct::direct),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Wait for the next request slot and claim it.
    ///
    /// Dropping the future while it waits claims nothing.
    pub async fn acquire(&self) {
        let Some(limiter) = &self.limiter else {
            return;
        };
        if limiter.check().is_err() {
            trace!("rate limiter waiting for the next slot");
            limiter.until_ready().await;
        }
    }
}

impl fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimiter")
            .field("delay", &self.delay)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use governor::clock::FakeRelativeClock;

    fn fake(delay: Duration) -> (Direct<FakeRelativeClock>, FakeRelativeClock) {
        let clock = FakeRelativeClock::default();
        let limiter = Direct::direct_with_clock(quota(delay).unwrap(), &clock);
        (limiter, clock)
    }

    #[test]
    fn first_request_is_not_delayed() {
        let (limiter, _clock) = fake(Duration::from_secs(5));
        assert!(limiter.check().is_ok());
    }

    #[test]
    fn consecutive_starts_are_at_least_the_delay_apart() {
        let delay = Duration::from_millis(2_500);
        let (limiter, clock) = fake(delay);

        assert!(limiter.check().is_ok());
        for _ in 0..3 {
            clock.advance(delay - Duration::from_millis(1));
            assert!(limiter.check().is_err());
            clock.advance(Duration::from_millis(1));
            assert!(limiter.check().is_ok());
        }
    }

    #[test]
    fn waiting_time_is_the_remainder_of_the_delay() {
        let delay = Duration::from_secs(2);
        let (limiter, clock) = fake(delay);

        assert!(limiter.check().is_ok());
        clock.advance(Duration::from_millis(500));
        let not_until = limiter.check().unwrap_err();
        assert_eq!(not_until.wait_time_from(clock.now()), Duration::from_millis(1_500));
    }

    #[test]
    fn slow_requests_do_not_widen_the_gap() {
        let delay = Duration::from_secs(2);
        let (limiter, clock) = fake(delay);

        assert!(limiter.check().is_ok());
        // a response that takes longer than the delay
        clock.advance(Duration::from_secs(3));
        assert!(limiter.check().is_ok());
        // the next slot is measured from that second start, with no credit saved up
        clock.advance(Duration::from_millis(1_999));
        assert!(limiter.check().is_err());
    }

    #[test]
    fn zero_delay_never_waits() {
        assert!(quota(Duration::ZERO).is_none());
    }

    #[tokio::test]
    async fn acquire_spaces_real_requests() {
        let delay = Duration::from_millis(50);
        let limiter = RateLimiter::new(delay);

        let first = std::time::Instant::now();
        limiter.acquire().await;
        limiter.acquire().await;
        limiter.acquire().await;
        // governor keeps its own clock; allow for a little skew against std's
        assert!(first.elapsed() >= delay * 2 - Duration::from_millis(5));
    }
}
