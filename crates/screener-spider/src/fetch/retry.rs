use crate::error::FetchError;
use std::time::Duration;

/// Bounded retry with exponential backoff.
///
/// `max_attempts` counts every request made for one ticker, the first one included. The wait
/// before retry `n` (1-based) is `initial_backoff * multiplier^(n-1)`, capped at `max_backoff`.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub multiplier: f64,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_secs(2),
            multiplier: 2.0,
            max_backoff: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Whether another attempt should follow `err`, after `failed_attempts` failures so far.
    pub fn should_retry(&self, err: &FetchError, failed_attempts: u32) -> bool {
        err.is_transient() && failed_attempts < self.max_attempts
    }

    /// The wait before the next attempt, after `failed_attempts` failures so far.
    pub fn backoff(&self, failed_attempts: u32) -> Duration {
        let exponent = failed_attempts.saturating_sub(1).min(i32::MAX as u32) as i32;
        let secs = self.initial_backoff.as_secs_f64() * self.multiplier.powi(exponent);
        Duration::try_from_secs_f64(secs)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transient() -> FetchError {
        FetchError::Transient {
            ticker: "AAPL".to_string(),
            reason: "status(503)".to_string(),
        }
    }

    #[test]
    fn backoff_doubles_until_the_cap() {
        let policy = RetryPolicy {
            max_attempts: 10,
            initial_backoff: Duration::from_secs(2),
            multiplier: 2.0,
            max_backoff: Duration::from_secs(10),
        };
        assert_eq!(policy.backoff(1), Duration::from_secs(2));
        assert_eq!(policy.backoff(2), Duration::from_secs(4));
        assert_eq!(policy.backoff(3), Duration::from_secs(8));
        assert_eq!(policy.backoff(4), Duration::from_secs(10));
        assert_eq!(policy.backoff(60), Duration::from_secs(10));
    }

    #[test]
    fn transient_errors_retry_until_attempts_run_out() {
        let policy = RetryPolicy::default();
        assert!(policy.should_retry(&transient(), 1));
        assert!(policy.should_retry(&transient(), 2));
        assert!(!policy.should_retry(&transient(), 3));
    }

    #[test]
    fn permanent_errors_never_retry() {
        let policy = RetryPolicy::default();
        let err = FetchError::Permanent {
            ticker: "NOPE".to_string(),
            status: 404,
        };
        assert!(!policy.should_retry(&err, 1));
    }
}
