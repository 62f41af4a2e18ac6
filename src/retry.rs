//! Retry bookkeeping for a single logical call.
//!
//! A call may be attempted at most `retries + 1` times, and all attempts
//! together, including the waits between them, must fit inside the call's
//! timeout. [`RetryBudget`] tracks both limits.

use crate::{Error, Result};
use std::time::Duration;
use tokio::time::Instant;

/// Stand-in deadline for timeouts too large to add to the current instant.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Whole seconds in `duration`, rounded up.
pub(crate) fn ceil_secs(duration: Duration) -> u64 {
    let secs = duration.as_secs();
    if duration.subsec_nanos() > 0 {
        secs.saturating_add(1)
    } else {
        secs
    }
}

/// Attempt counter and wall-clock deadline of one call.
///
/// Uses [`tokio::time::Instant`] so that paused-clock tests see consistent time.
///
/// # Examples
///
/// ```
/// use shipengine::retry::RetryBudget;
/// use std::time::Duration;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let mut budget = RetryBudget::new(2, Duration::from_secs(10));
/// assert_eq!(budget.attempt(), 0);
/// assert!(budget.can_retry());
///
/// let wait = budget.schedule_retry(Duration::from_secs(5), None).unwrap();
/// assert_eq!(wait, Duration::from_secs(5));
/// assert_eq!(budget.attempt(), 1);
///
/// // 60 seconds cannot fit in what is left of the 10 second budget.
/// assert!(budget.schedule_retry(Duration::from_secs(60), None).is_err());
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct RetryBudget {
    attempt: u32,
    retries: u32,
    timeout: Duration,
    started: Instant,
    deadline: Instant,
}

impl RetryBudget {
    /// Starts the clock on a call that may retry `retries` times within `timeout`.
    pub fn new(retries: u32, timeout: Duration) -> Self {
        let started = Instant::now();
        Self {
            attempt: 0,
            retries,
            timeout,
            started,
            deadline: started
                .checked_add(timeout)
                .unwrap_or_else(|| started + FAR_FUTURE),
        }
    }

    /// The zero-based number of the current attempt.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// The configured timeout of the whole call.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns `true` while retries remain.
    pub fn can_retry(&self) -> bool {
        self.attempt < self.retries
    }

    /// Time left before the deadline.
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    /// Returns `true` once the deadline has passed.
    pub fn is_exhausted(&self) -> bool {
        self.remaining().is_zero()
    }

    /// Time since the call started.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// The error to raise when the budget runs out. A sub-second remainder
    /// of the timeout counts as a full second.
    pub fn timeout_error(&self, request_id: Option<String>) -> Error {
        Error::client_timeout(ceil_secs(self.timeout), request_id)
    }

    /// Consumes one retry that will start after `wait`.
    ///
    /// Returns the wait on success; the caller sleeps for it and then
    /// attempts again.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ClientTimeout`] if waiting would leave no time for the
    /// next attempt. The retry is not consumed in that case.
    pub fn schedule_retry(&mut self, wait: Duration, request_id: Option<String>) -> Result<Duration> {
        if wait >= self.remaining() {
            return Err(self.timeout_error(request_id));
        }
        self.attempt += 1;
        Ok(wait)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_attempts_are_bounded_by_retries() {
        let mut budget = RetryBudget::new(2, Duration::from_secs(30));

        assert!(budget.can_retry());
        budget.schedule_retry(Duration::ZERO, None).unwrap();
        assert!(budget.can_retry());
        budget.schedule_retry(Duration::ZERO, None).unwrap();
        assert!(!budget.can_retry());
        assert_eq!(budget.attempt(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_retries_never_retries() {
        let budget = RetryBudget::new(0, Duration::from_secs(30));
        assert!(!budget.can_retry());
    }

    #[tokio::test(start_paused = true)]
    async fn test_remaining_shrinks_with_time() {
        let budget = RetryBudget::new(1, Duration::from_secs(10));
        assert_eq!(budget.remaining(), Duration::from_secs(10));

        tokio::time::advance(Duration::from_secs(4)).await;
        assert_eq!(budget.remaining(), Duration::from_secs(6));
        assert_eq!(budget.elapsed(), Duration::from_secs(4));

        tokio::time::advance(Duration::from_secs(7)).await;
        assert!(budget.is_exhausted());
        assert_eq!(budget.remaining(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_past_deadline_is_client_timeout() {
        let mut budget = RetryBudget::new(3, Duration::from_secs(10));
        tokio::time::advance(Duration::from_secs(6)).await;

        let err = budget
            .schedule_retry(Duration::from_secs(5), Some("req_7".to_string()))
            .unwrap_err();
        assert!(matches!(err, Error::ClientTimeout { retry_after: 10, .. }));
        assert_eq!(err.request_id(), Some("req_7"));
        assert_eq!(budget.attempt(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_timeout_is_exhausted_immediately() {
        let mut budget = RetryBudget::new(1, Duration::ZERO);
        assert!(budget.is_exhausted());
        assert!(budget.schedule_retry(Duration::ZERO, None).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_huge_timeout_does_not_overflow_deadline() {
        let mut budget = RetryBudget::new(1, Duration::MAX);
        assert!(!budget.is_exhausted());
        assert!(budget.remaining() >= FAR_FUTURE - Duration::from_secs(1));
        assert_eq!(
            budget.schedule_retry(Duration::from_secs(60), None).unwrap(),
            Duration::from_secs(60)
        );
        assert_eq!(budget.timeout_error(None).retry_after(), Some(u64::MAX));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sub_second_timeout_reports_whole_seconds() {
        let budget = RetryBudget::new(0, Duration::from_millis(500));
        assert_eq!(budget.timeout_error(None).retry_after(), Some(1));

        let budget = RetryBudget::new(0, Duration::from_millis(2500));
        assert_eq!(budget.timeout_error(None).retry_after(), Some(3));
    }

    #[test]
    fn test_ceil_secs() {
        assert_eq!(ceil_secs(Duration::ZERO), 0);
        assert_eq!(ceil_secs(Duration::from_secs(4)), 4);
        assert_eq!(ceil_secs(Duration::from_millis(4001)), 5);
        assert_eq!(ceil_secs(Duration::MAX), u64::MAX);
    }
}
