//! Retry policy for queued check tasks
//!
//! A pure value object: given the age of a task and how many attempts it has
//! already had, it decides whether and when the next attempt happens. The
//! task queue owns one policy and consults it after every failed delivery.

use std::time::Duration;

use crate::config::SchedulerConfig;

/// Backoff and age limit for redelivered tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total age of a task, counted from first enqueue
    pub age_limit: Duration,
    /// Minimum delay between successive attempts
    pub min_backoff: Duration,
    /// Maximum delay between successive attempts
    pub max_backoff: Duration,
    /// Number of times the delay doubles before it stops growing
    pub max_doublings: u32,
}

impl RetryPolicy {
    /// Create a policy with a constant backoff
    pub fn new(age_limit: Duration, min_backoff: Duration) -> Self {
        Self {
            age_limit,
            min_backoff,
            max_backoff: min_backoff,
            max_doublings: 0,
        }
    }

    /// Create a policy from scheduler configuration
    pub fn from_config(config: &SchedulerConfig) -> Self {
        Self {
            age_limit: config.age_limit(),
            min_backoff: config.min_backoff(),
            max_backoff: config.max_backoff(),
            max_doublings: config.max_doublings,
        }
    }

    /// Let the delay grow exponentially up to `max_backoff`
    pub fn with_exponential(mut self, max_backoff: Duration, max_doublings: u32) -> Self {
        self.max_backoff = max_backoff.max(self.min_backoff);
        self.max_doublings = max_doublings;
        self
    }

    /// Delay before retry number `retry_count` (1 for the first retry)
    ///
    /// Never below `min_backoff`, never above `max_backoff`.
    pub fn backoff(&self, retry_count: u32) -> Duration {
        let doublings = retry_count.saturating_sub(1).min(self.max_doublings);
        let factor = 1u32.checked_shl(doublings).unwrap_or(u32::MAX);

        self.min_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
            .max(self.min_backoff)
    }

    /// Delay before the next attempt, or `None` once the task has expired
    ///
    /// A retry that would start after the age limit is not scheduled.
    ///
    /// # Parameters
    ///
    /// - `age`: time elapsed since first enqueue
    /// - `retry_count`: number of the retry about to be scheduled
    pub fn next_attempt(&self, age: Duration, retry_count: u32) -> Option<Duration> {
        let delay = self.backoff(retry_count);
        if age.saturating_add(delay) > self.age_limit {
            None
        } else {
            Some(delay)
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&SchedulerConfig::default())
    }
}
