//! Connection retry policy
//!
//! Connection establishment against the relational source is retried over a
//! small fixed budget with a linearly increasing delay. The policy itself is
//! a pure value so it can be tested without any I/O; the loop that applies
//! it lives in [`crate::db::connect_with_retry`].

use std::time::Duration;

/// Linear-backoff retry policy for connection establishment.
///
/// Attempt `n` (1-based) that fails is followed by a sleep of `n * step`
/// while attempts remain: with the default 3 attempts and a 2 second step
/// the delays are 2s and 4s. Query execution is never retried; only
/// connection establishment goes through this policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub step: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, step: Duration) -> Self {
        Self { max_attempts, step }
    }

    /// Delay to sleep after the given failed attempt (1-based), or `None`
    /// when the budget is exhausted and the failure is terminal.
    pub fn next_delay(&self, failed_attempt: u32) -> Option<Duration> {
        if failed_attempt >= self.max_attempts {
            None
        } else {
            Some(self.step * failed_attempt)
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            step: Duration::from_secs(2),
        }
    }
}
