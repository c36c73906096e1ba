// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Retry with exponential backoff for graph store writes

use crate::storage::StorageResult;
use log::{error, warn};
use std::time::Duration;

/// How often and how patiently to retry transient failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base: Duration,
    pub max: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base: Duration::from_millis(100),
            max: Duration::from_millis(5000),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based), doubling each time up
    /// to the cap
    pub fn backoff(&self, attempt: u32) -> Duration {
        let base_ms = self.base.as_millis() as u64;
        let factor = 2u64.saturating_pow(attempt.saturating_sub(1));
        let delay_ms = base_ms.saturating_mul(factor);
        Duration::from_millis(delay_ms.min(self.max.as_millis() as u64))
    }

    /// Backoff with up to 10% random jitter, still capped
    fn jittered(&self, attempt: u32) -> Duration {
        let delay = self.backoff(attempt);
        let spread = delay.as_millis() as u64 / 10;
        let jitter = Duration::from_millis(fastrand::u64(0..=spread));
        (delay + jitter).min(self.max)
    }

    /// Run `op`, retrying transient storage errors
    pub fn run<T>(&self, what: &str, mut op: impl FnMut() -> StorageResult<T>) -> StorageResult<T> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match op() {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt <= self.max_retries => {
                    let delay = self.jittered(attempt);
                    warn!(
                        "{} failed (attempt {}/{}), retrying in {:?}: {}",
                        what,
                        attempt,
                        self.max_retries + 1,
                        delay,
                        err
                    );
                    std::thread::sleep(delay);
                }
                Err(err) => {
                    if err.is_transient() {
                        error!("{} failed after {} attempt(s): {}", what, attempt, err);
                    } else {
                        error!("{} failed: {}", what, err);
                    }
                    return Err(err);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StorageError;

    fn quick(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            base: Duration::from_millis(1),
            max: Duration::from_millis(4),
        }
    }

    #[test]
    fn backoff_doubles_up_to_the_cap() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(1), Duration::from_millis(100));
        assert_eq!(policy.backoff(2), Duration::from_millis(200));
        assert_eq!(policy.backoff(3), Duration::from_millis(400));
        assert_eq!(policy.backoff(10), Duration::from_millis(5000));
        assert_eq!(policy.backoff(100), Duration::from_millis(5000));
    }

    #[test]
    fn transient_errors_are_retried() {
        let mut calls = 0;
        let result = quick(3).run("merge", || {
            calls += 1;
            if calls < 3 {
                Err(StorageError::Unavailable("lock conflict".into()))
            } else {
                Ok(calls)
            }
        });
        assert_eq!(result.unwrap(), 3);
    }

    #[test]
    fn retries_are_bounded() {
        let mut calls = 0;
        let result: StorageResult<()> = quick(2).run("merge", || {
            calls += 1;
            Err(StorageError::Unavailable("down".into()))
        });
        assert!(result.is_err());
        assert_eq!(calls, 3);
    }

    #[test]
    fn permanent_errors_are_not_retried() {
        let mut calls = 0;
        let result: StorageResult<()> = quick(5).run("merge", || {
            calls += 1;
            Err(StorageError::Rejected("bad key".into()))
        });
        assert!(result.is_err());
        assert_eq!(calls, 1);
    }
}
