//! Backoff schedule and per-retry delay computation.

use super::classify::Classification;
use super::scope::ScopeKind;
use crate::config::ConfigError;
use std::time::Duration;

/// Upper bound applied to a server-provided `Retry-After` hint.
pub const MAX_RETRY_AFTER: Duration = Duration::from_secs(20);

/// Ordered wait durations indexed by retry number within a scope.
///
/// Indexes past the end reuse the last entry. The schedule length is also the
/// inner (general-transient) retry budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackoffSchedule(Vec<Duration>);

impl Default for BackoffSchedule {
    /// 4s, 8s, 16s.
    fn default() -> Self {
        Self(vec![
            Duration::from_secs(4),
            Duration::from_secs(8),
            Duration::from_secs(16),
        ])
    }
}

impl BackoffSchedule {
    pub fn new(delays: Vec<Duration>) -> Result<Self, ConfigError> {
        if delays.is_empty() {
            return Err(ConfigError::EmptySchedule);
        }
        Ok(Self(delays))
    }

    /// Number of entries (never zero).
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Delay for the retry at `index`, clamped to the last entry.
    pub fn delay_at(&self, index: usize) -> Duration {
        let last = self.0.len().saturating_sub(1);
        self.0.get(index.min(last)).copied().unwrap_or_default()
    }

    pub fn delays(&self) -> &[Duration] {
        &self.0
    }
}

/// Compute the wait before the next retry.
///
/// `index` is the number of retries already spent in `scope` (0 for the first).
/// A `Retry-After` hint on a 429 wins over the schedule, capped at
/// [`MAX_RETRY_AFTER`].
pub fn next_delay(
    schedule: &BackoffSchedule,
    scope: ScopeKind,
    index: usize,
    classification: &Classification,
) -> Duration {
    match (scope, classification) {
        (
            ScopeKind::TooManyRequests,
            Classification::TooManyRequests {
                retry_after: Some(hint),
            },
        ) => (*hint).min(MAX_RETRY_AFTER),
        _ => schedule.delay_at(index),
    }
}
