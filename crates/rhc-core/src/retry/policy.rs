use super::backoff::BackoffSchedule;
use crate::http::Method;
use std::time::Duration;

/// Retry budget of the outer (429) scope. Not configurable.
pub const OUTER_MAX_RETRIES: usize = 15;

/// Immutable retry settings shared by every call that uses them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Delays between retries; its length is the inner retry budget.
    pub schedule: BackoffSchedule,
    /// Per-attempt timeout. Only the Get policy sets it; expiry is a
    /// retryable `RetryTimeout`.
    pub retry_timeout: Option<Duration>,
    /// Optional deadline for the whole call (all attempts and waits).
    /// Expiry fails the call without retry.
    pub call_timeout: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::default_policy()
    }
}

impl RetryPolicy {
    /// Policy for non-idempotent verbs: no per-attempt timeout.
    pub fn default_policy() -> Self {
        Self {
            schedule: BackoffSchedule::default(),
            retry_timeout: None,
            call_timeout: None,
        }
    }

    /// Policy for idempotent verbs: races each attempt against `retry_timeout`.
    pub fn get_policy(retry_timeout: Duration) -> Self {
        Self {
            retry_timeout: Some(retry_timeout),
            ..Self::default_policy()
        }
    }

    pub fn with_schedule(mut self, schedule: BackoffSchedule) -> Self {
        self.schedule = schedule;
        self
    }

    pub fn with_call_timeout(mut self, call_timeout: Option<Duration>) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    /// Inner (general-transient) retry budget.
    pub fn max_transient_retries(&self) -> usize {
        self.schedule.len()
    }
}

/// Which of the two policy variants a request uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyKind {
    Default,
    Get,
}

/// The default and Get policies, selected per request method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicySet {
    pub default: RetryPolicy,
    pub get: RetryPolicy,
}

impl Default for PolicySet {
    fn default() -> Self {
        Self {
            default: RetryPolicy::default_policy(),
            get: RetryPolicy::get_policy(Duration::from_secs(30)),
        }
    }
}

impl PolicySet {
    pub fn kind_for(&self, method: Method) -> PolicyKind {
        if method.is_idempotent() {
            PolicyKind::Get
        } else {
            PolicyKind::Default
        }
    }

    pub fn for_method(&self, method: Method) -> &RetryPolicy {
        match self.kind_for(method) {
            PolicyKind::Get => &self.get,
            PolicyKind::Default => &self.default,
        }
    }
}
