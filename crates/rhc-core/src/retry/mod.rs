//! Retry and backoff policy.
//!
//! This module encapsulates failure classification (transient statuses,
//! throttling, connection failures, timeouts), backoff computation and the
//! retry loop with its two nested budgets, so every call site shares one
//! consistent policy.

mod backoff;
mod classify;
mod error;
mod policy;
mod run;
mod scope;

pub use backoff::{next_delay, BackoffSchedule, MAX_RETRY_AFTER};
pub use classify::{
    classify, classify_response, classify_status, classify_transport_error, parse_retry_after,
    Classification, TransientReason,
};
pub use error::{Attempt, AttemptError, AttemptOutcome, CallError};
pub use policy::{PolicyKind, PolicySet, RetryPolicy, OUTER_MAX_RETRIES};
pub use run::{run_with_retries, RequestTarget};
pub use scope::{RetryScope, ScopeKind};
