//! Attempt and call error types for retry classification.

use crate::http::{HttpResponse, TransportError, TransportErrorKind};
use serde::Serialize;
use std::time::Duration;

/// Why a single attempt produced no response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptError {
    /// The transport raised an error.
    Transport(TransportError),
    /// The engine's per-attempt timeout expired before the transport finished.
    RetryTimeout(Duration),
}

/// Result of one attempt before classification.
pub type AttemptOutcome = Result<HttpResponse, AttemptError>;

/// One execution of the wrapped operation.
#[derive(Debug)]
pub struct Attempt {
    /// 0-based across the whole call; never reset.
    pub index: u32,
    pub outcome: AttemptOutcome,
    pub elapsed: Duration,
}

/// Error that ends a call without a response.
///
/// Status-driven failures are not errors at this level: the engine hands the
/// final response back and the outcome pipeline decides what it means.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
pub enum CallError {
    /// Last transport error, unmodified.
    #[error(transparent)]
    Transport(TransportError),
    /// Every attempt in the transient budget hit the per-attempt timeout.
    #[error("attempt timed out after {timeout:?}; retry budget exhausted")]
    AttemptTimedOut { timeout: Duration },
    /// The overall call deadline expired; never retried.
    #[error("call deadline of {deadline:?} exceeded")]
    DeadlineExceeded { deadline: Duration },
}

impl CallError {
    /// True when the call gave up waiting (overall deadline, transport
    /// timeout, or exhausted per-attempt timeouts).
    pub fn is_timeout(&self) -> bool {
        match self {
            CallError::DeadlineExceeded { .. } | CallError::AttemptTimedOut { .. } => true,
            CallError::Transport(e) => e.kind == TransportErrorKind::Timeout,
        }
    }

    /// Short type name for diagnostics and telemetry.
    pub fn type_name(&self) -> String {
        match self {
            CallError::Transport(e) => e.type_name(),
            CallError::AttemptTimedOut { .. } => "CallError::AttemptTimedOut".to_string(),
            CallError::DeadlineExceeded { .. } => "CallError::DeadlineExceeded".to_string(),
        }
    }
}

impl From<AttemptError> for CallError {
    fn from(e: AttemptError) -> Self {
        match e {
            AttemptError::Transport(e) => CallError::Transport(e),
            AttemptError::RetryTimeout(timeout) => CallError::AttemptTimedOut { timeout },
        }
    }
}

impl AttemptError {
    pub(crate) fn type_name(&self) -> String {
        match self {
            AttemptError::Transport(e) => e.type_name(),
            AttemptError::RetryTimeout(_) => "RetryTimeout".to_string(),
        }
    }
}
