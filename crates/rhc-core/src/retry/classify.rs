//! Classify a finished attempt (response or error) for retry decisions.

use super::error::{AttemptError, AttemptOutcome};
use crate::http::{Headers, HttpResponse, TransportError, TransportErrorKind};
use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Why a general-transient failure is considered retryable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TransientReason {
    /// 408, 500, 502, 503 or 504.
    ResponseStatusCode,
    /// Connection-level failure (DNS, refused, reset).
    SocketException,
    /// Connect phase exceeded its time limit.
    ConnectTimeout,
    /// The per-attempt timeout of the Get policy expired.
    RetryTimeout,
}

impl fmt::Display for TransientReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransientReason::ResponseStatusCode => "ResponseStatusCode",
            TransientReason::SocketException => "SocketException",
            TransientReason::ConnectTimeout => "ConnectTimeout",
            TransientReason::RetryTimeout => "RetryTimeout",
        };
        f.write_str(s)
    }
}

/// Retry classification of one attempt. Exactly one variant applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Success (2xx); nothing to retry.
    None,
    /// 429, with the server's `Retry-After` hint when it sent a usable one.
    TooManyRequests { retry_after: Option<Duration> },
    /// Transient failure governed by the inner retry budget.
    GeneralTransient { reason: TransientReason },
    /// Never retried.
    Fatal,
}

impl Classification {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Classification::TooManyRequests { .. } | Classification::GeneralTransient { .. }
        )
    }
}

/// Classify the outcome of one attempt.
pub fn classify(outcome: &AttemptOutcome) -> Classification {
    match outcome {
        Ok(response) => classify_response(response),
        Err(AttemptError::Transport(e)) => classify_transport_error(e),
        Err(AttemptError::RetryTimeout(_)) => Classification::GeneralTransient {
            reason: TransientReason::RetryTimeout,
        },
    }
}

/// Classify a completed response by status code (and `Retry-After` for 429).
pub fn classify_response(response: &HttpResponse) -> Classification {
    classify_status(response.status, &response.headers)
}

pub fn classify_status(status: u16, headers: &Headers) -> Classification {
    match status {
        200..=299 => Classification::None,
        429 => Classification::TooManyRequests {
            retry_after: headers.get("retry-after").and_then(parse_retry_after),
        },
        408 | 500 | 502 | 503 | 504 => Classification::GeneralTransient {
            reason: TransientReason::ResponseStatusCode,
        },
        _ => Classification::Fatal,
    }
}

/// Classify a transport error.
///
/// A connect-phase timeout is retried; an overall timeout with no connect
/// marker means the caller's budget ran out and is fatal.
pub fn classify_transport_error(e: &TransportError) -> Classification {
    match e.kind {
        TransportErrorKind::Connect => Classification::GeneralTransient {
            reason: TransientReason::SocketException,
        },
        TransportErrorKind::ConnectTimeout => Classification::GeneralTransient {
            reason: TransientReason::ConnectTimeout,
        },
        TransportErrorKind::Timeout
        | TransportErrorKind::Tls
        | TransportErrorKind::Cancelled
        | TransportErrorKind::Other => Classification::Fatal,
    }
}

/// Parse a `Retry-After` value given as delta-seconds.
///
/// HTTP-date values are not supported and yield `None`, as does anything
/// that is not a non-negative integer.
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}
