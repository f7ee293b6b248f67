//! Retry telemetry: one `RetryEvent` per retry decision, handed to a sink.
//!
//! Sinks are infallible by signature so nothing they do can change a retry
//! decision or a call's outcome. They must tolerate concurrent emission from
//! independent calls.

use crate::retry::{Classification, ScopeKind, TransientReason};
use serde::{Serialize, Serializer};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Why a retry was scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RetryReason {
    TooManyRequests,
    ResponseStatusCode,
    SocketException,
    ConnectTimeout,
    RetryTimeout,
}

impl RetryReason {
    /// `None` for classifications that are never retried.
    pub fn from_classification(c: &Classification) -> Option<Self> {
        match c {
            Classification::TooManyRequests { .. } => Some(RetryReason::TooManyRequests),
            Classification::GeneralTransient { reason } => Some(match reason {
                TransientReason::ResponseStatusCode => RetryReason::ResponseStatusCode,
                TransientReason::SocketException => RetryReason::SocketException,
                TransientReason::ConnectTimeout => RetryReason::ConnectTimeout,
                TransientReason::RetryTimeout => RetryReason::RetryTimeout,
            }),
            Classification::None | Classification::Fatal => None,
        }
    }
}

/// Record of one retry decision. Emitted before the backoff wait begins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RetryEvent {
    pub retry_reason: RetryReason,
    pub scope: ScopeKind,
    /// Status of the failed attempt, 0 when it produced no response.
    pub response_status_code: u16,
    /// Error type of the failed attempt, empty when it produced a response.
    pub exception_type: String,
    pub request_method: String,
    pub request_uri: String,
    #[serde(rename = "retry_delay_ms", serialize_with = "as_millis")]
    pub retry_delay: Duration,
    /// 1-based within its scope.
    pub retry_count: usize,
    /// 0-based index of the attempt that failed, across the whole call.
    pub attempt_index: u32,
}

fn as_millis<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

/// Receives retry events.
pub trait TelemetrySink: Send + Sync {
    fn emit(&self, event: &RetryEvent);
}

impl<T: TelemetrySink + ?Sized> TelemetrySink for Arc<T> {
    fn emit(&self, event: &RetryEvent) {
        (**self).emit(event);
    }
}

/// Logs each event as a structured `tracing` warning.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl TelemetrySink for TracingSink {
    fn emit(&self, event: &RetryEvent) {
        tracing::warn!(
            retry_reason = ?event.retry_reason,
            scope = ?event.scope,
            status = event.response_status_code,
            exception_type = %event.exception_type,
            method = %event.request_method,
            uri = %event.request_uri,
            delay = ?event.retry_delay,
            retry_count = event.retry_count,
            attempt = event.attempt_index,
            "retrying request"
        );
    }
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl TelemetrySink for NoopSink {
    fn emit(&self, _event: &RetryEvent) {}
}

/// Append-only in-memory log of events.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<RetryEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything emitted so far, in emission order.
    pub fn events(&self) -> Vec<RetryEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.events().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TelemetrySink for MemorySink {
    fn emit(&self, event: &RetryEvent) {
        let mut events = match self.events.lock() {
            Ok(events) => events,
            Err(poisoned) => poisoned.into_inner(),
        };
        events.push(event.clone());
    }
}

/// Forwards each event to both sinks.
pub struct Tee<A, B>(pub A, pub B);

impl<A: TelemetrySink, B: TelemetrySink> TelemetrySink for Tee<A, B> {
    fn emit(&self, event: &RetryEvent) {
        self.0.emit(event);
        self.1.emit(event);
    }
}
