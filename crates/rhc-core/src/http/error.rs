//! Transport error type, kept free of curl types so classification stays a pure function.

use serde::Serialize;
use std::fmt;

/// What went wrong below the HTTP layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TransportErrorKind {
    /// Connection could not be established or was dropped (DNS, refused, reset).
    Connect,
    /// The connect phase ran out of time before a connection existed.
    ConnectTimeout,
    /// The whole exchange ran out of time (no connect-phase marker).
    Timeout,
    /// TLS handshake or certificate validation failed.
    Tls,
    /// The in-flight attempt was aborted because its caller went away.
    Cancelled,
    /// Anything else the transport reported.
    Other,
}

impl TransportErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TransportErrorKind::Connect => "connect",
            TransportErrorKind::ConnectTimeout => "connect_timeout",
            TransportErrorKind::Timeout => "timeout",
            TransportErrorKind::Tls => "tls",
            TransportErrorKind::Cancelled => "cancelled",
            TransportErrorKind::Other => "other",
        }
    }
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error raised by a [`Transport`](super::Transport) attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{kind} error: {message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn connect(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Connect, message)
    }

    pub fn connect_timeout(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::ConnectTimeout, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Timeout, message)
    }

    pub fn tls(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Tls, message)
    }

    /// Short type name used in retry telemetry (`exception_type`).
    pub fn type_name(&self) -> String {
        format!("TransportError::{:?}", self.kind)
    }
}
