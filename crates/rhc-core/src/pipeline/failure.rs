//! Diagnostic error raised by the `else_throw` terminal.

use crate::http::{Headers, HttpRequest, HttpResponse};
use crate::redact::Redactor;
use crate::retry::CallError;
use serde::Serialize;
use std::fmt;

/// Redacted view of the request that failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestDiagnostics {
    pub method: String,
    pub url: String,
    pub headers: Headers,
    pub body: Option<String>,
}

/// Redacted view of the final response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResponseDiagnostics {
    pub status: u16,
    pub headers: Headers,
    pub body: String,
}

/// A call no pipeline stage handled.
///
/// Carries either the final response's status or the raised error, plus
/// redacted request/response data as structured fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HttpFailure {
    pub status: Option<u16>,
    pub cause: Option<CallError>,
    pub request: Option<RequestDiagnostics>,
    pub response: Option<ResponseDiagnostics>,
}

impl HttpFailure {
    pub(crate) fn from_response(
        request: Option<&HttpRequest>,
        response: &HttpResponse,
        redactor: &dyn Redactor,
    ) -> Self {
        Self {
            status: Some(response.status),
            cause: None,
            request: request.map(|r| request_diagnostics(r, redactor)),
            response: Some(ResponseDiagnostics {
                status: response.status,
                headers: redactor.redact_headers(&response.headers),
                body: redactor.redact_body(&response.body),
            }),
        }
    }

    pub(crate) fn from_error(
        request: Option<&HttpRequest>,
        error: CallError,
        redactor: &dyn Redactor,
    ) -> Self {
        Self {
            status: None,
            cause: Some(error),
            request: request.map(|r| request_diagnostics(r, redactor)),
            response: None,
        }
    }

    /// Structured form for logs.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

fn request_diagnostics(request: &HttpRequest, redactor: &dyn Redactor) -> RequestDiagnostics {
    RequestDiagnostics {
        method: request.method.to_string(),
        url: request.url.to_string(),
        headers: redactor.redact_headers(&request.headers),
        body: request.body.as_deref().map(|b| redactor.redact_body(b)),
    }
}

impl fmt::Display for HttpFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.status, &self.cause) {
            (Some(status), _) => write!(f, "HTTP {}", status)?,
            (None, Some(cause)) => write!(f, "{}", cause)?,
            (None, None) => write!(f, "request failed")?,
        }
        if let Some(req) = &self.request {
            write!(f, " ({} {})", req.method, req.url)?;
        }
        Ok(())
    }
}

impl std::error::Error for HttpFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_ref()
            .map(|c| c as &(dyn std::error::Error + 'static))
    }
}
