//! Predicate-guarded continuations.

use crate::http::HttpResponse;
use crate::retry::CallError;
use std::future::Future;
use std::pin::Pin;

pub(crate) type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub(crate) type ResponseHandler<'a, T> =
    Box<dyn FnOnce(HttpResponse) -> BoxFuture<'a, anyhow::Result<T>> + Send + 'a>;

pub(crate) type ErrorHandler<'a, T> =
    Box<dyn FnOnce(CallError) -> BoxFuture<'a, anyhow::Result<T>> + Send + 'a>;

pub(crate) fn response_handler<'a, T, F, Fut>(handler: F) -> ResponseHandler<'a, T>
where
    F: FnOnce(HttpResponse) -> Fut + Send + 'a,
    Fut: Future<Output = anyhow::Result<T>> + Send + 'a,
{
    Box::new(move |response| Box::pin(handler(response)))
}

pub(crate) fn error_handler<'a, T, F, Fut>(handler: F) -> ErrorHandler<'a, T>
where
    F: FnOnce(CallError) -> Fut + Send + 'a,
    Fut: Future<Output = anyhow::Result<T>> + Send + 'a,
{
    Box::new(move |error| Box::pin(handler(error)))
}

/// One conditional fallback, evaluated in declaration order.
pub(crate) enum Stage<'a, T> {
    /// Matches a completed response by status code.
    Status {
        label: String,
        matches: Box<dyn Fn(u16) -> bool + Send + 'a>,
        handler: ResponseHandler<'a, T>,
    },
    /// Matches raised errors that mean "gave up waiting".
    Timeout(ErrorHandler<'a, T>),
    /// Matches every other raised error.
    HttpError(ErrorHandler<'a, T>),
}

impl<'a, T> Stage<'a, T> {
    pub(crate) fn label(&self) -> &str {
        match self {
            Stage::Status { label, .. } => label,
            Stage::Timeout(_) => "timeout",
            Stage::HttpError(_) => "http_error",
        }
    }

    pub(crate) fn matches_response(&self, status: u16) -> bool {
        match self {
            Stage::Status { matches, .. } => matches(status),
            Stage::Timeout(_) | Stage::HttpError(_) => false,
        }
    }

    pub(crate) fn matches_error(&self, error: &CallError) -> bool {
        match self {
            Stage::Status { .. } => false,
            Stage::Timeout(_) => error.is_timeout(),
            Stage::HttpError(_) => !error.is_timeout(),
        }
    }
}
