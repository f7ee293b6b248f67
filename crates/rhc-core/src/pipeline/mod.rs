//! Outcome pipeline.
//!
//! Routes the single terminal outcome of a call (a response or a raised
//! error) through an ordered list of `(predicate, handler)` stages:
//!
//! - `if_success` runs for a 2xx response and short-circuits everything else;
//! - `else_if_*` stages are tried in declaration order, first match wins;
//! - a terminal (`else_throw`, `else_value`, `else_with`) covers the rest.
//!
//! The source future is awaited exactly once and nothing is retried here.
//! Errors returned by a handler propagate unmodified.

mod failure;
mod stage;


pub use failure::{HttpFailure, RequestDiagnostics, ResponseDiagnostics};

use crate::http::{HttpRequest, HttpResponse};
use crate::redact::{DefaultRedactor, Redactor};
use crate::retry::CallError;
use stage::{error_handler, response_handler, BoxFuture, ResponseHandler, Stage};
use std::future::Future;
use std::sync::Arc;

/// Builder over one call's terminal outcome.
#[must_use = "a pipeline does nothing until a terminal (else_throw, else_value, else_with) is awaited"]
pub struct Pipeline<'a, T> {
    source: BoxFuture<'a, Result<HttpResponse, CallError>>,
    request: Option<HttpRequest>,
    redactor: Arc<dyn Redactor>,
    on_success: Option<ResponseHandler<'a, T>>,
    stages: Vec<Stage<'a, T>>,
}

impl<'a, T: Send + 'a> Pipeline<'a, T> {
    /// Wrap a source that yields the call's terminal outcome.
    pub fn new<S>(source: S) -> Self
    where
        S: Future<Output = Result<HttpResponse, CallError>> + Send + 'a,
    {
        Self {
            source: Box::pin(source),
            request: None,
            redactor: Arc::new(DefaultRedactor::default()),
            on_success: None,
            stages: Vec::new(),
        }
    }

    /// Attach the request so diagnostics can describe it.
    pub fn with_request(mut self, request: HttpRequest) -> Self {
        self.request = Some(request);
        self
    }

    pub fn with_redactor(mut self, redactor: Arc<dyn Redactor>) -> Self {
        self.redactor = redactor;
        self
    }

    /// Handler for a 2xx response. Declaring it again replaces the previous one.
    pub fn if_success<F, Fut>(mut self, handler: F) -> Self
    where
        F: FnOnce(HttpResponse) -> Fut + Send + 'a,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'a,
    {
        self.on_success = Some(response_handler(handler));
        self
    }

    /// Handler for any response whose status satisfies `predicate`.
    pub fn else_if_status<P, F, Fut>(self, predicate: P, handler: F) -> Self
    where
        P: Fn(u16) -> bool + Send + 'a,
        F: FnOnce(HttpResponse) -> Fut + Send + 'a,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'a,
    {
        self.push_status("custom".to_string(), predicate, handler)
    }

    pub fn else_if_status_code<F, Fut>(self, code: u16, handler: F) -> Self
    where
        F: FnOnce(HttpResponse) -> Fut + Send + 'a,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'a,
    {
        self.push_status(format!("status {}", code), move |s| s == code, handler)
    }

    /// 400.
    pub fn else_if_bad_request<F, Fut>(self, handler: F) -> Self
    where
        F: FnOnce(HttpResponse) -> Fut + Send + 'a,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'a,
    {
        self.else_if_status_code(400, handler)
    }

    /// 401.
    pub fn else_if_unauthorized<F, Fut>(self, handler: F) -> Self
    where
        F: FnOnce(HttpResponse) -> Fut + Send + 'a,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'a,
    {
        self.else_if_status_code(401, handler)
    }

    /// 404.
    pub fn else_if_not_found<F, Fut>(self, handler: F) -> Self
    where
        F: FnOnce(HttpResponse) -> Fut + Send + 'a,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'a,
    {
        self.else_if_status_code(404, handler)
    }

    /// 409.
    pub fn else_if_conflict<F, Fut>(self, handler: F) -> Self
    where
        F: FnOnce(HttpResponse) -> Fut + Send + 'a,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'a,
    {
        self.else_if_status_code(409, handler)
    }

    /// 429 that survived the retry budget.
    pub fn else_if_too_many_requests<F, Fut>(self, handler: F) -> Self
    where
        F: FnOnce(HttpResponse) -> Fut + Send + 'a,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'a,
    {
        self.else_if_status_code(429, handler)
    }

    /// 500 through 599.
    pub fn else_if_in_500_range<F, Fut>(self, handler: F) -> Self
    where
        F: FnOnce(HttpResponse) -> Fut + Send + 'a,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'a,
    {
        self.push_status(
            "5xx".to_string(),
            |s| (500..600).contains(&s),
            handler,
        )
    }

    /// Raised error meaning the call gave up waiting: the overall deadline,
    /// a transport-level overall timeout, or exhausted per-attempt timeouts.
    pub fn else_if_timeout<F, Fut>(mut self, handler: F) -> Self
    where
        F: FnOnce(CallError) -> Fut + Send + 'a,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'a,
    {
        self.stages.push(Stage::Timeout(error_handler(handler)));
        self
    }

    /// Any other raised error from the transport layer.
    pub fn else_if_http_error<F, Fut>(mut self, handler: F) -> Self
    where
        F: FnOnce(CallError) -> Fut + Send + 'a,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'a,
    {
        self.stages.push(Stage::HttpError(error_handler(handler)));
        self
    }

    fn push_status<P, F, Fut>(mut self, label: String, predicate: P, handler: F) -> Self
    where
        P: Fn(u16) -> bool + Send + 'a,
        F: FnOnce(HttpResponse) -> Fut + Send + 'a,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'a,
    {
        self.stages.push(Stage::Status {
            label,
            matches: Box::new(predicate),
            handler: response_handler(handler),
        });
        self
    }

    /// Await the source and run the first matching handler.
    /// `Err` means nothing matched.
    async fn route(self) -> Result<anyhow::Result<T>, HttpFailure> {
        let Pipeline {
            source,
            request,
            redactor,
            on_success,
            stages,
        } = self;

        match source.await {
            Ok(response) => {
                if response.is_success() {
                    if let Some(handler) = on_success {
                        tracing::debug!(status = response.status, "success handler");
                        return Ok(handler(response).await);
                    }
                }
                for stage in stages {
                    if stage.matches_response(response.status) {
                        tracing::debug!(status = response.status, stage = stage.label(), "fallback handler");
                        if let Stage::Status { handler, .. } = stage {
                            return Ok(handler(response).await);
                        }
                    }
                }
                Err(HttpFailure::from_response(
                    request.as_ref(),
                    &response,
                    redactor.as_ref(),
                ))
            }
            Err(error) => {
                for stage in stages {
                    if stage.matches_error(&error) {
                        tracing::debug!(error = %error, stage = stage.label(), "error handler");
                        match stage {
                            Stage::Timeout(handler) | Stage::HttpError(handler) => {
                                return Ok(handler(error).await)
                            }
                            Stage::Status { .. } => {}
                        }
                    }
                }
                Err(HttpFailure::from_error(
                    request.as_ref(),
                    error,
                    redactor.as_ref(),
                ))
            }
        }
    }

    /// Terminal: fail with a redacted [`HttpFailure`] when no stage matched.
    pub async fn else_throw(self) -> anyhow::Result<T> {
        match self.route().await {
            Ok(result) => result,
            Err(failure) => {
                tracing::warn!(diagnostics = %failure.to_json(), "{}", failure);
                Err(anyhow::Error::new(failure))
            }
        }
    }

    /// Terminal: return `fallback` when no stage matched.
    pub async fn else_value(self, fallback: T) -> anyhow::Result<T> {
        match self.route().await {
            Ok(result) => result,
            Err(failure) => {
                tracing::debug!("{}; using fallback value", failure);
                Ok(fallback)
            }
        }
    }

    /// Terminal: hand the unmatched outcome to `handler`.
    pub async fn else_with<F, Fut>(self, handler: F) -> anyhow::Result<T>
    where
        F: FnOnce(HttpFailure) -> Fut + Send + 'a,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'a,
    {
        match self.route().await {
            Ok(result) => result,
            Err(failure) => handler(failure).await,
        }
    }
}
