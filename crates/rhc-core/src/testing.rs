//! Scripted transport for unit tests.

use crate::http::{HttpRequest, HttpResponse, Transport, TransportError, TransportErrorKind};
use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// One scripted attempt: an outcome, optionally delivered after a delay.
#[derive(Debug, Clone)]
pub(crate) struct Step {
    result: Result<HttpResponse, TransportError>,
    delay: Option<Duration>,
}

impl Step {
    pub(crate) fn status(code: u16) -> Self {
        Self::response(HttpResponse::new(code))
    }

    pub(crate) fn response(response: HttpResponse) -> Self {
        Self {
            result: Ok(response),
            delay: None,
        }
    }

    pub(crate) fn error(e: TransportError) -> Self {
        Self {
            result: Err(e),
            delay: None,
        }
    }

    pub(crate) fn after(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

/// Plays back steps in order, then repeats the fallback step (if any).
pub(crate) struct ScriptedTransport {
    steps: Mutex<VecDeque<Step>>,
    fallback: Option<Step>,
    calls: AtomicUsize,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub(crate) fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            fallback: None,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn repeat(step: Step) -> Self {
        Self::new(Vec::new()).then_repeat(step)
    }

    pub(crate) fn then_repeat(mut self, step: Step) -> Self {
        self.fallback = Some(step);
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn next_step(&self) -> Step {
        self.steps
            .lock()
            .unwrap()
            .pop_front()
            .or_else(|| self.fallback.clone())
            .unwrap_or_else(|| {
                Step::error(TransportError::new(
                    TransportErrorKind::Other,
                    "script exhausted",
                ))
            })
    }
}

impl Transport for ScriptedTransport {
    fn attempt(
        &self,
        request: &HttpRequest,
    ) -> impl Future<Output = Result<HttpResponse, TransportError>> + Send {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        let step = self.next_step();
        async move {
            if let Some(delay) = step.delay {
                tokio::time::sleep(delay).await;
            }
            step.result
        }
    }
}
