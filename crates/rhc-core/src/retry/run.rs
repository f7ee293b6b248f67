//! Retry loop: run an async operation until success, a fatal outcome, or an
//! exhausted budget.
//!
//! Two scopes are owned by the loop. The outer scope counts 429 retries for
//! the whole call; the inner scope counts general-transient retries and is
//! zeroed every time the outer scope retries.

use super::backoff::next_delay;
use super::classify::{classify, Classification};
use super::error::{Attempt, AttemptError, AttemptOutcome, CallError};
use super::policy::{RetryPolicy, OUTER_MAX_RETRIES};
use super::scope::{RetryScope, ScopeKind};
use crate::http::{HttpRequest, HttpResponse, TransportError};
use crate::telemetry::{RetryEvent, RetryReason, TelemetrySink};
use std::future::Future;
use std::time::{Duration, Instant};

/// Method and URI reported in retry events. Either may be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestTarget {
    pub method: String,
    pub uri: String,
}

impl RequestTarget {
    pub fn of(request: &HttpRequest) -> Self {
        Self {
            method: request.method.to_string(),
            uri: request.url.to_string(),
        }
    }
}

/// Runs `operation` under `policy` until it yields a final outcome.
///
/// Any completed response (2xx, fatal status, or the last response of an
/// exhausted retry run) is returned as `Ok`. Errors are the last attempt's
/// error, converted but not rewritten.
pub async fn run_with_retries<F, Fut>(
    policy: &RetryPolicy,
    target: &RequestTarget,
    sink: &dyn TelemetrySink,
    mut operation: F,
) -> Result<HttpResponse, CallError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<HttpResponse, TransportError>>,
{
    let Some(deadline) = policy.call_timeout else {
        return retry_loop(policy, target, sink, &mut operation).await;
    };
    match tokio::time::timeout(deadline, retry_loop(policy, target, sink, &mut operation)).await {
        Ok(result) => result,
        Err(_elapsed) => {
            tracing::warn!(
                method = %target.method,
                uri = %target.uri,
                deadline = ?deadline,
                "call deadline exceeded, not retrying"
            );
            Err(CallError::DeadlineExceeded { deadline })
        }
    }
}

async fn attempt_once<F, Fut>(retry_timeout: Option<Duration>, operation: &mut F) -> AttemptOutcome
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<HttpResponse, TransportError>>,
{
    let fut = operation();
    match retry_timeout {
        // Losing the race drops the attempt future, which cancels it.
        Some(limit) => match tokio::time::timeout(limit, fut).await {
            Ok(result) => result.map_err(AttemptError::Transport),
            Err(_elapsed) => Err(AttemptError::RetryTimeout(limit)),
        },
        None => fut.await.map_err(AttemptError::Transport),
    }
}

async fn retry_loop<F, Fut>(
    policy: &RetryPolicy,
    target: &RequestTarget,
    sink: &dyn TelemetrySink,
    operation: &mut F,
) -> Result<HttpResponse, CallError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<HttpResponse, TransportError>>,
{
    let mut outer = RetryScope::new(ScopeKind::TooManyRequests, OUTER_MAX_RETRIES);
    let mut inner = RetryScope::new(ScopeKind::Transient, policy.max_transient_retries());
    let mut index = 0u32;

    loop {
        let started = Instant::now();
        let outcome = attempt_once(policy.retry_timeout, operation).await;
        let attempt = Attempt {
            index,
            outcome,
            elapsed: started.elapsed(),
        };
        let classification = classify(&attempt.outcome);
        tracing::debug!(
            attempt = attempt.index,
            elapsed = ?attempt.elapsed,
            classification = ?classification,
            "attempt finished"
        );

        let (scope, retry_index) = match classification {
            Classification::None => {
                if attempt.index > 0 {
                    tracing::info!(attempts = attempt.index + 1, "request succeeded after retries");
                }
                return finish(attempt);
            }
            Classification::Fatal => {
                tracing::debug!(attempt = attempt.index, "fatal outcome, not retrying");
                return finish(attempt);
            }
            Classification::TooManyRequests { .. } => {
                if outer.is_exhausted() {
                    tracing::info!(
                        retries = outer.attempts_used,
                        "too-many-requests retry budget exhausted"
                    );
                    return finish(attempt);
                }
                inner.reset();
                (ScopeKind::TooManyRequests, outer.consume())
            }
            Classification::GeneralTransient { reason } => {
                if inner.is_exhausted() {
                    tracing::info!(
                        retries = inner.attempts_used,
                        reason = %reason,
                        "transient retry budget exhausted"
                    );
                    return finish(attempt);
                }
                (ScopeKind::Transient, inner.consume())
            }
        };

        let delay = next_delay(&policy.schedule, scope, retry_index, &classification);
        if let Some(retry_reason) = RetryReason::from_classification(&classification) {
            sink.emit(&retry_event(&attempt, target, scope, retry_reason, delay, retry_index + 1));
        }
        tokio::time::sleep(delay).await;
        index += 1;
    }
}

fn finish(attempt: Attempt) -> Result<HttpResponse, CallError> {
    attempt.outcome.map_err(CallError::from)
}

fn retry_event(
    attempt: &Attempt,
    target: &RequestTarget,
    scope: ScopeKind,
    retry_reason: RetryReason,
    retry_delay: Duration,
    retry_count: usize,
) -> RetryEvent {
    let (response_status_code, exception_type) = match &attempt.outcome {
        Ok(response) => (response.status, String::new()),
        Err(e) => (0, e.type_name()),
    };
    RetryEvent {
        retry_reason,
        scope,
        response_status_code,
        exception_type,
        request_method: target.method.clone(),
        request_uri: target.uri.clone(),
        retry_delay,
        retry_count,
        attempt_index: attempt.index,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{Transport, TransportErrorKind};
    use crate::retry::BackoffSchedule;
    use crate::telemetry::MemorySink;
    use crate::testing::{ScriptedTransport, Step};

    fn fast_policy() -> RetryPolicy {
        RetryPolicy::default_policy().with_schedule(
            BackoffSchedule::new(vec![Duration::from_millis(1); 3]).unwrap(),
        )
    }

    fn target() -> RequestTarget {
        RequestTarget {
            method: "GET".to_string(),
            uri: "http://service.test/items".to_string(),
        }
    }

    async fn run(
        policy: &RetryPolicy,
        transport: &ScriptedTransport,
        sink: &MemorySink,
    ) -> Result<HttpResponse, CallError> {
        let request = HttpRequest::get("http://service.test/items").unwrap();
        run_with_retries(policy, &target(), sink, || transport.attempt(&request)).await
    }

    #[tokio::test]
    async fn single_transient_status_then_success() {
        for code in [408, 500, 502, 503, 504] {
            let transport = ScriptedTransport::new(vec![Step::status(code), Step::status(200)]);
            let sink = MemorySink::new();
            let resp = run(&fast_policy(), &transport, &sink).await.unwrap();
            assert_eq!(resp.status, 200);
            assert_eq!(transport.calls(), 2, "status {}", code);
            let events = sink.events();
            assert_eq!(events.len(), 1);
            assert_eq!(events[0].retry_reason, RetryReason::ResponseStatusCode);
            assert_eq!(events[0].response_status_code, code);
            assert_eq!(events[0].retry_count, 1);
        }
    }

    #[tokio::test]
    async fn sustained_transient_exhausts_inner_budget() {
        let transport = ScriptedTransport::repeat(Step::status(503));
        let sink = MemorySink::new();
        let resp = run(&fast_policy(), &transport, &sink).await.unwrap();
        assert_eq!(resp.status, 503);
        assert_eq!(transport.calls(), 4);
        let counts: Vec<usize> = sink.events().iter().map(|e| e.retry_count).collect();
        assert_eq!(counts, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn sustained_socket_errors_surface_last_error() {
        let transport = ScriptedTransport::repeat(Step::error(TransportError::connect(
            "could not resolve host: service.test",
        )));
        let sink = MemorySink::new();
        let err = run(&fast_policy(), &transport, &sink).await.unwrap_err();
        match err {
            CallError::Transport(e) => assert_eq!(e.kind, TransportErrorKind::Connect),
            other => panic!("unexpected error {:?}", other),
        }
        assert_eq!(transport.calls(), 4);
        let events = sink.events();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].retry_reason, RetryReason::SocketException);
        assert_eq!(events[0].response_status_code, 0);
        assert_eq!(events[0].exception_type, "TransportError::Connect");
    }

    #[tokio::test]
    async fn sustained_429_exhausts_outer_budget() {
        let transport = ScriptedTransport::repeat(Step::status(429));
        let sink = MemorySink::new();
        let resp = run(&fast_policy(), &transport, &sink).await.unwrap();
        assert_eq!(resp.status, 429);
        assert_eq!(transport.calls(), 16);
        let events = sink.events();
        assert_eq!(events.len(), 15);
        assert!(events
            .iter()
            .all(|e| e.retry_reason == RetryReason::TooManyRequests));
        assert_eq!(events.last().unwrap().retry_count, 15);
    }

    #[tokio::test]
    async fn first_429_without_header_waits_first_schedule_entry() {
        let transport = ScriptedTransport::new(vec![Step::status(429), Step::status(200)]);
        let sink = MemorySink::new();
        let policy = RetryPolicy::default_policy().with_schedule(
            BackoffSchedule::new(vec![Duration::from_millis(7), Duration::from_millis(9)])
                .unwrap(),
        );
        run(&policy, &transport, &sink).await.unwrap();
        assert_eq!(sink.events()[0].retry_delay, Duration::from_millis(7));
    }

    #[tokio::test]
    async fn retry_after_header_overrides_schedule() {
        let throttled = Step::response(HttpResponse::new(429).with_header("Retry-After", "0"));
        let transport = ScriptedTransport::new(vec![throttled, Step::status(200)]);
        let sink = MemorySink::new();
        run(&fast_policy(), &transport, &sink).await.unwrap();
        assert_eq!(sink.events()[0].retry_delay, Duration::ZERO);
    }

    #[tokio::test]
    async fn interleaved_transient_does_not_refill_outer_budget() {
        let mut steps = vec![Step::status(429); 11];
        steps.push(Step::status(503));
        steps.extend(vec![Step::status(429); 5]);
        let transport = ScriptedTransport::new(steps).then_repeat(Step::status(200));
        let sink = MemorySink::new();
        let resp = run(&fast_policy(), &transport, &sink).await.unwrap();
        assert_eq!(resp.status, 429);
        assert_eq!(transport.calls(), 17);
        assert_eq!(sink.events().len(), 16);
    }

    #[tokio::test]
    async fn outer_retry_resets_inner_budget() {
        let steps = vec![
            Step::status(503),
            Step::status(503),
            Step::status(429),
            Step::status(503),
            Step::status(503),
            Step::status(503),
            Step::status(200),
        ];
        let transport = ScriptedTransport::new(steps);
        let sink = MemorySink::new();
        let resp = run(&fast_policy(), &transport, &sink).await.unwrap();
        assert_eq!(resp.status, 200);
        assert_eq!(transport.calls(), 7);
        let counts: Vec<(ScopeKind, usize)> = sink
            .events()
            .iter()
            .map(|e| (e.scope, e.retry_count))
            .collect();
        assert_eq!(
            counts,
            vec![
                (ScopeKind::Transient, 1),
                (ScopeKind::Transient, 2),
                (ScopeKind::TooManyRequests, 1),
                (ScopeKind::Transient, 1),
                (ScopeKind::Transient, 2),
                (ScopeKind::Transient, 3),
            ]
        );
    }

    #[tokio::test]
    async fn fatal_outcomes_stop_after_one_attempt() {
        let fatal = [
            Step::status(400),
            Step::status(404),
            Step::status(501),
            Step::error(TransportError::tls("certificate verify failed")),
            Step::error(TransportError::timeout("Operation timed out after 100 ms")),
        ];
        for step in fatal {
            let transport = ScriptedTransport::repeat(step);
            let sink = MemorySink::new();
            let _ = run(&fast_policy(), &transport, &sink).await;
            assert_eq!(transport.calls(), 1);
            assert!(sink.is_empty());
        }
    }

    #[tokio::test]
    async fn connect_timeout_is_retried() {
        let transport = ScriptedTransport::new(vec![
            Step::error(TransportError::connect_timeout("Connection timed out after 5 ms")),
            Step::status(204),
        ]);
        let sink = MemorySink::new();
        let resp = run(&fast_policy(), &transport, &sink).await.unwrap();
        assert_eq!(resp.status, 204);
        assert_eq!(sink.events()[0].retry_reason, RetryReason::ConnectTimeout);
    }

    #[tokio::test]
    async fn per_attempt_timeout_retries_slow_attempt() {
        let policy = RetryPolicy::get_policy(Duration::from_millis(20)).with_schedule(
            BackoffSchedule::new(vec![Duration::from_millis(1); 3]).unwrap(),
        );
        let transport = ScriptedTransport::new(vec![
            Step::status(200).after(Duration::from_millis(500)),
            Step::status(200),
        ]);
        let sink = MemorySink::new();
        let resp = run(&policy, &transport, &sink).await.unwrap();
        assert_eq!(resp.status, 200);
        assert_eq!(transport.calls(), 2);
        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].retry_reason, RetryReason::RetryTimeout);
        assert_eq!(events[0].exception_type, "RetryTimeout");
    }

    #[tokio::test]
    async fn per_attempt_timeouts_exhaust_inner_budget() {
        let policy = RetryPolicy::get_policy(Duration::from_millis(10)).with_schedule(
            BackoffSchedule::new(vec![Duration::from_millis(1); 2]).unwrap(),
        );
        let transport =
            ScriptedTransport::repeat(Step::status(200).after(Duration::from_millis(300)));
        let sink = MemorySink::new();
        let err = run(&policy, &transport, &sink).await.unwrap_err();
        assert_eq!(
            err,
            CallError::AttemptTimedOut {
                timeout: Duration::from_millis(10)
            }
        );
        assert_eq!(transport.calls(), 3);
    }

    #[tokio::test]
    async fn call_deadline_is_not_retried() {
        let policy = RetryPolicy::default_policy()
            .with_schedule(BackoffSchedule::new(vec![Duration::from_secs(5)]).unwrap())
            .with_call_timeout(Some(Duration::from_millis(30)));
        let transport = ScriptedTransport::repeat(Step::status(503));
        let sink = MemorySink::new();
        let err = run(&policy, &transport, &sink).await.unwrap_err();
        assert!(matches!(err, CallError::DeadlineExceeded { .. }));
        assert!(err.is_timeout());
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn events_carry_target_and_attempt_order() {
        let transport = ScriptedTransport::new(vec![
            Step::status(500),
            Step::status(429),
            Step::status(200),
        ]);
        let sink = MemorySink::new();
        run(&fast_policy(), &transport, &sink).await.unwrap();
        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].attempt_index, 0);
        assert_eq!(events[1].attempt_index, 1);
        assert_eq!(events[1].request_method, "GET");
        assert_eq!(events[1].request_uri, "http://service.test/items");
    }
}
