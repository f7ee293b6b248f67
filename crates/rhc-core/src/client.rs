//! Caller-facing entry point: one request in, one pipeline out.
//!
//! `Client` wires a transport to the retry engine (policy chosen by method)
//! and hands the engine's terminal outcome to a [`Pipeline`].

use crate::config::RhcConfig;
use crate::http::{CurlTransport, HttpRequest, HttpResponse, Transport};
use crate::pipeline::Pipeline;
use crate::redact::Redactor;
use crate::retry::{run_with_retries, CallError, PolicySet, RequestTarget};
use crate::telemetry::{TelemetrySink, TracingSink};
use anyhow::Result;
use std::sync::Arc;

pub struct Client<T = CurlTransport> {
    transport: Arc<T>,
    policies: PolicySet,
    telemetry: Arc<dyn TelemetrySink>,
    redactor: Arc<dyn Redactor>,
}

impl<T> Clone for Client<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            policies: self.policies.clone(),
            telemetry: Arc::clone(&self.telemetry),
            redactor: Arc::clone(&self.redactor),
        }
    }
}

impl Client<CurlTransport> {
    /// libcurl-backed client using every section of `cfg` (defaults for missing ones).
    pub fn from_config(cfg: &RhcConfig) -> Result<Self> {
        let options = cfg.transport_or_default().curl_options()?;
        let policies = cfg.retry_or_default().policies()?;
        let redactor = cfg.redaction_or_default().redactor();
        Ok(Self::new(CurlTransport::new(options))
            .with_policies(policies)
            .with_redactor(Arc::new(redactor)))
    }
}

impl<T: Transport> Client<T> {
    /// Default policies, events logged through `tracing`, default redaction.
    pub fn new(transport: T) -> Self {
        Self {
            transport: Arc::new(transport),
            policies: PolicySet::default(),
            telemetry: Arc::new(TracingSink),
            redactor: Arc::new(crate::redact::DefaultRedactor::default()),
        }
    }

    pub fn with_policies(mut self, policies: PolicySet) -> Self {
        self.policies = policies;
        self
    }

    pub fn with_telemetry(mut self, telemetry: Arc<dyn TelemetrySink>) -> Self {
        self.telemetry = telemetry;
        self
    }

    pub fn with_redactor(mut self, redactor: Arc<dyn Redactor>) -> Self {
        self.redactor = redactor;
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn policies(&self) -> &PolicySet {
        &self.policies
    }

    /// Run `request` through the retry engine and return its terminal outcome.
    pub async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, CallError> {
        let policy = self.policies.for_method(request.method);
        let target = RequestTarget::of(request);
        tracing::debug!(
            method = %target.method,
            uri = %target.uri,
            policy = ?self.policies.kind_for(request.method),
            "sending request"
        );
        let transport = &self.transport;
        run_with_retries(policy, &target, self.telemetry.as_ref(), || {
            transport.attempt(request)
        })
        .await
    }

    /// Start an outcome pipeline for `request`. Nothing is sent until a
    /// terminal of the returned pipeline is awaited.
    pub fn execute<'a, R: Send + 'a>(&'a self, request: HttpRequest) -> Pipeline<'a, R> {
        let diagnostics = request.clone();
        Pipeline::new(async move { self.send(&request).await })
            .with_request(diagnostics)
            .with_redactor(Arc::clone(&self.redactor))
    }
}
