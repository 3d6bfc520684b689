//! Response-time observer.
//!
//! Wraps each forwarded call, measures it, records metrics, and decides how
//! loudly to log it. Logging never feeds back into request handling.

use std::future::Future;
use std::time::Duration;

use axum::http::Method;
use axum::response::Response;
use tokio::time::Instant;

use super::metrics;
use crate::config::ObservabilityConfig;
use crate::proxy::{ProxyOutcome, UpstreamFailure};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailReason {
    Slow,
    Error,
}

/// How an outcome should be logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Emission {
    Detailed(DetailReason),
    Verbose,
    Suppressed,
}

#[derive(Debug, Clone, Copy)]
pub struct LogPolicy {
    pub slow_threshold: Duration,
    pub verbose: bool,
}

impl LogPolicy {
    pub fn from_config(config: &ObservabilityConfig) -> Self {
        Self {
            slow_threshold: Duration::from_millis(config.slow_threshold_ms),
            verbose: config.verbose,
        }
    }

    /// Preflights and health checks never produce verbose output.
    pub fn is_exempt(method: &Method, path: &str) -> bool {
        *method == Method::OPTIONS || path.contains("/health")
    }

    pub fn logs_start(&self, method: &Method, path: &str) -> bool {
        self.verbose && !Self::is_exempt(method, path)
    }

    pub fn classify(&self, outcome: &ProxyOutcome, method: &Method, path: &str) -> Emission {
        if outcome.duration > self.slow_threshold {
            return Emission::Detailed(DetailReason::Slow);
        }
        match outcome.status {
            Some(status) if status.as_u16() < 400 => {}
            _ => return Emission::Detailed(DetailReason::Error),
        }
        if self.logs_start(method, path) {
            Emission::Verbose
        } else {
            Emission::Suppressed
        }
    }
}

/// Identifies the call being observed.
#[derive(Debug, Clone, Copy)]
pub struct ObservedRequest<'a> {
    pub method: &'a Method,
    pub path: &'a str,
    pub route: &'a str,
    pub request_id: &'a str,
}

#[derive(Debug, Clone)]
pub struct ResponseTimeObserver {
    policy: LogPolicy,
}

impl ResponseTimeObserver {
    pub fn new(policy: LogPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &LogPolicy {
        &self.policy
    }

    pub async fn observe<F>(
        &self,
        request: ObservedRequest<'_>,
        call: F,
    ) -> Result<Response, UpstreamFailure>
    where
        F: Future<Output = Result<Response, UpstreamFailure>>,
    {
        if self.policy.logs_start(request.method, request.path) {
            tracing::info!(
                request_id = %request.request_id,
                method = %request.method,
                path = %request.path,
                route = %request.route,
                "Proxying request"
            );
        }

        let start = Instant::now();
        let result = call.await;
        let outcome = ProxyOutcome::from_result(&result, start.elapsed());

        metrics::record_request(request.route, request.method, outcome.status, outcome.duration);
        if let Some(kind) = outcome.error_kind {
            metrics::record_upstream_failure(kind);
        }

        self.emit(&request, &outcome, result.as_ref().err());
        result
    }

    fn emit(&self, request: &ObservedRequest<'_>, outcome: &ProxyOutcome, failure: Option<&UpstreamFailure>) {
        let status = outcome.status.map(|s| s.as_u16());
        match self.policy.classify(outcome, request.method, request.path) {
            Emission::Detailed(DetailReason::Slow) => tracing::warn!(
                request_id = %request.request_id,
                method = %request.method,
                path = %request.path,
                route = %request.route,
                status = ?status,
                duration_ms = outcome.duration_ms() as u64,
                threshold_ms = self.policy.slow_threshold.as_millis() as u64,
                "Slow response"
            ),
            Emission::Detailed(DetailReason::Error) => match failure {
                Some(f) => tracing::error!(
                    request_id = %request.request_id,
                    method = %request.method,
                    path = %request.path,
                    route = %request.route,
                    kind = %f.kind,
                    error = %f.message,
                    duration_ms = outcome.duration_ms() as u64,
                    "Upstream request failed"
                ),
                None => tracing::warn!(
                    request_id = %request.request_id,
                    method = %request.method,
                    path = %request.path,
                    route = %request.route,
                    status = ?status,
                    duration_ms = outcome.duration_ms() as u64,
                    "Backend returned an error status"
                ),
            },
            Emission::Verbose => tracing::info!(
                request_id = %request.request_id,
                method = %request.method,
                path = %request.path,
                status = ?status,
                duration_ms = outcome.duration_ms() as u64,
                "Request completed"
            ),
            Emission::Suppressed => {}
        }
    }
}
