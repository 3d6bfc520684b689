//! Per-call outcome record.

use std::time::Duration;

use axum::http::StatusCode;
use axum::response::Response;

use super::dispatcher::UpstreamFailure;
use crate::resilience::FailureKind;

/// What happened to one forwarded call. Feeds only the observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProxyOutcome {
    /// Backend status, or `None` when no response arrived.
    pub status: Option<StatusCode>,
    pub duration: Duration,
    pub succeeded: bool,
    pub error_kind: Option<FailureKind>,
}

impl ProxyOutcome {
    pub fn responded(status: StatusCode, duration: Duration) -> Self {
        Self {
            status: Some(status),
            duration,
            succeeded: status.as_u16() < 400,
            error_kind: None,
        }
    }

    pub fn failed(kind: FailureKind, duration: Duration) -> Self {
        Self {
            status: None,
            duration,
            succeeded: false,
            error_kind: Some(kind),
        }
    }

    pub fn from_result(result: &Result<Response, UpstreamFailure>, duration: Duration) -> Self {
        match result {
            Ok(response) => Self::responded(response.status(), duration),
            Err(failure) => Self::failed(failure.kind, duration),
        }
    }

    pub fn duration_ms(&self) -> u128 {
        self.duration.as_millis()
    }
}
