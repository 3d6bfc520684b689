//! Response handling and transformation.
//!
//! # Responsibilities
//! - Map gateway failures to status codes and the `{error, message}` envelope
//! - Strip hop-by-hop headers from backend responses
//! - Keep per-request guards alive until the response body has been sent
//!
//! # Design Decisions
//! - `error` is a stable machine-readable code; `message` is for humans
//! - Internal failures never leak details to the caller

use std::time::Duration;

use axum::{
    body::{Body, Bytes},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use futures_util::{future, stream, StreamExt};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::resilience::timeouts::FailureKind;

/// Failures synthesized by the gateway itself.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("no route configured for {0}")]
    RouteNotFound(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("too many concurrent requests from {0}")]
    AdmissionRejected(String),

    #[error("resource {0} is being processed by another session")]
    SessionConflict(String),

    #[error("request body exceeds {limit} bytes")]
    PayloadTooLarge { limit: usize },

    #[error("request body not received within {timeout:?}")]
    RequestTimeout { timeout: Duration },

    #[error("{service} did not respond within {timeout:?}")]
    BackendTimeout { service: String, timeout: Duration },

    #[error("{service} unavailable ({kind}): {message}")]
    BackendUnavailable {
        service: String,
        kind: FailureKind,
        message: String,
    },

    #[error("{error}: {message}")]
    MissingSetting {
        error: &'static str,
        message: &'static str,
    },

    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::RouteNotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::AdmissionRejected(_) => StatusCode::TOO_MANY_REQUESTS,
            Self::SessionConflict(_) => StatusCode::CONFLICT,
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::RequestTimeout { .. } => StatusCode::REQUEST_TIMEOUT,
            Self::BackendTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            Self::BackendUnavailable { .. } => StatusCode::BAD_GATEWAY,
            Self::MissingSetting { .. } => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable code API consumers branch on.
    pub fn code(&self) -> &'static str {
        match self {
            Self::RouteNotFound(_) => "route_not_found",
            Self::Unauthorized(_) => "unauthorized",
            Self::AdmissionRejected(_) => "too_many_requests",
            Self::SessionConflict(_) => "session_conflict",
            Self::PayloadTooLarge { .. } => "payload_too_large",
            Self::RequestTimeout { .. } => "request_timeout",
            Self::BackendTimeout { .. } => "backend_timeout",
            Self::BackendUnavailable { .. } => "backend_unavailable",
            Self::MissingSetting { error, .. } => *error,
            Self::Internal(_) => "internal_error",
        }
    }

    /// Message shown to the caller.
    pub fn client_message(&self) -> String {
        match self {
            Self::AdmissionRejected(_) => "Too many requests. Please try again later.".to_string(),
            Self::SessionConflict(_) => "This resource is currently being processed by another session. Please try again later.".to_string(),
            Self::BackendUnavailable { message, .. } => message.clone(),
            Self::MissingSetting { message, .. } => message.to_string(),
            Self::Internal(_) => "Something went wrong".to_string(),
            other => other.to_string(),
        }
    }
}

/// JSON body of every synthesized error.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        if let Self::Internal(detail) = &self {
            tracing::error!(error = %detail, "Internal gateway error");
        }
        let body = ErrorBody {
            error: self.code().to_string(),
            message: self.client_message(),
        };
        (self.status(), Json(body)).into_response()
    }
}

const HOP_BY_HOP: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// True for connection-scoped headers that must not be forwarded.
pub fn is_hop_by_hop(name: &str) -> bool {
    HOP_BY_HOP.iter().any(|h| name.eq_ignore_ascii_case(h))
}

/// Remove hop-by-hop headers in place.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in HOP_BY_HOP {
        headers.remove(name);
    }
}

/// Tie `guard` to the lifetime of the response body: it is dropped as soon
/// as the body reaches its end, or when the client goes away first.
pub fn hold_until_complete<G>(response: Response, guard: G) -> Response
where
    G: Send + 'static,
{
    let (parts, body) = response.into_parts();
    let release = stream::once(async move { drop(guard) })
        .filter_map(|()| future::ready(None::<Result<Bytes, axum::Error>>));
    let stream = body.into_data_stream().chain(release);
    Response::from_parts(parts, Body::from_stream(stream))
}
