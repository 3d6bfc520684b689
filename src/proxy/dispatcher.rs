//! Forwarding requests to backend services.
//!
//! # Responsibilities
//! - Buffer the request body up to the configured maximum
//! - Rewrite the path and build the outbound URL
//! - Filter headers (host, hop-by-hop, gateway-internal)
//! - Issue the call under the route's deadline and classify failures
//! - Cut off response bodies that stall for longer than the deadline
//!
//! # Design Decisions
//! - Backend responses pass through untouched, whatever their status
//! - No retries; a failed call is reported once

use std::error::Error as StdError;
use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    body::{Body, Bytes},
    http::{
        header::{HeaderName, HeaderValue, HOST},
        HeaderMap, Method, Request, Uri,
    },
    response::Response,
};
use futures_util::{stream, StreamExt};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use thiserror::Error;

use crate::config::{SecurityConfig, TimeoutConfig, UpstreamConfig};
use crate::http::response::{is_hop_by_hop, strip_hop_by_hop, GatewayError};
use crate::resilience::{with_deadline, DeadlineExceeded, FailureKind};
use crate::routing::Route;
use crate::security::limits::read_limited;

const X_FORWARDED_FOR: &str = "x-forwarded-for";
const X_FORWARDED_HOST: &str = "x-forwarded-host";

/// A request whose body is fully in memory.
#[derive(Debug, Clone)]
pub struct BufferedRequest {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl BufferedRequest {
    pub fn path(&self) -> &str {
        self.uri.path()
    }
}

/// A backend produced no response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct UpstreamFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl UpstreamFailure {
    fn from_client_error(err: &(dyn StdError + 'static)) -> Self {
        Self {
            kind: FailureKind::classify(err),
            message: error_chain(err),
        }
    }
}

/// End `body` with an error once no data has arrived for `idle`.
pub fn idle_bounded(body: Body, idle: Duration) -> Body {
    let frames = stream::unfold(Some(body.into_data_stream()), move |state| async move {
        let Some(mut data) = state else {
            return None;
        };
        match tokio::time::timeout(idle, data.next()).await {
            Ok(Some(chunk)) => Some((chunk, Some(data))),
            Ok(None) => None,
            Err(_) => {
                tracing::warn!(idle_ms = idle.as_millis() as u64, "Backend response body stalled");
                Some((Err(axum::Error::new(DeadlineExceeded(idle))), None))
            }
        }
    });
    Body::from_stream(frames)
}

/// `err` and its sources, joined.
fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[derive(Debug, Clone)]
pub struct ProxyDispatcher {
    client: Client<HttpConnector, Body>,
    max_body_bytes: usize,
    internal_header_prefix: String,
    strip_headers: Vec<HeaderName>,
    uniform_failure_status: bool,
}

impl ProxyDispatcher {
    pub fn new(timeouts: &TimeoutConfig, security: &SecurityConfig, upstream: &UpstreamConfig) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(Duration::from_millis(timeouts.connect_ms)));

        let client = Client::builder(TokioExecutor::new())
            .pool_idle_timeout(Duration::from_secs(timeouts.pool_idle_secs))
            .build(connector);

        let strip_headers = upstream
            .strip_headers
            .iter()
            .filter_map(|h| match HeaderName::from_bytes(h.trim().as_bytes()) {
                Ok(name) => Some(name),
                Err(_) => {
                    tracing::warn!(header = %h, "Ignoring invalid strip header name");
                    None
                }
            })
            .collect();

        Self {
            client,
            max_body_bytes: security.max_body_bytes,
            internal_header_prefix: upstream.internal_header_prefix.to_ascii_lowercase(),
            strip_headers,
            uniform_failure_status: upstream.uniform_failure_status,
        }
    }

    pub fn max_body_bytes(&self) -> usize {
        self.max_body_bytes
    }

    /// Read the whole body, refusing oversized ones before any network call.
    pub async fn buffer(&self, request: Request<Body>) -> Result<BufferedRequest, GatewayError> {
        let (parts, body) = request.into_parts();
        let body = read_limited(&parts.headers, body, self.max_body_bytes).await?;
        Ok(BufferedRequest {
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
            body,
        })
    }

    /// Outbound URL: route target + rewritten path + original query.
    pub fn target_uri(route: &Route, uri: &Uri) -> Result<Uri, UpstreamFailure> {
        let path = route.rewrite.apply(uri.path());
        let url = match uri.query() {
            Some(query) => format!("{}{}?{}", route.target, path, query),
            None => format!("{}{}", route.target, path),
        };
        url.parse().map_err(|e| UpstreamFailure {
            kind: FailureKind::Other,
            message: format!("invalid upstream url {url}: {e}"),
        })
    }

    fn is_internal(&self, name: &HeaderName) -> bool {
        (!self.internal_header_prefix.is_empty()
            && name.as_str().starts_with(&self.internal_header_prefix))
            || self.strip_headers.contains(name)
    }

    /// Headers as the backend should see them.
    pub fn forward_headers(&self, headers: &HeaderMap, client: SocketAddr) -> HeaderMap {
        let mut out = HeaderMap::with_capacity(headers.len() + 2);
        for (name, value) in headers {
            if *name == HOST || is_hop_by_hop(name.as_str()) || self.is_internal(name) {
                continue;
            }
            out.append(name.clone(), value.clone());
        }

        let client_ip = client.ip().to_string();
        let forwarded_for = match headers.get(X_FORWARDED_FOR).and_then(|v| v.to_str().ok()) {
            Some(prior) if !prior.trim().is_empty() => format!("{prior}, {client_ip}"),
            _ => client_ip,
        };
        if let Ok(value) = HeaderValue::from_str(&forwarded_for) {
            out.insert(X_FORWARDED_FOR, value);
        }
        if let Some(host) = headers.get(HOST) {
            out.insert(X_FORWARDED_HOST, host.clone());
        }
        out
    }

    /// Send `request` to `route`'s backend under the route deadline.
    pub async fn forward(
        &self,
        request: BufferedRequest,
        route: &Route,
        client: SocketAddr,
    ) -> Result<Response, UpstreamFailure> {
        let uri = Self::target_uri(route, &request.uri)?;
        let headers = self.forward_headers(&request.headers, client);

        let mut outbound = Request::new(Body::from(request.body));
        *outbound.method_mut() = request.method;
        *outbound.uri_mut() = uri;
        *outbound.headers_mut() = headers;

        match with_deadline(route.timeout, self.client.request(outbound)).await {
            Ok(Ok(response)) => {
                let (mut parts, body) = response.into_parts();
                strip_hop_by_hop(&mut parts.headers);
                Ok(Response::from_parts(parts, idle_bounded(Body::new(body), route.timeout)))
            }
            Ok(Err(e)) => Err(UpstreamFailure::from_client_error(&e)),
            Err(deadline) => Err(UpstreamFailure {
                kind: FailureKind::Timeout,
                message: deadline.to_string(),
            }),
        }
    }

    /// The client-facing error for a failed call.
    pub fn failure_error(&self, route: &Route, failure: UpstreamFailure) -> GatewayError {
        if failure.kind == FailureKind::Timeout && !self.uniform_failure_status {
            return GatewayError::BackendTimeout {
                service: route.name.clone(),
                timeout: route.timeout,
            };
        }
        GatewayError::BackendUnavailable {
            service: route.name.clone(),
            kind: failure.kind,
            message: failure.message,
        }
    }
}
