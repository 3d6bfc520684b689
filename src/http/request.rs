//! Request inspection helpers.
//!
//! # Design Decisions
//! - Request ID added as early as possible (tower-http layer) for tracing
//! - Callers that omit the client instance header share one fallback identity

use axum::http::{HeaderMap, HeaderName, HeaderValue, Request};
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

pub const X_REQUEST_ID: &str = "x-request-id";

/// Instance id used when a caller does not send one.
pub const UNKNOWN_CLIENT: &str = "unknown-client";

pub fn x_request_id() -> HeaderName {
    HeaderName::from_static(X_REQUEST_ID)
}

/// UUID v4 ids for requests that arrive without one.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeGatewayRequestId;

impl MakeRequestId for MakeGatewayRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// The request id set by the request-id layer.
pub fn request_id(headers: &HeaderMap) -> &str {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

/// The caller's client instance, read from `header`.
pub fn client_instance<'a>(headers: &'a HeaderMap, header: &str) -> &'a str {
    headers
        .get(header)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(UNKNOWN_CLIENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_instance_falls_back() {
        let mut headers = HeaderMap::new();
        assert_eq!(client_instance(&headers, "x-client-instance"), UNKNOWN_CLIENT);

        headers.insert("x-client-instance", HeaderValue::from_static("  "));
        assert_eq!(client_instance(&headers, "x-client-instance"), UNKNOWN_CLIENT);

        headers.insert("x-client-instance", HeaderValue::from_static("tab-42"));
        assert_eq!(client_instance(&headers, "x-client-instance"), "tab-42");
    }

    #[test]
    fn generated_ids_are_uuids() {
        let request = Request::new(());
        let id = MakeGatewayRequestId.make_request_id(&request).unwrap();
        let text = id.header_value().to_str().unwrap();
        assert!(Uuid::parse_str(text).is_ok());
    }

    #[test]
    fn request_id_reads_header() {
        let mut headers = HeaderMap::new();
        assert_eq!(request_id(&headers), "unknown");
        headers.insert(X_REQUEST_ID, HeaderValue::from_static("abc"));
        assert_eq!(request_id(&headers), "abc");
    }
}
