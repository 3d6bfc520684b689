//! Request size limits.
//!
//! # Design Decisions
//! - A declared `Content-Length` over the limit is rejected before reading
//! - Chunked bodies are read up to the limit and rejected once they cross it
//! - Either way no backend call happens

use axum::{
    body::{Body, Bytes},
    http::{header::CONTENT_LENGTH, HeaderMap},
};
use http_body_util::LengthLimitError;

use crate::http::response::GatewayError;

/// Declared body length, if the header is present and numeric.
pub fn declared_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

/// Buffer `body` fully, refusing anything larger than `limit` bytes.
pub async fn read_limited(headers: &HeaderMap, body: Body, limit: usize) -> Result<Bytes, GatewayError> {
    if let Some(len) = declared_length(headers) {
        if len > limit as u64 {
            return Err(GatewayError::PayloadTooLarge { limit });
        }
    }

    axum::body::to_bytes(body, limit).await.map_err(|e| {
        let inner = e.into_inner();
        if inner.downcast_ref::<LengthLimitError>().is_some() {
            GatewayError::PayloadTooLarge { limit }
        } else {
            GatewayError::Internal(format!("failed to read request body: {inner}"))
        }
    })
}
