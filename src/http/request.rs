//! Correlation id handling.
//!
//! # Responsibilities
//! - Propagate an inbound `X-Correlation-ID` or generate a UUID v4
//! - Make sure every response, including ones produced by outer layers
//!   such as CORS preflight, carries the id
//!
//! # Design Decisions
//! - The id is assigned before anything else can reject the request
//! - Once assigned it is never changed for the life of the request

use std::fmt;

use axum::{
    body::Body,
    http::{HeaderMap, HeaderName, HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

pub const X_CORRELATION_ID: HeaderName = HeaderName::from_static("x-correlation-id");

/// Opaque per-request identifier propagated end to end.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct CorrelationId(HeaderValue);

impl CorrelationId {
    /// Fresh UUID v4 id.
    pub fn generate() -> Self {
        let id = Uuid::new_v4().to_string();
        // A hyphenated UUID is always a valid header value.
        Self(HeaderValue::from_str(&id).unwrap_or_else(|_| HeaderValue::from_static("invalid")))
    }

    /// Take the inbound id when present and non-empty, otherwise generate one.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        headers
            .get(X_CORRELATION_ID)
            .filter(|v| v.to_str().map(|s| !s.trim().is_empty()).unwrap_or(false))
            .map(|v| Self(v.clone()))
            .unwrap_or_else(Self::generate)
    }

    pub fn as_str(&self) -> &str {
        // Only constructed from values that passed `to_str`.
        self.0.to_str().unwrap_or_default()
    }

    pub fn header_value(&self) -> HeaderValue {
        self.0.clone()
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CorrelationId({})", self.as_str())
    }
}

/// Set the correlation header on a response, replacing any upstream value.
pub fn tag_response(mut response: Response, correlation_id: &CorrelationId) -> Response {
    response
        .headers_mut()
        .insert(X_CORRELATION_ID, correlation_id.header_value());
    response
}

/// Outermost middleware: pins the correlation id on the request so inner
/// layers and the pipeline agree on it, and tags whatever response comes back.
pub async fn correlation_middleware(mut request: Request<Body>, next: Next) -> Response {
    let correlation_id = CorrelationId::from_headers(request.headers());
    request
        .headers_mut()
        .insert(X_CORRELATION_ID, correlation_id.header_value());

    let response = next.run(request).await;
    tag_response(response, &correlation_id)
}
