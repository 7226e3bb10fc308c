//! Request-level error taxonomy.
//!
//! Every variant is a terminal, per-request decision. Nothing here is retried
//! and nothing is fatal to the process.

use std::time::Duration;

use axum::{
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::backend::BackendError;
use crate::http::request::{tag_response, CorrelationId};
use crate::security::token::TokenError;

#[derive(Debug, Error)]
pub enum GatewayError {
    // ===== Authentication =====
    #[error("missing or malformed bearer credentials")]
    AuthMissing,

    #[error("invalid token: {0}")]
    AuthInvalid(#[from] TokenError),

    // ===== Admission =====
    #[error("rate limit exceeded for {key}")]
    RateExceeded { key: String },

    // ===== Authorization =====
    #[error("{method} {path} not permitted for role {role}")]
    Forbidden {
        method: Method,
        path: String,
        role: String,
    },

    // ===== Upstream =====
    #[error("no upstream route for {0}")]
    NoRoute(String),

    #[error("upstream unreachable: {0}")]
    BackendUnreachable(String),

    #[error("upstream timed out after {0:?}")]
    UpstreamTimeout(Duration),
}

impl From<BackendError> for GatewayError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::NoRoute(path) => GatewayError::NoRoute(path),
            BackendError::Timeout(after) => GatewayError::UpstreamTimeout(after),
            BackendError::Unreachable(msg) | BackendError::InvalidRequest(msg) => {
                GatewayError::BackendUnreachable(msg)
            }
        }
    }
}

impl GatewayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::AuthMissing | GatewayError::AuthInvalid(_) => StatusCode::UNAUTHORIZED,
            GatewayError::RateExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            GatewayError::Forbidden { .. } => StatusCode::FORBIDDEN,
            GatewayError::NoRoute(_) => StatusCode::NOT_FOUND,
            GatewayError::BackendUnreachable(_) => StatusCode::BAD_GATEWAY,
            GatewayError::UpstreamTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    /// Stable code for clients and the `reason` metric label.
    pub fn error_code(&self) -> &'static str {
        match self {
            GatewayError::AuthMissing => "AUTH_MISSING",
            GatewayError::AuthInvalid(_) => "AUTH_INVALID",
            GatewayError::RateExceeded { .. } => "RATE_EXCEEDED",
            GatewayError::Forbidden { .. } => "FORBIDDEN",
            GatewayError::NoRoute(_) => "NO_ROUTE",
            GatewayError::BackendUnreachable(_) => "BACKEND_UNREACHABLE",
            GatewayError::UpstreamTimeout(_) => "UPSTREAM_TIMEOUT",
        }
    }

    /// Client-facing message; never includes token or upstream details.
    pub fn user_message(&self) -> &'static str {
        match self {
            GatewayError::AuthMissing => "Missing or malformed Authorization header",
            GatewayError::AuthInvalid(_) => "Invalid or expired token",
            GatewayError::RateExceeded { .. } => "Rate limit exceeded",
            GatewayError::Forbidden { .. } => "Insufficient role for this operation",
            GatewayError::NoRoute(_) => "No matching route found",
            GatewayError::BackendUnreachable(_) => "Upstream request failed",
            GatewayError::UpstreamTimeout(_) => "Upstream request timed out",
        }
    }

    /// Log this error with appropriate level and context.
    pub fn log(&self) {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, error_code = self.error_code(), status = status.as_u16(), "Upstream failure");
        } else {
            tracing::warn!(error = %self, error_code = self.error_code(), status = status.as_u16(), "Request rejected");
        }
    }

    /// Render the terminal response, tagged with the request's correlation id.
    pub fn render(&self, correlation_id: &CorrelationId) -> Response {
        let status = self.status_code();
        let body = json!({
            "error": self.user_message(),
            "error_code": self.error_code(),
            "status": status.as_u16(),
            "correlation_id": correlation_id.as_str(),
        });

        let mut response = (status, Json(body)).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        tag_response(response, correlation_id)
    }
}
