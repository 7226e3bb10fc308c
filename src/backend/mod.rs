//! Backend collaborator.
//!
//! The pipeline hands admitted requests to a [`Backend`] together with the
//! caller's identity. What sits behind it (an HTTP upstream, a test double)
//! is opaque to the pipeline.

pub mod http;

use std::time::Duration;

use async_trait::async_trait;
use axum::{body::Body, http::Request, response::Response};
use thiserror::Error;

use crate::security::identity::IdentityContext;

pub use self::http::HttpBackend;

/// Failures while forwarding. None of them are retried.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("no upstream route for {0}")]
    NoRoute(String),

    #[error("upstream unreachable: {0}")]
    Unreachable(String),

    #[error("upstream timed out after {0:?}")]
    Timeout(Duration),

    #[error("could not build upstream request: {0}")]
    InvalidRequest(String),
}

/// Forwards an admitted request and returns the upstream response unchanged.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn forward(
        &self,
        request: Request<Body>,
        identity: &IdentityContext,
    ) -> Result<Response, BackendError>;
}
