//! Request pipeline orchestration.
//!
//! # Data Flow
//! ```text
//! RECEIVED
//!     → correlate (propagate or generate X-Correlation-ID, never fails)
//!     → classify_route (public or protected)
//!     → authenticate (protected only; 401 on any token problem)
//!     → admit (per-identity bucket; 429)
//!     → authorize (role check; 403)
//!     → forward (backend collaborator; 502/504 on failure)
//!     → respond (correlation id on every response)
//! ```
//!
//! # Design Decisions
//! - Stages are plain functions in a fixed table, run by one loop
//! - Identity travels in the per-request context, never in shared state
//! - No lock is held across the forward await

pub mod context;
pub mod stages;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    http::{request::Parts, Request},
    response::Response,
};
use tracing::Instrument;

use crate::backend::Backend;
use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::http::request::{tag_response, CorrelationId};
use crate::observability::metrics;
use crate::security::{headers, AuthorizationPolicy, RateLimiter, RouteClassifier, TokenCodec};

pub use context::{RequestContext, StageResult};
pub use stages::{Stage, STAGES};

/// The gateway's filter chain plus the backend it forwards to.
pub struct Pipeline {
    classifier: RouteClassifier,
    codec: Arc<TokenCodec>,
    limiter: Arc<RateLimiter>,
    policy: AuthorizationPolicy,
    backend: Arc<dyn Backend>,
}

impl Pipeline {
    pub fn new(
        classifier: RouteClassifier,
        codec: Arc<TokenCodec>,
        limiter: Arc<RateLimiter>,
        policy: AuthorizationPolicy,
        backend: Arc<dyn Backend>,
    ) -> Self {
        Self {
            classifier,
            codec,
            limiter,
            policy,
            backend,
        }
    }

    pub fn from_config(config: &GatewayConfig, backend: Arc<dyn Backend>) -> Self {
        Self::new(
            RouteClassifier::from_config(&config.auth),
            Arc::new(TokenCodec::from_config(&config.auth)),
            Arc::new(RateLimiter::from_config(&config.rate_limit)),
            AuthorizationPolicy::from_config(&config.authorization),
            backend,
        )
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// Run every stage in order, stopping at the first terminal result.
    pub fn evaluate(&self, parts: &Parts, mut ctx: RequestContext) -> Result<RequestContext, GatewayError> {
        for (name, stage) in STAGES.iter() {
            ctx = match stage(self, parts, ctx) {
                StageResult::Continue(next) => next,
                StageResult::Terminal(rejection) => {
                    tracing::debug!(stage = *name, "Pipeline short-circuited");
                    return Err(rejection);
                }
            };
        }
        Ok(ctx)
    }

    /// Handle one inbound request end to end.
    pub async fn handle(&self, request: Request<Body>, remote_addr: Option<SocketAddr>) -> Response {
        let started = Instant::now();
        let (parts, body) = request.into_parts();
        let correlation_id = CorrelationId::from_headers(&parts.headers);

        let span = tracing::info_span!(
            "request",
            correlation_id = %correlation_id,
            method = %parts.method,
            path = %parts.uri.path(),
        );

        async move {
            let ctx = RequestContext::new(correlation_id.clone(), remote_addr);

            let response = match self.evaluate(&parts, ctx) {
                Ok(ctx) => self.forward(parts, body, ctx).await,
                Err(rejection) => {
                    rejection.log();
                    metrics::record_rejection(rejection.error_code());
                    rejection.render(&correlation_id)
                }
            };

            let response = tag_response(response, &correlation_id);
            metrics::record_request(response.status().as_u16(), started);
            response
        }
        .instrument(span)
        .await
    }

    async fn forward(&self, mut parts: Parts, body: Body, ctx: RequestContext) -> Response {
        headers::prepare_upstream(
            &mut parts.headers,
            &ctx.identity,
            &ctx.correlation_id,
            ctx.remote_addr,
        );
        let request = Request::from_parts(parts, body);

        match self.backend.forward(request, &ctx.identity).await {
            Ok(response) => response,
            Err(e) => {
                let rejection = GatewayError::from(e);
                rejection.log();
                metrics::record_rejection(rejection.error_code());
                rejection.render(&ctx.correlation_id)
            }
        }
    }
}
