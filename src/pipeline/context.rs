//! Per-request pipeline state.

use std::net::SocketAddr;

use crate::error::GatewayError;
use crate::http::request::CorrelationId;
use crate::security::identity::IdentityContext;

/// State threaded through the stages of one request.
///
/// Owned by that request alone; stages take it by value and hand back an
/// updated copy, so nothing about one caller can leak into another.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub correlation_id: CorrelationId,
    pub remote_addr: Option<SocketAddr>,
    /// Set by route classification; defaults to protected.
    pub requires_auth: bool,
    pub identity: IdentityContext,
}

impl RequestContext {
    pub fn new(correlation_id: CorrelationId, remote_addr: Option<SocketAddr>) -> Self {
        Self {
            correlation_id,
            remote_addr,
            requires_auth: true,
            identity: IdentityContext::anonymous(remote_addr),
        }
    }
}

/// Outcome of a single stage.
#[derive(Debug)]
pub enum StageResult {
    /// Proceed to the next stage with the (possibly updated) context.
    Continue(RequestContext),
    /// Stop here; the error becomes the response.
    Terminal(GatewayError),
}
