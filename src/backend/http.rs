//! HTTP upstream backend.
//!
//! # Responsibilities
//! - Pick the upstream for a path from the route table
//! - Rewrite the request URI to the upstream authority
//! - Stream the body through without buffering
//! - Bound the call with the upstream timeout
//!
//! # Design Decisions
//! - No retries: every failure is surfaced to the caller
//! - Dropping the returned future (client went away) abandons the upstream call

use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{
        uri::{PathAndQuery, Scheme},
        Request, Uri,
    },
    response::Response,
};
use hyper::body::Incoming;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};

use crate::backend::{Backend, BackendError};
use crate::config::GatewayConfig;
use crate::routing::RouteTable;
use crate::security::identity::IdentityContext;

/// Forwards requests to HTTP upstreams chosen by path prefix.
#[derive(Clone)]
pub struct HttpBackend {
    routes: RouteTable,
    client: Client<HttpConnector, Body>,
    timeout: Duration,
}

impl HttpBackend {
    pub fn new(routes: RouteTable, connect_timeout: Duration, timeout: Duration) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(connect_timeout));
        let client = Client::builder(TokioExecutor::new()).build(connector);

        Self {
            routes,
            client,
            timeout,
        }
    }

    pub fn from_config(config: &GatewayConfig) -> Self {
        let routes = RouteTable::from_config(&config.routes);
        if routes.is_empty() {
            tracing::warn!("No upstream routes configured; admitted requests will get 404");
        }
        Self::new(
            routes,
            Duration::from_secs(config.timeouts.connect_secs),
            Duration::from_secs(config.timeouts.upstream_secs),
        )
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn forward(
        &self,
        request: Request<Body>,
        identity: &IdentityContext,
    ) -> Result<Response, BackendError> {
        let path = request.uri().path().to_string();
        let route = self
            .routes
            .match_path(&path)
            .ok_or_else(|| BackendError::NoRoute(path.clone()))?;

        let (mut parts, body) = request.into_parts();

        // URI rewrite
        let mut uri_parts = parts.uri.clone().into_parts();
        uri_parts.scheme = Some(Scheme::HTTP);
        uri_parts.authority = Some(route.upstream.clone());
        if uri_parts.path_and_query.is_none() {
            uri_parts.path_and_query = Some(PathAndQuery::from_static("/"));
        }
        parts.uri = Uri::from_parts(uri_parts).map_err(|e| BackendError::InvalidRequest(e.to_string()))?;

        tracing::debug!(
            route = %route.name,
            upstream = %route.upstream,
            subject = identity.subject().unwrap_or("-"),
            "Forwarding request"
        );

        let request = Request::from_parts(parts, body);
        match tokio::time::timeout(self.timeout, self.client.request(request)).await {
            Ok(Ok(response)) => Ok(into_response(response)),
            Ok(Err(e)) => Err(BackendError::Unreachable(format!("{}: {}", route.upstream, e))),
            Err(_) => Err(BackendError::Timeout(self.timeout)),
        }
    }
}

/// Re-box the upstream body so it streams back through axum unbuffered.
fn into_response(response: hyper::Response<Incoming>) -> Response {
    let (parts, body) = response.into_parts();
    Response::from_parts(parts, Body::new(body))
}
