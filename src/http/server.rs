//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the catch-all gateway handler
//! - Wire up middleware (tracing, correlation id, CORS)
//! - Bind server to listener with client addresses available
//! - Start the bucket sweeper when enabled
//! - Drain in-flight requests on shutdown

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    middleware,
    response::Response,
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::backend::{Backend, HttpBackend};
use crate::config::GatewayConfig;
use crate::http::cors::cors_layer;
use crate::http::request::correlation_middleware;
use crate::lifecycle::Shutdown;
use crate::pipeline::Pipeline;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    config: GatewayConfig,
    pipeline: Arc<Pipeline>,
}

impl HttpServer {
    /// Create a server that forwards to the configured HTTP upstreams.
    pub fn new(config: GatewayConfig) -> Self {
        let backend = Arc::new(HttpBackend::from_config(&config));
        Self::with_backend(config, backend)
    }

    /// Create a server around an arbitrary backend.
    pub fn with_backend(config: GatewayConfig, backend: Arc<dyn Backend>) -> Self {
        let pipeline = Arc::new(Pipeline::from_config(&config, backend));
        let state = AppState {
            pipeline: pipeline.clone(),
        };

        let router = Self::build_router(&config, state);
        Self {
            router,
            config,
            pipeline,
        }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        let mut router = Router::new()
            .route("/{*path}", any(gateway_handler))
            .route("/", any(gateway_handler))
            .with_state(state);

        if config.cors.enabled {
            router = router.layer(cors_layer(&config.cors));
        }

        router
            .layer(middleware::from_fn(correlation_middleware))
            .layer(TraceLayer::new_for_http())
    }

    /// The fully layered router, for serving or driving in-process.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve until `shutdown` fires, then drain in-flight requests.
    pub async fn run(self, listener: TcpListener, shutdown: Shutdown) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let sweeper = if self.config.rate_limit.enabled && self.config.rate_limit.sweep_interval_secs > 0 {
            Some(self.pipeline.limiter().clone().spawn_sweeper(
                Duration::from_secs(self.config.rate_limit.sweep_interval_secs),
                shutdown.subscribe(),
            ))
        } else {
            None
        };

        let mut stop = shutdown.subscribe();
        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = stop.recv().await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .await?;

        if let Some(handle) = sweeper {
            let _ = handle.await;
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Catch-all handler: every request goes through the pipeline.
async fn gateway_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let remote_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    state.pipeline.handle(request, remote_addr).await
}
