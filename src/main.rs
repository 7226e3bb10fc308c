//! Edge Gateway
//!
//! Filters every inbound request before it reaches a backend service.
//!
//! # Architecture Overview
//!
//! ```text
//!                  ┌───────────────────────────────────────────────────────────────┐
//!                  │                        EDGE GATEWAY                           │
//!                  │                                                               │
//!  Client Request  │  ┌─────────────┐   ┌──────────┐   ┌──────────────┐            │
//!  ────────────────┼─▶│ correlation │──▶│   CORS   │──▶│   classify   │            │
//!                  │  │     id      │   │          │   │ public/prot. │            │
//!                  │  └─────────────┘   └──────────┘   └──────┬───────┘            │
//!                  │                                          ▼                    │
//!                  │  ┌─────────────┐   ┌──────────┐   ┌──────────────┐            │
//!                  │  │  authorize  │◀──│  admit   │◀──│ authenticate │            │
//!                  │  │   (roles)   │   │ (bucket) │   │   (HS512)    │            │
//!                  │  └──────┬──────┘   └──────────┘   └──────────────┘            │
//!                  │         ▼                                                     │
//!  Client Response │  ┌─────────────┐                                              │
//!  ◀───────────────┼──│   backend   │◀─────────────────────────────────────────────┼──── Upstream
//!                  │  └─────────────┘                                              │
//!                  └───────────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use edge_gateway::config::load_or_default;
use edge_gateway::lifecycle::{wait_for_signal, Shutdown};
use edge_gateway::observability::{logging, metrics};
use edge_gateway::HttpServer;

#[derive(Parser)]
#[command(name = "edge-gateway")]
#[command(about = "Authenticating, rate-limiting edge gateway", long_about = None)]
struct Args {
    /// Path to the TOML configuration file. Defaults apply when omitted.
    #[arg(short, long, env = "GATEWAY_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = load_or_default(args.config.as_deref())?;

    logging::init(&config.observability.log_level);
    tracing::info!("edge-gateway v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        routes = config.routes.len(),
        public_routes = config.auth.public_routes.len(),
        rate_limit_capacity = config.rate_limit.capacity,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        wait_for_signal().await;
        trigger.trigger();
    });

    HttpServer::new(config).run(listener, shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
