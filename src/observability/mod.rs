//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Pipeline and background tasks produce:
//!     → logging.rs (structured log events, correlation id on the request span)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout (fmt subscriber)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Correlation id is a span field, so every event inside a request carries it
//! - Metric updates are no-ops until a recorder is installed

pub mod logging;
pub mod metrics;
