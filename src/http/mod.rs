//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, layers, connect info)
//!     → request.rs (correlation id on request and response)
//!     → cors.rs (browser preflight and headers)
//!     → pipeline (filter stages, then the backend)
//!     → Send to client
//! ```

pub mod cors;
pub mod request;
pub mod server;

pub use request::{CorrelationId, X_CORRELATION_ID};
pub use server::{AppState, HttpServer};
