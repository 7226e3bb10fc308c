//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! gateway.toml (optional)
//!     → loader.rs (parse & deserialize, env overrides)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → handed to each subsystem at startup
//! ```
//!
//! # Design Decisions
//! - Config is static for the life of the process
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, load_or_default, ConfigError, TOKEN_SECRET_ENV};
pub use schema::{
    AuthConfig, AuthorizationConfig, AuthorizationRuleConfig, CorsConfig, GatewayConfig,
    ListenerConfig, ObservabilityConfig, RateLimitConfig, RouteConfig, TimeoutConfig,
};
