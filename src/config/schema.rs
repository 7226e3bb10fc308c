//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files, and
//! every section falls back to defaults so a minimal file is enough.

use serde::{Deserialize, Serialize};

/// Secret for unit tests; real deployments must supply their own.
#[cfg(test)]
pub(crate) const TEST_TOKEN_SECRET: &str =
    "unit-test-secret-unit-test-secret-unit-test-secret-unit-test-secret-0123456789";

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Token verification and public route settings.
    pub auth: AuthConfig,

    /// Role requirements for mutating endpoints.
    pub authorization: AuthorizationConfig,

    /// Per-identity rate limiting.
    pub rate_limit: RateLimitConfig,

    /// Upstream routes, path prefix to backend address.
    pub routes: Vec<RouteConfig>,

    /// Cross-origin policy for browser clients.
    pub cors: CorsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment timeout for upstream calls, in seconds.
    pub connect_secs: u64,

    /// Total time allowed for an upstream call to produce response headers.
    pub upstream_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            upstream_secs: 30,
        }
    }
}

/// Authentication configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Path fragments that mark a route as public. Matched as substrings.
    pub public_routes: Vec<String>,

    /// Shared HMAC secret, identical on the issuing side. No default: it
    /// must come from the file or `GATEWAY_TOKEN_SECRET`.
    pub token_secret: String,

    /// Lifetime of issued tokens in seconds.
    pub token_ttl_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            public_routes: vec![
                "/api/users/register".to_string(),
                "/api/users/login".to_string(),
                "/eureka".to_string(),
                "/actuator".to_string(),
            ],
            token_secret: String::new(),
            token_ttl_secs: 86_400,
        }
    }
}

/// A single role requirement.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct AuthorizationRuleConfig {
    /// Path prefix the rule protects.
    pub path_prefix: String,

    /// HTTP methods the rule applies to.
    pub methods: Vec<String>,

    /// Role the caller must hold, with or without the role prefix.
    pub required_role: String,
}

/// Authorization configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthorizationConfig {
    /// Role requirements, all of which must hold when they apply.
    pub rules: Vec<AuthorizationRuleConfig>,

    /// Path fragments never subject to role checks (login, register).
    pub exempt_paths: Vec<String>,

    /// Marker some issuers put in front of role names ("ROLE_ADMIN").
    pub role_prefix: String,
}

impl Default for AuthorizationConfig {
    fn default() -> Self {
        let mutating = || {
            vec!["POST".to_string(), "PUT".to_string(), "DELETE".to_string()]
        };
        Self {
            rules: vec![
                AuthorizationRuleConfig {
                    path_prefix: "/api/books".to_string(),
                    methods: mutating(),
                    required_role: "ADMIN".to_string(),
                },
                AuthorizationRuleConfig {
                    path_prefix: "/api/users".to_string(),
                    methods: mutating(),
                    required_role: "ADMIN".to_string(),
                },
            ],
            exempt_paths: vec!["/login".to_string(), "/register".to_string()],
            role_prefix: "ROLE_".to_string(),
        }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Bucket capacity (maximum burst).
    pub capacity: u32,

    /// Tokens added back per window.
    pub refill_tokens: u32,

    /// Refill window in seconds.
    pub window_secs: u64,

    /// Interval for sweeping fully refilled idle buckets. 0 disables sweeping.
    pub sweep_interval_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            capacity: 10,
            refill_tokens: 10,
            window_secs: 60,
            sweep_interval_secs: 0,
        }
    }
}

/// Route configuration mapping a path prefix to an upstream service.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Route identifier for logging/metrics.
    pub name: String,

    /// Path prefix to match.
    pub path_prefix: String,

    /// Upstream address (e.g., "127.0.0.1:8081").
    pub upstream: String,

    /// Route priority (higher = checked first).
    #[serde(default)]
    pub priority: u32,
}

/// CORS configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Enable the CORS layer.
    pub enabled: bool,

    /// Exact origins allowed to call the gateway from a browser.
    pub allowed_origins: Vec<String>,

    /// Methods allowed in cross-origin requests.
    pub allowed_methods: Vec<String>,

    /// Whether cookies and credentials may be sent.
    pub allow_credentials: bool,

    /// Preflight cache lifetime in seconds.
    pub max_age_secs: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            allowed_origins: vec!["http://localhost:3000".to_string()],
            allowed_methods: ["GET", "POST", "PUT", "DELETE", "OPTIONS"]
                .iter()
                .map(|m| m.to_string())
                .collect(),
            allow_credentials: true,
            max_age_secs: 3600,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
