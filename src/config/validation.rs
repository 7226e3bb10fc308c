//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (ttl > 0, bucket sizes > 0)
//! - Check that the signing secret is long enough for HS512
//! - Check that upstreams, methods and origins parse
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>

use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

use axum::http::{uri::Authority, HeaderValue, Method};

use crate::config::schema::GatewayConfig;

/// Minimum secret length in bytes for HMAC-SHA512 keys.
pub const MIN_SECRET_BYTES: usize = 64;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Check a parsed configuration for semantic errors.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    if config.timeouts.upstream_secs == 0 {
        errors.push(ValidationError::new("timeouts.upstream_secs", "must be greater than 0"));
    }

    if config.auth.token_secret.is_empty() {
        errors.push(ValidationError::new(
            "auth.token_secret",
            "must be set in the config file or GATEWAY_TOKEN_SECRET",
        ));
    } else if config.auth.token_secret.len() < MIN_SECRET_BYTES {
        errors.push(ValidationError::new(
            "auth.token_secret",
            format!("must be at least {} bytes for HS512", MIN_SECRET_BYTES),
        ));
    }
    if config.auth.token_ttl_secs == 0 {
        errors.push(ValidationError::new("auth.token_ttl_secs", "must be greater than 0"));
    }
    if config.auth.public_routes.iter().any(|p| p.is_empty()) {
        // An empty pattern is a substring of every path.
        errors.push(ValidationError::new(
            "auth.public_routes",
            "empty pattern would make every route public",
        ));
    }

    for (i, rule) in config.authorization.rules.iter().enumerate() {
        if rule.path_prefix.is_empty() {
            errors.push(ValidationError::new(
                format!("authorization.rules[{}].path_prefix", i),
                "must not be empty",
            ));
        }
        if rule.required_role.is_empty() {
            errors.push(ValidationError::new(
                format!("authorization.rules[{}].required_role", i),
                "must not be empty",
            ));
        }
        for method in &rule.methods {
            if Method::from_str(method).is_err() {
                errors.push(ValidationError::new(
                    format!("authorization.rules[{}].methods", i),
                    format!("'{}' is not an HTTP method", method),
                ));
            }
        }
    }

    let rl = &config.rate_limit;
    if rl.capacity == 0 {
        errors.push(ValidationError::new("rate_limit.capacity", "must be greater than 0"));
    }
    if rl.refill_tokens == 0 {
        errors.push(ValidationError::new("rate_limit.refill_tokens", "must be greater than 0"));
    }
    if rl.window_secs == 0 {
        errors.push(ValidationError::new("rate_limit.window_secs", "must be greater than 0"));
    }

    for (i, route) in config.routes.iter().enumerate() {
        if !route.path_prefix.starts_with('/') {
            errors.push(ValidationError::new(
                format!("routes[{}].path_prefix", i),
                "must start with '/'",
            ));
        }
        if Authority::from_str(&route.upstream).is_err() {
            errors.push(ValidationError::new(
                format!("routes[{}].upstream", i),
                format!("'{}' is not a host:port authority", route.upstream),
            ));
        }
    }

    let cors = &config.cors;
    if cors.enabled {
        for origin in &cors.allowed_origins {
            if origin == "*" && cors.allow_credentials {
                errors.push(ValidationError::new(
                    "cors.allowed_origins",
                    "wildcard origin cannot be combined with credentials",
                ));
            } else if HeaderValue::from_str(origin).is_err() {
                errors.push(ValidationError::new(
                    "cors.allowed_origins",
                    format!("'{}' is not a valid origin", origin),
                ));
            }
        }
        for method in &cors.allowed_methods {
            if Method::from_str(method).is_err() {
                errors.push(ValidationError::new(
                    "cors.allowed_methods",
                    format!("'{}' is not an HTTP method", method),
                ));
            }
        }
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{AuthorizationRuleConfig, RouteConfig, TEST_TOKEN_SECRET};

    fn config_with_secret() -> GatewayConfig {
        let mut config = GatewayConfig::default();
        config.auth.token_secret = TEST_TOKEN_SECRET.to_string();
        config
    }

    #[test]
    fn test_defaults_with_secret_are_valid() {
        assert_eq!(validate_config(&config_with_secret()), Ok(()));
    }

    #[test]
    fn test_missing_secret_fails_closed() {
        let errors = validate_config(&GatewayConfig::default()).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "auth.token_secret");
        assert!(errors[0].message.contains("GATEWAY_TOKEN_SECRET"));
    }

    #[test]
    fn test_short_secret_rejected() {
        let mut config = GatewayConfig::default();
        config.auth.token_secret = "too-short".to_string();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "auth.token_secret");
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = config_with_secret();
        config.auth.token_ttl_secs = 0;
        config.rate_limit.capacity = 0;
        config.routes.push(RouteConfig {
            name: "bad".into(),
            path_prefix: "api".into(),
            upstream: "not an authority".into(),
            priority: 0,
        });
        config.authorization.rules.push(AuthorizationRuleConfig {
            path_prefix: "/api/loans".into(),
            methods: vec!["FETCH IT".into()],
            required_role: "ADMIN".into(),
        });

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert!(fields.contains(&"auth.token_ttl_secs"));
        assert!(fields.contains(&"rate_limit.capacity"));
        assert!(fields.contains(&"routes[0].path_prefix"));
        assert!(fields.contains(&"routes[0].upstream"));
        assert!(fields.contains(&"authorization.rules[2].methods"));
    }

    #[test]
    fn test_empty_public_pattern_rejected() {
        let mut config = config_with_secret();
        config.auth.public_routes.push(String::new());
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_wildcard_origin_with_credentials_rejected() {
        let mut config = config_with_secret();
        config.cors.allowed_origins = vec!["*".into()];
        assert!(validate_config(&config).is_err());

        config.cors.allow_credentials = false;
        assert!(validate_config(&config).is_ok());
    }
}
