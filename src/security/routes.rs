//! Public route classification.
//!
//! A path is public when it contains any configured pattern as a substring.
//! Substring rather than prefix matching is kept for compatibility with the
//! existing deployment, so `/api/x/eureka-info` is public because it contains
//! `/eureka`.

use crate::config::AuthConfig;

/// Decides whether a request path needs a bearer token.
#[derive(Debug, Clone)]
pub struct RouteClassifier {
    public_patterns: Vec<String>,
}

impl RouteClassifier {
    pub fn new(public_patterns: Vec<String>) -> Self {
        Self { public_patterns }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(config.public_routes.clone())
    }

    pub fn is_public(&self, path: &str) -> bool {
        self.public_patterns.iter().any(|p| path.contains(p.as_str()))
    }

    pub fn requires_auth(&self, path: &str) -> bool {
        !self.is_public(path)
    }
}
