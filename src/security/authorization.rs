//! Role-based authorization for mutating endpoints.
//!
//! # Responsibilities
//! - Match requests against (path prefix, methods, required role) rules
//! - Treat "ADMIN" and "ROLE_ADMIN" as the same authority
//! - Exempt login and registration paths from role checks
//!
//! # Design Decisions
//! - Pure decision function; no I/O, no shared state
//! - Anonymous callers hold no role and fail every applicable rule
//! - Requests matching no rule are allowed

use std::str::FromStr;

use axum::http::Method;

use crate::config::{AuthorizationConfig, AuthorizationRuleConfig};
use crate::security::identity::IdentityContext;

/// A compiled role requirement.
#[derive(Debug, Clone)]
pub struct AuthorizationRule {
    path_prefix: String,
    methods: Vec<Method>,
    required_role: String,
}

impl AuthorizationRule {
    pub fn new(path_prefix: impl Into<String>, methods: Vec<Method>, required_role: impl Into<String>) -> Self {
        Self {
            path_prefix: path_prefix.into(),
            methods,
            required_role: required_role.into(),
        }
    }

    fn from_config(config: &AuthorizationRuleConfig) -> Self {
        let methods = config
            .methods
            .iter()
            .filter_map(|m| match Method::from_str(&m.to_ascii_uppercase()) {
                Ok(method) => Some(method),
                Err(_) => {
                    tracing::warn!(method = %m, prefix = %config.path_prefix, "Ignoring invalid method in authorization rule");
                    None
                }
            })
            .collect();
        Self::new(config.path_prefix.clone(), methods, config.required_role.clone())
    }

    fn applies_to(&self, path: &str, method: &Method) -> bool {
        path.starts_with(&self.path_prefix) && self.methods.contains(method)
    }
}

/// Decides whether an identity may perform a method on a path.
#[derive(Debug, Clone)]
pub struct AuthorizationPolicy {
    rules: Vec<AuthorizationRule>,
    exempt_paths: Vec<String>,
    role_prefix: String,
}

impl AuthorizationPolicy {
    pub fn new(rules: Vec<AuthorizationRule>, exempt_paths: Vec<String>, role_prefix: impl Into<String>) -> Self {
        Self {
            rules,
            exempt_paths,
            role_prefix: role_prefix.into(),
        }
    }

    pub fn from_config(config: &AuthorizationConfig) -> Self {
        Self::new(
            config.rules.iter().map(AuthorizationRule::from_config).collect(),
            config.exempt_paths.clone(),
            config.role_prefix.clone(),
        )
    }

    pub fn is_allowed(&self, identity: &IdentityContext, path: &str, method: &Method) -> bool {
        if self.is_exempt(path) {
            return true;
        }

        self.rules
            .iter()
            .filter(|rule| rule.applies_to(path, method))
            .all(|rule| self.holds_role(identity, &rule.required_role))
    }

    fn is_exempt(&self, path: &str) -> bool {
        self.exempt_paths.iter().any(|p| path.contains(p.as_str()))
    }

    fn holds_role(&self, identity: &IdentityContext, required: &str) -> bool {
        match identity.role() {
            Some(held) => self.normalize(held) == self.normalize(required),
            None => false,
        }
    }

    fn normalize<'a>(&self, role: &'a str) -> &'a str {
        if self.role_prefix.is_empty() {
            return role;
        }
        role.strip_prefix(self.role_prefix.as_str()).unwrap_or(role)
    }
}
