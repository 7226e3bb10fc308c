//! Upstream route lookup.
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - Ordered by priority, then by longest prefix
//! - Explicit no-match rather than silent default

use std::str::FromStr;

use axum::http::uri::Authority;

use crate::config::RouteConfig;
use crate::routing::matcher::PathPrefixMatcher;

/// A compiled route.
#[derive(Debug, Clone)]
pub struct Route {
    pub name: String,
    pub matcher: PathPrefixMatcher,
    pub upstream: Authority,
    pub priority: u32,
}

/// Path-prefix route table.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    /// Compile routes from configuration. Entries with an unparsable upstream are skipped.
    pub fn from_config(configs: &[RouteConfig]) -> Self {
        let mut routes: Vec<Route> = configs
            .iter()
            .filter_map(|config| match Authority::from_str(&config.upstream) {
                Ok(upstream) => Some(Route {
                    name: config.name.clone(),
                    matcher: PathPrefixMatcher::new(config.path_prefix.clone()),
                    upstream,
                    priority: config.priority,
                }),
                Err(_) => {
                    tracing::warn!(route = %config.name, upstream = %config.upstream, "Invalid upstream address");
                    None
                }
            })
            .collect();

        routes.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then_with(|| b.matcher.prefix().len().cmp(&a.matcher.prefix().len()))
        });

        Self { routes }
    }

    pub fn match_path(&self, path: &str) -> Option<&Route> {
        self.routes.iter().find(|r| r.matcher.matches(path))
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(name: &str, prefix: &str, upstream: &str, priority: u32) -> RouteConfig {
        RouteConfig {
            name: name.into(),
            path_prefix: prefix.into(),
            upstream: upstream.into(),
            priority,
        }
    }

    #[test]
    fn test_longest_prefix_wins() {
        let table = RouteTable::from_config(&[
            route("api", "/api", "127.0.0.1:9000", 0),
            route("books", "/api/books", "127.0.0.1:8081", 0),
        ]);

        assert_eq!(table.match_path("/api/books/1").unwrap().name, "books");
        assert_eq!(table.match_path("/api/loans").unwrap().name, "api");
        assert!(table.match_path("/other").is_none());
    }

    #[test]
    fn test_priority_before_length() {
        let table = RouteTable::from_config(&[
            route("books", "/api/books", "127.0.0.1:8081", 0),
            route("catch-all", "/", "127.0.0.1:9000", 5),
        ]);

        assert_eq!(table.match_path("/api/books").unwrap().name, "catch-all");
    }

    #[test]
    fn test_invalid_upstream_skipped() {
        let table = RouteTable::from_config(&[route("bad", "/api", "not valid", 0)]);
        assert!(table.is_empty());
    }
}
