//! Identity and forwarding headers for upstream requests.
//!
//! # Responsibilities
//! - Strip identity headers supplied by the client
//! - Set identity headers from the verified identity
//! - Propagate the correlation id upstream
//! - Append the caller's address to X-Forwarded-For
//!
//! # Design Decisions
//! - Never trust inbound X-Auth-* headers; only the gateway sets them
//! - A value that cannot be encoded as a header is dropped, not forwarded raw

use std::net::SocketAddr;

use axum::http::{HeaderMap, HeaderName, HeaderValue};

use crate::http::request::{CorrelationId, X_CORRELATION_ID};
use crate::security::identity::IdentityContext;

pub const X_AUTH_SUBJECT: HeaderName = HeaderName::from_static("x-auth-subject");
pub const X_AUTH_ROLE: HeaderName = HeaderName::from_static("x-auth-role");
pub const X_AUTH_USER_ID: HeaderName = HeaderName::from_static("x-auth-user-id");
pub const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");

/// Rewrite `headers` for the upstream call.
pub fn prepare_upstream(
    headers: &mut HeaderMap,
    identity: &IdentityContext,
    correlation_id: &CorrelationId,
    remote_addr: Option<SocketAddr>,
) {
    headers.remove(&X_AUTH_SUBJECT);
    headers.remove(&X_AUTH_ROLE);
    headers.remove(&X_AUTH_USER_ID);

    if let IdentityContext::Authenticated {
        subject,
        role,
        user_id,
        ..
    } = identity
    {
        insert_text(headers, X_AUTH_SUBJECT, subject);
        insert_text(headers, X_AUTH_ROLE, role);
        if let Some(id) = user_id {
            headers.insert(X_AUTH_USER_ID, HeaderValue::from(*id));
        }
    }

    headers.insert(X_CORRELATION_ID, correlation_id.header_value());

    if let Some(addr) = remote_addr {
        let ip = addr.ip().to_string();
        let forwarded = match headers.get(&X_FORWARDED_FOR).and_then(|v| v.to_str().ok()) {
            Some(existing) if !existing.is_empty() => format!("{}, {}", existing, ip),
            _ => ip,
        };
        insert_text(headers, X_FORWARDED_FOR, &forwarded);
    }
}

fn insert_text(headers: &mut HeaderMap, name: HeaderName, value: &str) {
    match HeaderValue::from_str(value) {
        Ok(v) => {
            headers.insert(name, v);
        }
        Err(_) => {
            tracing::warn!(header = %name, "Dropping header value that cannot be encoded");
        }
    }
}
