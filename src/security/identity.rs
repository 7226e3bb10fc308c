//! Per-request identity derived from a verified token or the caller's address.

use std::net::{IpAddr, SocketAddr};

use crate::security::token::Claims;

/// Rate-limit key used when neither a subject nor an address is known.
pub const UNKNOWN_KEY: &str = "unknown";

/// Who is making the current request.
///
/// Built once per request by the pipeline and passed by value or reference
/// along that request's own path. Never stored globally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityContext {
    /// Caller presented a valid bearer token.
    Authenticated {
        subject: String,
        role: String,
        user_id: Option<i64>,
        email: Option<String>,
    },
    /// Caller is unauthenticated; only the network address is known.
    Anonymous { remote_ip: Option<IpAddr> },
}

impl IdentityContext {
    pub fn anonymous(remote_addr: Option<SocketAddr>) -> Self {
        IdentityContext::Anonymous {
            remote_ip: remote_addr.map(|a| a.ip()),
        }
    }

    pub fn from_claims(claims: Claims) -> Self {
        IdentityContext::Authenticated {
            subject: claims.sub,
            role: claims.role,
            user_id: claims.user_id,
            email: claims.email,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, IdentityContext::Authenticated { .. })
    }

    pub fn subject(&self) -> Option<&str> {
        match self {
            IdentityContext::Authenticated { subject, .. } => Some(subject),
            IdentityContext::Anonymous { .. } => None,
        }
    }

    /// Role held by the caller. Anonymous callers hold none.
    pub fn role(&self) -> Option<&str> {
        match self {
            IdentityContext::Authenticated { role, .. } => Some(role),
            IdentityContext::Anonymous { .. } => None,
        }
    }

    /// Key partitioning rate-limit state: subject, else remote IP, else "unknown".
    pub fn rate_limit_key(&self) -> String {
        match self {
            IdentityContext::Authenticated { subject, .. } => subject.clone(),
            IdentityContext::Anonymous { remote_ip: Some(ip) } => ip.to_string(),
            IdentityContext::Anonymous { remote_ip: None } => UNKNOWN_KEY.to_string(),
        }
    }
}
