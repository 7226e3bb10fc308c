//! The ordered filter stages.
//!
//! Order is fixed: classification decides whether authentication runs,
//! authentication must precede admission (an unauthenticated caller never
//! spends a user's quota) and admission precedes the role check.

use std::time::Instant;

use axum::http::{header, request::Parts};

use crate::error::GatewayError;
use crate::pipeline::context::{RequestContext, StageResult};
use crate::pipeline::Pipeline;
use crate::security::identity::IdentityContext;
use crate::security::token::unix_now;

/// Uniform stage signature.
pub type Stage = fn(&Pipeline, &Parts, RequestContext) -> StageResult;

/// Stages in execution order. Correlation happens before this list runs.
pub const STAGES: [(&str, Stage); 4] = [
    ("classify_route", classify_route as Stage),
    ("authenticate", authenticate as Stage),
    ("admit", admit as Stage),
    ("authorize", authorize as Stage),
];

const BEARER_PREFIX: &str = "Bearer ";

fn classify_route(pipeline: &Pipeline, parts: &Parts, mut ctx: RequestContext) -> StageResult {
    ctx.requires_auth = pipeline.classifier.requires_auth(parts.uri.path());
    tracing::debug!(requires_auth = ctx.requires_auth, "Route classified");
    StageResult::Continue(ctx)
}

fn authenticate(pipeline: &Pipeline, parts: &Parts, mut ctx: RequestContext) -> StageResult {
    if !ctx.requires_auth {
        return StageResult::Continue(ctx);
    }

    let token = match bearer_token(parts) {
        Some(token) => token,
        None => return StageResult::Terminal(GatewayError::AuthMissing),
    };

    tracing::debug!(
        token_prefix = %token.chars().take(12).collect::<String>(),
        "Verifying bearer token"
    );

    // Every codec failure, whatever its kind, ends the request here.
    match pipeline.codec.verify(token, unix_now()) {
        Ok(claims) => {
            ctx.identity = IdentityContext::from_claims(claims);
            StageResult::Continue(ctx)
        }
        Err(e) => StageResult::Terminal(GatewayError::AuthInvalid(e)),
    }
}

fn admit(pipeline: &Pipeline, _parts: &Parts, ctx: RequestContext) -> StageResult {
    let key = ctx.identity.rate_limit_key();
    if pipeline.limiter.try_admit(&key, Instant::now()) {
        StageResult::Continue(ctx)
    } else {
        StageResult::Terminal(GatewayError::RateExceeded { key })
    }
}

fn authorize(pipeline: &Pipeline, parts: &Parts, ctx: RequestContext) -> StageResult {
    let path = parts.uri.path();
    if pipeline.policy.is_allowed(&ctx.identity, path, &parts.method) {
        StageResult::Continue(ctx)
    } else {
        StageResult::Terminal(GatewayError::Forbidden {
            method: parts.method.clone(),
            path: path.to_string(),
            role: ctx.identity.role().unwrap_or("none").to_string(),
        })
    }
}

/// The token from `Authorization: Bearer <token>`, if well formed.
fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix(BEARER_PREFIX)?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}
