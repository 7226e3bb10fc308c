//! Bearer token codec.
//!
//! # Responsibilities
//! - Issue signed identity tokens (subject, role, iat, exp)
//! - Verify signature, structure and expiry of presented tokens
//!
//! # Design Decisions
//! - HS512 with a secret shared out-of-band; issuer and verifier share nothing else
//! - Expiry is checked against a caller-supplied clock, not the library's
//! - The codec is immutable after construction and safe to share across requests

use std::time::Duration;

use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::AuthConfig;

/// Signing algorithm shared with the issuing service.
pub const ALGORITHM: Algorithm = Algorithm::HS512;

/// Claims carried inside a token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Identity key (username or email).
    pub sub: String,
    /// Single role string, e.g. "USER", "ADMIN" or "ROLE_ADMIN".
    pub role: String,
    /// Issued-at, seconds since epoch.
    pub iat: i64,
    /// Expiry, seconds since epoch.
    pub exp: i64,
    /// Numeric account id, when the issuer includes one.
    #[serde(rename = "userId", default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Reasons a token is rejected or cannot be produced.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("token signature does not match")]
    InvalidSignature,

    #[error("malformed token: {0}")]
    Malformed(String),

    #[error("token expired")]
    Expired,

    #[error("failed to sign token: {0}")]
    Signing(String),
}

/// Current wall-clock time in seconds since epoch.
pub fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Issues and verifies tokens with a symmetric key.
pub struct TokenCodec {
    /// False when built from an empty secret; such a codec signs and accepts nothing.
    keyed: bool,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenCodec {
    /// Create a codec from the raw shared secret.
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        let mut validation = Validation::new(ALGORITHM);
        // Expiry is judged against the caller's clock in `verify`.
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["sub", "exp"]);

        Self {
            keyed: !secret.is_empty(),
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            ttl,
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(
            config.token_secret.as_bytes(),
            Duration::from_secs(config.token_ttl_secs),
        )
    }

    /// Token lifetime applied by `issue`.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Claims for `subject` with `role`, valid from `now` for the configured ttl.
    ///
    /// Optional claims start empty; callers fill them before `sign`.
    pub fn claims_for(&self, subject: &str, role: &str, now: i64) -> Claims {
        let ttl = i64::try_from(self.ttl.as_secs()).unwrap_or(i64::MAX);
        Claims {
            sub: subject.to_string(),
            role: role.to_string(),
            iat: now,
            exp: now.saturating_add(ttl),
            user_id: None,
            email: None,
        }
    }

    /// Issue a token for `subject` with `role`, valid from `now` for the configured ttl.
    pub fn issue(&self, subject: &str, role: &str, now: i64) -> Result<String, TokenError> {
        self.sign(&self.claims_for(subject, role, now))
    }

    /// Sign an explicit set of claims.
    pub fn sign(&self, claims: &Claims) -> Result<String, TokenError> {
        if !self.keyed {
            return Err(TokenError::Signing("no signing secret configured".into()));
        }
        encode(&Header::new(ALGORITHM), claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Verify a token at time `now`.
    ///
    /// Claims are returned only when the signature checks out and `now < exp`.
    pub fn verify(&self, token: &str, now: i64) -> Result<Claims, TokenError> {
        if !self.keyed {
            return Err(TokenError::InvalidSignature);
        }
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(classify_error)?;

        if now >= data.claims.exp {
            return Err(TokenError::Expired);
        }
        Ok(data.claims)
    }
}

fn classify_error(err: jsonwebtoken::errors::Error) -> TokenError {
    match err.kind() {
        ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => TokenError::InvalidSignature,
        ErrorKind::ExpiredSignature => TokenError::Expired,
        _ => TokenError::Malformed(err.to_string()),
    }
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("algorithm", &ALGORITHM)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}
