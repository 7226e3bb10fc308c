//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → routes.rs (public or protected?)
//!     → token.rs (verify bearer token, protected routes only)
//!     → identity.rs (authenticated subject or anonymous address)
//!     → rate_limit.rs (per-identity token bucket)
//!     → authorization.rs (role check on mutating routes)
//!     → headers.rs (identity headers for the upstream)
//! ```
//!
//! # Design Decisions
//! - Fail closed: reject on any security check failure
//! - No trust in client-supplied identity headers
//! - Only the rate limiter holds mutable state

pub mod authorization;
pub mod headers;
pub mod identity;
pub mod rate_limit;
pub mod routes;
pub mod token;

pub use authorization::{AuthorizationPolicy, AuthorizationRule};
pub use identity::IdentityContext;
pub use rate_limit::{BucketLimits, RateLimiter};
pub use routes::RouteClassifier;
pub use token::{Claims, TokenCodec, TokenError};
