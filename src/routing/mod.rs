//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Request path (after the security pipeline admitted it)
//!     → router.rs (route lookup)
//!     → matcher.rs (prefix match)
//!     → Return: upstream authority or NoMatch
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - Deterministic: same input always matches same route

pub mod matcher;
pub mod router;

pub use router::{Route, RouteTable};
