//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (path)
//!     → router.rs (route lookup, longest prefix first)
//!     → matcher.rs (segment-boundary prefix match)
//!     → Return: matched Route or NoMatch
//!
//! Forwarding:
//!     Route.rewrite (rewrite.rs) → backend path
//!     Route.session (matcher.rs ResourcePattern) → resource id to lock
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - No regex in hot path (prefix matching only)
//! - Deterministic: same input always matches same route

pub mod matcher;
pub mod rewrite;
pub mod router;

pub use rewrite::PathRewrite;
pub use router::{Route, RouteTable, SessionScope};
