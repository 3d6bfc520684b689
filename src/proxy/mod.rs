//! Proxy dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! Admitted, routed, authorized request:
//!     → dispatcher.rs (buffer body, rewrite path, filter headers)
//!     → backend call under the route deadline
//!     → outcome.rs (status, duration, failure kind) → observer
//!     → backend response passed through, or synthesized error
//! ```

pub mod dispatcher;
pub mod outcome;

pub use dispatcher::{BufferedRequest, ProxyDispatcher, UpstreamFailure};
pub use outcome::ProxyOutcome;
