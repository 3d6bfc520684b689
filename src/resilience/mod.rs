//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request to backend:
//!     → timeouts.rs (enforce route deadline, classify failures)
//!     → proxy dispatcher maps the failure to one client-facing status
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - No retries: conflicts and failures fail fast, callers retry

pub mod timeouts;

pub use timeouts::{with_deadline, DeadlineExceeded, FailureKind};
