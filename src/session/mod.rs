//! Session exclusivity subsystem.
//!
//! # Data Flow
//! ```text
//! Guarded write request:
//!     → manager.rs (try_acquire: grant or conflict)
//!     → store.rs (decision table under one map-entry lock)
//!     → SessionGuard rides the response body, releases on completion
//!
//! Background:
//!     sweeper.rs → manager.sweep() every interval
//! ```
//!
//! # Design Decisions
//! - Conflicts fail fast with 409; no queueing
//! - The sweep reclaims idle locks even while processing, so a crashed
//!   client cannot wedge a resource
//! - Leases carry a generation so a late release cannot clear a newer holder

pub mod lock;
pub mod manager;
pub mod store;
pub mod sweeper;

pub use lock::{Acquisition, Lease, SessionLock};
pub use manager::{SessionDecision, SessionExclusivityManager, SessionGuard};
pub use store::{InMemorySessionStore, SessionStore};
pub use sweeper::spawn_sweeper;
