//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → admission.rs (per-IP in-flight ceiling)
//!     → [route lookup]
//!     → auth.rs (authentication gate on protected routes)
//!     → limits.rs (buffer body up to the size limit)
//!     → Pass to session gate and dispatcher
//! ```
//!
//! # Design Decisions
//! - Fail closed: reject on any check failure
//! - Rejections never reach a backend

pub mod admission;
pub mod auth;
pub mod limits;

pub use admission::{AdmissionController, AdmissionPermit, AdmissionStore, InMemoryAdmissionStore};
pub use auth::{AuthError, Authenticator, Principal, StaticTokenAuthenticator};
