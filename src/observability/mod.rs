//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Forwarded calls:
//!     → timing.rs (measure, record metrics, pick log level)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Request ID flows through all log events
//! - Metrics are always recorded; log volume follows the policy

pub mod logging;
pub mod metrics;
pub mod timing;

pub use timing::{DetailReason, Emission, LogPolicy, ObservedRequest, ResponseTimeObserver};
