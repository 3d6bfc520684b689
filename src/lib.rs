//! Session-aware HTTP gateway.
//!
//! Routes requests to backend services by path prefix, limits in-flight
//! requests per client, and keeps concurrent writers off the same resource.

pub mod admin;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod proxy;
pub mod resilience;
pub mod routing;
pub mod security;
pub mod session;
pub mod voice;

pub use config::schema::GatewayConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
