//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → compiled into RouteTable / controllers at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    AdminConfig, AdmissionConfig, AuthConfig, GatewayConfig, ListenerConfig, LogFormat,
    ObservabilityConfig, RewriteConfig, RouteConfig, SecurityConfig, SessionConfig,
    SessionScopeConfig, TimeoutConfig, TokenConfig, UpstreamConfig, VoiceConfig,
};
pub use validation::ValidationError;
