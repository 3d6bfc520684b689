//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Route definitions mapping public prefixes to backend services.
    pub routes: Vec<RouteConfig>,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Request size limits.
    pub security: SecurityConfig,

    /// Per-client concurrency ceiling.
    pub admission: AdmissionConfig,

    /// Session exclusivity settings.
    pub sessions: SessionConfig,

    /// Forwarding policy towards backends.
    pub upstream: UpstreamConfig,

    /// Static credentials for the authentication gate.
    pub auth: AuthConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Voice configuration endpoints and settings lookup.
    pub voice: VoiceConfig,

    /// Admin API.
    pub admin: AdminConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// A public path prefix and the backend service behind it.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Route identifier for logging/metrics.
    pub name: String,

    /// Public path prefix (e.g., "/api/chat-service/chats").
    pub prefix: String,

    /// Base URL of the backend service (e.g., "http://localhost:3004").
    pub target: String,

    /// Optional static prefix substitution applied before forwarding.
    #[serde(default)]
    pub rewrite: Option<RewriteConfig>,

    /// Hard deadline for the forwarded call, in milliseconds.
    #[serde(default = "default_route_timeout_ms")]
    pub timeout_ms: u64,

    /// Whether the authentication gate runs for this prefix.
    #[serde(default)]
    pub requires_auth: bool,

    /// Resource exclusivity for write requests under this route.
    #[serde(default)]
    pub session: Option<SessionScopeConfig>,
}

fn default_route_timeout_ms() -> u64 {
    30_000
}

/// Static prefix substitution: a path starting with `from` has that part
/// replaced by `to`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RewriteConfig {
    pub from: String,
    pub to: String,
}

/// Which requests under a route take the exclusivity lock.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionScopeConfig {
    /// Methods that count as writes.
    #[serde(default = "default_session_methods")]
    pub methods: Vec<String>,

    /// Path pattern with a single `{name}` segment holding the resource id,
    /// e.g. "/api/chat-service/chats/{id}/messages".
    pub pattern: String,
}

fn default_session_methods() -> Vec<String> {
    vec!["POST".to_string()]
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// TCP connect timeout towards backends, in milliseconds.
    pub connect_ms: u64,

    /// Idle pooled-connection timeout in seconds.
    pub pool_idle_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_ms: 5_000,
            pool_idle_secs: 60,
        }
    }
}

/// Request size limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum buffered request body size in bytes.
    pub max_body_bytes: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 10 * 1024 * 1024, // 10MB
        }
    }
}

/// Per-client concurrency ceiling.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdmissionConfig {
    /// Enable admission control.
    pub enabled: bool,

    /// Maximum in-flight requests per client IP.
    pub max_concurrent: usize,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_concurrent: 100,
        }
    }
}

/// Session exclusivity settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    /// How often idle locks are swept, in seconds.
    pub sweep_interval_secs: u64,

    /// Locks idle for longer than this are removed, in seconds.
    pub inactivity_secs: u64,

    /// Header carrying the caller's client instance id.
    pub client_instance_header: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            sweep_interval_secs: 5 * 60,
            inactivity_secs: 30 * 60,
            client_instance_header: "x-client-instance".to_string(),
        }
    }
}

/// Forwarding policy towards backends.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Report timeouts with the same 502 as other unreachable backends.
    pub uniform_failure_status: bool,

    /// Headers with this prefix never leave the gateway.
    pub internal_header_prefix: String,

    /// Additional request headers removed before forwarding.
    pub strip_headers: Vec<String>,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            uniform_failure_status: true,
            internal_header_prefix: "x-gateway-".to_string(),
            strip_headers: Vec::new(),
        }
    }
}

/// Static credentials for the authentication gate.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AuthConfig {
    pub tokens: Vec<TokenConfig>,
}

/// A bearer token and the user it authenticates.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TokenConfig {
    pub token: String,
    pub user_id: String,
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Emit per-request diagnostics for fast, successful requests too.
    pub verbose: bool,

    /// Responses slower than this are always logged, in milliseconds.
    pub slow_threshold_ms: u64,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            verbose: false,
            slow_threshold_ms: 1_000,
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Voice configuration endpoints.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct VoiceConfig {
    /// Serve the voice config endpoints from the gateway.
    pub enabled: bool,

    /// Path under which `/config` and `/token` are mounted.
    pub mount_path: String,

    /// Base URL of the user settings service.
    pub settings_url: Option<String>,

    /// Deadline for the settings lookup, in milliseconds.
    pub settings_timeout_ms: u64,

    /// Process-wide fallback API key.
    pub default_api_key: Option<String>,

    /// Process-wide fallback web token.
    pub default_web_token: Option<String>,

    /// Language used when the user has none configured.
    pub default_language: String,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            mount_path: "/gateway/voice".to_string(),
            settings_url: None,
            settings_timeout_ms: 5_000,
            default_api_key: None,
            default_web_token: None,
            default_language: "vi".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable admin API.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}
