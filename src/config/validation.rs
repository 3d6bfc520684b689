//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Detect conflicting routes
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::{GatewayConfig, RouteConfig};
use crate::routing::matcher::{normalize_prefix, ResourcePattern};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("route {index}: name must not be empty")]
    EmptyRouteName { index: usize },

    #[error("route '{0}' is defined more than once")]
    DuplicateRouteName(String),

    #[error("route '{route}': prefix '{prefix}' must start with '/'")]
    InvalidPrefix { route: String, prefix: String },

    #[error("routes '{first}' and '{second}' share the prefix '{prefix}'")]
    DuplicatePrefix {
        first: String,
        second: String,
        prefix: String,
    },

    #[error("route '{route}': invalid target '{target}': {reason}")]
    InvalidTarget {
        route: String,
        target: String,
        reason: String,
    },

    #[error("route '{0}': timeout_ms must be greater than zero")]
    ZeroTimeout(String),

    #[error("route '{route}': invalid rewrite: {reason}")]
    InvalidRewrite { route: String, reason: String },

    #[error("route '{route}': invalid session pattern '{pattern}': {reason}")]
    InvalidSessionPattern {
        route: String,
        pattern: String,
        reason: String,
    },

    #[error("route '{route}': unknown session method '{method}'")]
    InvalidSessionMethod { route: String, method: String },

    #[error("{field} must be greater than zero")]
    ZeroValue { field: &'static str },

    #[error("{field}: '{value}' is not a valid socket address")]
    InvalidAddress { field: &'static str, value: String },

    #[error("voice.mount_path '{0}' must be an absolute path other than '/' without captures")]
    InvalidMountPath(String),

    #[error("voice.settings_url '{url}' is invalid: {reason}")]
    InvalidSettingsUrl { url: String, reason: String },
}

/// Validate a full gateway configuration.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = validate_routes(&config.routes);

    if config.admission.max_concurrent == 0 {
        errors.push(ValidationError::ZeroValue {
            field: "admission.max_concurrent",
        });
    }
    if config.security.max_body_bytes == 0 {
        errors.push(ValidationError::ZeroValue {
            field: "security.max_body_bytes",
        });
    }
    if config.sessions.sweep_interval_secs == 0 {
        errors.push(ValidationError::ZeroValue {
            field: "sessions.sweep_interval_secs",
        });
    }
    if config.sessions.inactivity_secs == 0 {
        errors.push(ValidationError::ZeroValue {
            field: "sessions.inactivity_secs",
        });
    }

    if config.voice.enabled {
        let mount = config.voice.mount_path.trim_end_matches('/');
        if !mount.starts_with('/') || mount.contains(['{', '}', '*']) {
            errors.push(ValidationError::InvalidMountPath(config.voice.mount_path.clone()));
        }
        if let Some(url) = &config.voice.settings_url {
            if let Err(e) = Url::parse(url) {
                errors.push(ValidationError::InvalidSettingsUrl {
                    url: url.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    check_address(&mut errors, "listener.bind_address", &config.listener.bind_address);
    if config.admin.enabled {
        check_address(&mut errors, "admin.bind_address", &config.admin.bind_address);
    }
    if config.observability.metrics_enabled {
        check_address(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate route definitions on their own.
pub fn validate_routes(routes: &[RouteConfig]) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let mut names = HashSet::new();
    let mut prefixes: Vec<(String, &str)> = Vec::new();

    for (index, route) in routes.iter().enumerate() {
        if route.name.is_empty() {
            errors.push(ValidationError::EmptyRouteName { index });
        } else if !names.insert(route.name.as_str()) {
            errors.push(ValidationError::DuplicateRouteName(route.name.clone()));
        }

        if !route.prefix.starts_with('/') {
            errors.push(ValidationError::InvalidPrefix {
                route: route.name.clone(),
                prefix: route.prefix.clone(),
            });
        } else {
            let normalized = normalize_prefix(&route.prefix);
            if let Some((_, first)) = prefixes.iter().find(|(p, _)| *p == normalized) {
                errors.push(ValidationError::DuplicatePrefix {
                    first: first.to_string(),
                    second: route.name.clone(),
                    prefix: normalized.clone(),
                });
            }
            prefixes.push((normalized, route.name.as_str()));
        }

        if let Err(reason) = check_target(&route.target) {
            errors.push(ValidationError::InvalidTarget {
                route: route.name.clone(),
                target: route.target.clone(),
                reason,
            });
        }

        if route.timeout_ms == 0 {
            errors.push(ValidationError::ZeroTimeout(route.name.clone()));
        }

        if let Some(rewrite) = &route.rewrite {
            if !rewrite.from.starts_with('/') {
                errors.push(ValidationError::InvalidRewrite {
                    route: route.name.clone(),
                    reason: format!("'from' ({}) must start with '/'", rewrite.from),
                });
            }
        }

        if let Some(scope) = &route.session {
            if let Err(reason) = ResourcePattern::parse(&scope.pattern) {
                errors.push(ValidationError::InvalidSessionPattern {
                    route: route.name.clone(),
                    pattern: scope.pattern.clone(),
                    reason,
                });
            } else if !scope.pattern.starts_with(normalize_prefix(&route.prefix).as_str()) {
                errors.push(ValidationError::InvalidSessionPattern {
                    route: route.name.clone(),
                    pattern: scope.pattern.clone(),
                    reason: "pattern is not under the route prefix".to_string(),
                });
            }
            for method in &scope.methods {
                if method.parse::<axum::http::Method>().is_err() {
                    errors.push(ValidationError::InvalidSessionMethod {
                        route: route.name.clone(),
                        method: method.clone(),
                    });
                }
            }
        }
    }

    errors
}

fn check_target(target: &str) -> Result<(), String> {
    let url = Url::parse(target).map_err(|e| e.to_string())?;
    if url.scheme() != "http" {
        return Err(format!("unsupported scheme '{}'", url.scheme()));
    }
    if url.host_str().is_none() {
        return Err("missing host".to_string());
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err("target must not carry a query or fragment".to_string());
    }
    Ok(())
}

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{RewriteConfig, SessionScopeConfig};

    fn route(name: &str, prefix: &str) -> RouteConfig {
        RouteConfig {
            name: name.into(),
            prefix: prefix.into(),
            target: "http://localhost:3004".into(),
            rewrite: None,
            timeout_ms: 1000,
            requires_auth: false,
            session: None,
        }
    }

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&GatewayConfig::default()).is_ok());
    }

    #[test]
    fn voice_mount_path_is_checked_only_when_enabled() {
        let mut config = GatewayConfig::default();
        config.voice.mount_path = "/".into();
        assert!(validate_config(&config).is_ok());

        config.voice.enabled = true;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors, vec![ValidationError::InvalidMountPath("/".into())]);
    }

    #[test]
    fn duplicate_prefixes_are_rejected() {
        let routes = vec![route("a", "/api/chats"), route("b", "/api/chats/")];
        let errors = validate_routes(&routes);
        assert!(matches!(
            errors.as_slice(),
            [ValidationError::DuplicatePrefix { .. }]
        ));
    }

    #[test]
    fn nested_prefixes_are_allowed() {
        let routes = vec![route("a", "/api/user-service"), route("b", "/api/user-service/auth")];
        assert!(validate_routes(&routes).is_empty());
    }

    #[test]
    fn collects_every_error() {
        let mut bad = route("", "api");
        bad.target = "https://secure.example.com".into();
        bad.timeout_ms = 0;
        bad.rewrite = Some(RewriteConfig {
            from: "api".into(),
            to: "/".into(),
        });

        let errors = validate_routes(&[bad]);
        assert_eq!(errors.len(), 5, "{errors:?}");
    }

    #[test]
    fn session_pattern_must_sit_under_prefix() {
        let mut r = route("chats", "/api/chat-service/chats");
        r.session = Some(SessionScopeConfig {
            methods: vec!["POST".into()],
            pattern: "/api/other/{id}".into(),
        });
        let errors = validate_routes(&[r]);
        assert!(matches!(
            errors.as_slice(),
            [ValidationError::InvalidSessionPattern { .. }]
        ));
    }

    #[test]
    fn zero_admission_ceiling_is_rejected() {
        let mut config = GatewayConfig::default();
        config.admission.max_concurrent = 0;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::ZeroValue {
                field: "admission.max_concurrent"
            }]
        );
    }
}
