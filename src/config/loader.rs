//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<GatewayConfig, ConfigError> {
    let config: GatewayConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sample_shape() {
        let config = parse_config(
            r#"
            [listener]
            bind_address = "127.0.0.1:8000"

            [[routes]]
            name = "voice-service"
            prefix = "/api/voice-service/voice"
            target = "http://localhost:3005"
            rewrite = { from = "/api/voice-service/voice", to = "/api/voice" }
            timeout_ms = 10000
            requires_auth = true
            "#,
        )
        .unwrap();

        assert_eq!(config.listener.bind_address, "127.0.0.1:8000");
        assert_eq!(config.routes[0].timeout_ms, 10_000);
        assert!(config.routes[0].requires_auth);
    }

    #[test]
    fn shipped_sample_is_valid() {
        let config = parse_config(include_str!("../../gateway.toml")).unwrap();
        assert_eq!(config.routes.len(), 4);
        assert!(config.voice.enabled);

        fn route<'a>(config: &'a GatewayConfig, name: &str) -> &'a crate::config::RouteConfig {
            config
                .routes
                .iter()
                .find(|r| r.name == name)
                .unwrap_or_else(|| panic!("missing route {name}"))
        }
        assert!(!route(&config, "user-auth").requires_auth);
        assert!(route(&config, "user-service").requires_auth);
        assert!(route(&config, "chat-service").requires_auth);
        assert!(route(&config, "chat-service").session.is_some());
        assert!(route(&config, "voice-service").requires_auth);

        let table = crate::routing::RouteTable::from_config(&config.routes).unwrap();
        assert_eq!(
            table.resolve("/api/user-service/auth/login").unwrap().name,
            "user-auth"
        );
        assert!(table.resolve("/api/user-service/settings").unwrap().requires_auth);
    }

    #[test]
    fn validation_errors_are_reported_together() {
        let err = parse_config(
            r#"
            [admission]
            max_concurrent = 0

            [sessions]
            inactivity_secs = 0
            "#,
        )
        .unwrap_err();

        match err {
            ConfigError::Validation(errors) => assert_eq!(errors.len(), 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_config(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
