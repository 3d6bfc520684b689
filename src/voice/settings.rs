//! User settings lookup with process-wide fallbacks.
//!
//! # Design Decisions
//! - A failing or unreachable settings service is logged and treated as
//!   "no user settings"; it never fails the request on its own
//! - A value missing from both the user settings and the defaults is a
//!   client-facing 400

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::VoiceConfig;
use crate::http::response::GatewayError;

/// Voice-related values stored per user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UserSettings {
    #[serde(default, alias = "vapi_api_key")]
    pub voice_api_key: Option<String>,

    #[serde(default, alias = "vapi_web_token")]
    pub voice_web_token: Option<String>,

    #[serde(default)]
    pub language: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SettingsEnvelope {
    #[serde(default)]
    settings: Option<UserSettings>,
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("settings service returned {0}")]
    Status(reqwest::StatusCode),
}

#[async_trait]
pub trait SettingsProvider: Send + Sync + fmt::Debug {
    /// Settings for `user_id`, fetched with the caller's own credentials.
    async fn fetch(
        &self,
        user_id: &str,
        authorization: Option<&str>,
    ) -> Result<Option<UserSettings>, SettingsError>;
}

/// Used when no settings service is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSettings;

#[async_trait]
impl SettingsProvider for NoSettings {
    async fn fetch(&self, _: &str, _: Option<&str>) -> Result<Option<UserSettings>, SettingsError> {
        Ok(None)
    }
}

/// `GET {base_url}/api/settings` on the user service.
#[derive(Debug, Clone)]
pub struct HttpSettingsProvider {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSettingsProvider {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, SettingsError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl SettingsProvider for HttpSettingsProvider {
    async fn fetch(
        &self,
        user_id: &str,
        authorization: Option<&str>,
    ) -> Result<Option<UserSettings>, SettingsError> {
        let mut request = self.client.get(format!("{}/api/settings", self.base_url));
        if let Some(auth) = authorization {
            request = request.header(reqwest::header::AUTHORIZATION, auth);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(SettingsError::Status(response.status()));
        }

        let envelope: SettingsEnvelope = response.json().await?;
        tracing::debug!(user = %user_id, found = envelope.settings.is_some(), "Fetched user settings");
        Ok(envelope.settings)
    }
}

/// `{"config": {"apiKey", "language"}}` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientVoiceConfig {
    pub api_key: String,
    pub language: String,
}

/// Treat empty strings like absent values.
fn present(value: Option<&String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty()).cloned()
}

#[derive(Debug, Clone)]
pub struct VoiceConfigResolver {
    provider: Arc<dyn SettingsProvider>,
    default_api_key: Option<String>,
    default_web_token: Option<String>,
    default_language: String,
}

impl VoiceConfigResolver {
    pub fn new(provider: Arc<dyn SettingsProvider>, config: &VoiceConfig) -> Self {
        Self {
            provider,
            default_api_key: config.default_api_key.clone(),
            default_web_token: config.default_web_token.clone(),
            default_language: config.default_language.clone(),
        }
    }

    /// Provider for `config`: HTTP when a settings URL is set, none otherwise.
    pub fn provider_from_config(config: &VoiceConfig) -> Result<Arc<dyn SettingsProvider>, SettingsError> {
        Ok(match &config.settings_url {
            Some(url) => Arc::new(HttpSettingsProvider::new(
                url,
                Duration::from_millis(config.settings_timeout_ms),
            )?),
            None => Arc::new(NoSettings),
        })
    }

    async fn user_settings(&self, user_id: &str, authorization: Option<&str>) -> UserSettings {
        match self.provider.fetch(user_id, authorization).await {
            Ok(settings) => settings.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(user = %user_id, error = %e, "Settings lookup failed, using defaults");
                UserSettings::default()
            }
        }
    }

    pub async fn client_config(
        &self,
        user_id: &str,
        authorization: Option<&str>,
    ) -> Result<ClientVoiceConfig, GatewayError> {
        let settings = self.user_settings(user_id, authorization).await;

        let api_key = present(settings.voice_api_key.as_ref())
            .or_else(|| present(self.default_api_key.as_ref()))
            .ok_or(GatewayError::MissingSetting {
                error: "api_key_not_configured",
                message: "Please configure your voice API key in settings",
            })?;
        let language = present(settings.language.as_ref())
            .unwrap_or_else(|| self.default_language.clone());

        Ok(ClientVoiceConfig { api_key, language })
    }

    pub async fn web_token(&self, user_id: &str, authorization: Option<&str>) -> Result<String, GatewayError> {
        let settings = self.user_settings(user_id, authorization).await;

        present(settings.voice_web_token.as_ref())
            .or_else(|| present(self.default_web_token.as_ref()))
            .ok_or(GatewayError::MissingSetting {
                error: "web_token_not_configured",
                message: "Please configure your voice web token in settings",
            })
    }
}
