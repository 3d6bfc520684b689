//! Voice configuration endpoints served by the gateway itself.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;

use super::settings::VoiceConfigResolver;
use crate::http::request::client_instance;
use crate::http::response::GatewayError;
use crate::security::{Authenticator, Principal};

#[derive(Debug, Clone)]
pub struct VoiceState {
    pub resolver: VoiceConfigResolver,
    pub authenticator: Arc<dyn Authenticator>,
    pub client_instance_header: String,
}

impl VoiceState {
    fn principal(&self, headers: &HeaderMap) -> Result<Principal, GatewayError> {
        self.authenticator
            .authenticate(headers)
            .map_err(|e| GatewayError::Unauthorized(e.to_string()))
    }
}

/// Routes relative to the mount path.
pub fn router(state: Arc<VoiceState>) -> Router {
    Router::new()
        .route("/config", get(voice_config))
        .route("/token", get(voice_token))
        .with_state(state)
}

async fn voice_config(State(state): State<Arc<VoiceState>>, headers: HeaderMap) -> Response {
    let principal = match state.principal(&headers) {
        Ok(p) => p,
        Err(e) => return e.into_response(),
    };
    tracing::debug!(
        user = %principal.user_id,
        client = %client_instance(&headers, &state.client_instance_header),
        "Resolving voice config"
    );

    let authorization = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());
    match state.resolver.client_config(&principal.user_id, authorization).await {
        Ok(config) => Json(json!({ "config": config })).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn voice_token(State(state): State<Arc<VoiceState>>, headers: HeaderMap) -> Response {
    let principal = match state.principal(&headers) {
        Ok(p) => p,
        Err(e) => return e.into_response(),
    };
    tracing::debug!(
        user = %principal.user_id,
        client = %client_instance(&headers, &state.client_instance_header),
        "Resolving voice web token"
    );

    let authorization = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());
    match state.resolver.web_token(&principal.user_id, authorization).await {
        Ok(token) => Json(json!({ "token": token })).into_response(),
        Err(e) => e.into_response(),
    }
}
