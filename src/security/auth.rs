//! Authentication gate.
//!
//! The gateway never verifies credentials itself: an [`Authenticator`] turns
//! request headers into a [`Principal`] or a rejection. The bundled
//! implementation checks bearer tokens against a static table.

use std::collections::HashMap;
use std::fmt;

use axum::http::{header::AUTHORIZATION, HeaderMap};
use thiserror::Error;

use crate::config::AuthConfig;

/// The authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("missing bearer token")]
    MissingToken,

    #[error("invalid token")]
    InvalidToken,
}

pub trait Authenticator: Send + Sync + fmt::Debug {
    fn authenticate(&self, headers: &HeaderMap) -> Result<Principal, AuthError>;
}

/// Extract the token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Bearer tokens mapped to user ids.
#[derive(Default)]
pub struct StaticTokenAuthenticator {
    tokens: HashMap<String, String>,
}

impl StaticTokenAuthenticator {
    pub fn new(tokens: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            tokens: tokens.into_iter().collect(),
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(
            config
                .tokens
                .iter()
                .map(|t| (t.token.clone(), t.user_id.clone())),
        )
    }
}

impl Authenticator for StaticTokenAuthenticator {
    fn authenticate(&self, headers: &HeaderMap) -> Result<Principal, AuthError> {
        let token = bearer_token(headers).ok_or(AuthError::MissingToken)?;
        self.tokens
            .get(token)
            .map(|user_id| Principal {
                user_id: user_id.clone(),
            })
            .ok_or(AuthError::InvalidToken)
    }
}

impl fmt::Debug for StaticTokenAuthenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticTokenAuthenticator")
            .field("tokens", &self.tokens.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(auth: &str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(AUTHORIZATION, HeaderValue::from_str(auth).unwrap());
        h
    }

    #[test]
    fn accepts_known_token() {
        let auth = StaticTokenAuthenticator::new([("t-1".to_string(), "user-1".to_string())]);
        let principal = auth.authenticate(&headers("Bearer t-1")).unwrap();
        assert_eq!(principal.user_id, "user-1");
    }

    #[test]
    fn rejects_unknown_and_missing_tokens() {
        let auth = StaticTokenAuthenticator::new([("t-1".to_string(), "user-1".to_string())]);
        assert_eq!(
            auth.authenticate(&headers("Bearer nope")),
            Err(AuthError::InvalidToken)
        );
        assert_eq!(auth.authenticate(&HeaderMap::new()), Err(AuthError::MissingToken));
        assert_eq!(
            auth.authenticate(&headers("Basic dXNlcjpwYXNz")),
            Err(AuthError::MissingToken)
        );
    }

    #[test]
    fn bearer_scheme_is_case_insensitive() {
        assert_eq!(bearer_token(&headers("bearer abc")), Some("abc"));
        assert_eq!(bearer_token(&headers("Bearer ")), None);
    }
}
