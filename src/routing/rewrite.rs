//! Path rewriting applied before a request leaves the gateway.

use std::fmt;
use std::sync::Arc;

use crate::config::RewriteConfig;

/// How a public path becomes the backend path.
#[derive(Clone, Default)]
pub enum PathRewrite {
    /// Forward the path unchanged.
    #[default]
    Identity,
    /// Replace a leading `from` with `to`.
    Replace { from: String, to: String },
    /// Arbitrary pure function of the incoming path.
    Custom(Arc<dyn Fn(&str) -> String + Send + Sync>),
}

impl PathRewrite {
    pub fn replace(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self::Replace {
            from: from.into(),
            to: to.into(),
        }
    }

    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(f))
    }

    /// Rewrite `path`. The result always begins with `/`.
    pub fn apply(&self, path: &str) -> String {
        let rewritten = match self {
            Self::Identity => path.to_string(),
            Self::Replace { from, to } => match path.strip_prefix(from.as_str()) {
                Some(rest) => format!("{to}{rest}"),
                None => path.to_string(),
            },
            Self::Custom(f) => f(path),
        };

        if rewritten.starts_with('/') {
            rewritten
        } else {
            format!("/{rewritten}")
        }
    }
}

impl From<Option<&RewriteConfig>> for PathRewrite {
    fn from(config: Option<&RewriteConfig>) -> Self {
        match config {
            Some(rw) => Self::replace(rw.from.clone(), rw.to.clone()),
            None => Self::Identity,
        }
    }
}

impl fmt::Debug for PathRewrite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Identity => f.write_str("Identity"),
            Self::Replace { from, to } => f
                .debug_struct("Replace")
                .field("from", from)
                .field("to", to)
                .finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replace_swaps_leading_prefix() {
        let rw = PathRewrite::replace("/api/user-service", "/api");
        assert_eq!(rw.apply("/api/user-service/auth/login"), "/api/auth/login");
        assert_eq!(rw.apply("/other/path"), "/other/path");
    }

    #[test]
    fn voice_prefix_rewrite() {
        let rw = PathRewrite::replace("/api/voice-service/voice", "/api/voice");
        assert_eq!(rw.apply("/api/voice-service/voice/calls/7"), "/api/voice/calls/7");
        assert_eq!(rw.apply("/api/voice-service/voice"), "/api/voice");
    }

    #[test]
    fn output_always_has_leading_slash() {
        assert_eq!(PathRewrite::replace("/api", "").apply("/api"), "/");
        assert_eq!(PathRewrite::replace("/api/", "").apply("/api/x"), "/x");
        assert_eq!(PathRewrite::custom(|p| p.trim_start_matches('/').to_string()).apply("/a"), "/a");
    }

    #[test]
    fn rewrite_is_deterministic() {
        let rw = PathRewrite::custom(|p| p.replace("/v1/", "/v2/"));
        let first = rw.apply("/api/v1/items");
        assert_eq!(first, "/api/v2/items");
        assert_eq!(rw.apply("/api/v1/items"), first);
    }
}
