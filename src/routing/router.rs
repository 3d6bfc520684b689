//! Route lookup.
//!
//! # Responsibilities
//! - Store compiled routes
//! - Look up the matching route for a path
//! - Return matched route or explicit no-match
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - Routes sorted by prefix length, longest first; first match wins
//! - O(n) path prefix scan (acceptable for typical route counts)
//! - Explicit NoMatch rather than silent default

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::http::Method;

use crate::config::{RouteConfig, ValidationError};
use crate::config::validation::validate_routes;
use crate::routing::matcher::{PathPrefixMatcher, ResourcePattern};
use crate::routing::rewrite::PathRewrite;

/// Requests under a route that must hold the resource's exclusivity lock.
#[derive(Debug, Clone)]
pub struct SessionScope {
    methods: Vec<Method>,
    pattern: ResourcePattern,
}

impl SessionScope {
    pub fn new(methods: Vec<Method>, pattern: ResourcePattern) -> Self {
        Self { methods, pattern }
    }

    /// The resource id guarded by this request, if it is a guarded write.
    pub fn resource_id<'a>(&self, method: &Method, path: &'a str) -> Option<&'a str> {
        if !self.methods.contains(method) {
            return None;
        }
        self.pattern.capture(path)
    }
}

/// A compiled route.
#[derive(Debug, Clone)]
pub struct Route {
    pub name: String,
    matcher: PathPrefixMatcher,
    /// Backend base URL without trailing slash.
    pub target: String,
    pub rewrite: PathRewrite,
    pub timeout: Duration,
    pub requires_auth: bool,
    pub session: Option<SessionScope>,
}

impl Route {
    pub fn new(name: impl Into<String>, prefix: &str, target: &str) -> Self {
        Self {
            name: name.into(),
            matcher: PathPrefixMatcher::new(prefix),
            target: target.trim_end_matches('/').to_string(),
            rewrite: PathRewrite::Identity,
            timeout: Duration::from_millis(30_000),
            requires_auth: false,
            session: None,
        }
    }

    pub fn with_rewrite(mut self, rewrite: PathRewrite) -> Self {
        self.rewrite = rewrite;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_auth(mut self, requires_auth: bool) -> Self {
        self.requires_auth = requires_auth;
        self
    }

    pub fn with_session(mut self, scope: SessionScope) -> Self {
        self.session = Some(scope);
        self
    }

    pub fn prefix(&self) -> &str {
        self.matcher.prefix()
    }

    pub fn matches(&self, path: &str) -> bool {
        self.matcher.matches(path)
    }

    /// Resource id to lock for this request, if any.
    pub fn session_resource<'a>(&self, method: &Method, path: &'a str) -> Option<&'a str> {
        self.session.as_ref()?.resource_id(method, path)
    }

    fn from_config(config: &RouteConfig) -> Result<Self, ValidationError> {
        let mut route = Route::new(config.name.clone(), &config.prefix, &config.target)
            .with_rewrite(PathRewrite::from(config.rewrite.as_ref()))
            .with_timeout(Duration::from_millis(config.timeout_ms))
            .with_auth(config.requires_auth);

        if let Some(scope) = &config.session {
            let pattern = ResourcePattern::parse(&scope.pattern).map_err(|reason| {
                ValidationError::InvalidSessionPattern {
                    route: config.name.clone(),
                    pattern: scope.pattern.clone(),
                    reason,
                }
            })?;
            let methods = scope
                .methods
                .iter()
                .map(|m| {
                    m.parse::<Method>()
                        .map_err(|_| ValidationError::InvalidSessionMethod {
                            route: config.name.clone(),
                            method: m.clone(),
                        })
                })
                .collect::<Result<Vec<_>, _>>()?;
            route = route.with_session(SessionScope::new(methods, pattern));
        }

        Ok(route)
    }
}

/// Immutable longest-prefix route table.
#[derive(Debug, Default)]
pub struct RouteTable {
    routes: Vec<Arc<Route>>,
}

impl RouteTable {
    /// Build a table from compiled routes. Two routes with the same prefix
    /// are a configuration error.
    pub fn new(routes: Vec<Route>) -> Result<Self, ValidationError> {
        let mut seen: HashMap<&str, &str> = HashMap::with_capacity(routes.len());
        for route in &routes {
            if let Some(first) = seen.insert(route.prefix(), route.name.as_str()) {
                return Err(ValidationError::DuplicatePrefix {
                    first: first.to_string(),
                    second: route.name.clone(),
                    prefix: route.prefix().to_string(),
                });
            }
        }

        let mut routes: Vec<Arc<Route>> = routes.into_iter().map(Arc::new).collect();
        routes.sort_by(|a, b| b.prefix().len().cmp(&a.prefix().len()));
        Ok(Self { routes })
    }

    /// Compile and validate route configuration.
    pub fn from_config(configs: &[RouteConfig]) -> Result<Self, Vec<ValidationError>> {
        let errors = validate_routes(configs);
        if !errors.is_empty() {
            return Err(errors);
        }

        let routes = configs
            .iter()
            .map(Route::from_config)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| vec![e])?;
        Self::new(routes).map_err(|e| vec![e])
    }

    /// Longest configured prefix matching `path`.
    pub fn resolve(&self, path: &str) -> Option<Arc<Route>> {
        self.routes.iter().find(|r| r.matches(path)).cloned()
    }

    pub fn routes(&self) -> impl Iterator<Item = &Route> {
        self.routes.iter().map(|r| r.as_ref())
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
