//! Path matching logic.
//!
//! # Responsibilities
//! - Match a path against a route prefix on segment boundaries
//! - Match a path against a resource pattern and extract the resource id
//!
//! # Design Decisions
//! - Path matching is case-sensitive
//! - `/api/chats` matches `/api/chats` and `/api/chats/...`, never `/api/chatsX`
//! - No regex to guarantee O(n) matching

/// Strip trailing slashes from a prefix; the root prefix stays `/`.
pub fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Matches the request path against a normalized prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPrefixMatcher {
    prefix: String,
}

impl PathPrefixMatcher {
    /// Create a new path prefix matcher.
    pub fn new(prefix: impl AsRef<str>) -> Self {
        Self {
            prefix: normalize_prefix(prefix.as_ref()),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Returns true if `path` equals the prefix or continues it with a new segment.
    pub fn matches(&self, path: &str) -> bool {
        if self.prefix == "/" {
            return path.starts_with('/');
        }
        match path.strip_prefix(self.prefix.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Capture,
}

/// A path pattern with exactly one `{name}` segment, e.g.
/// `/api/chat-service/chats/{id}/messages`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourcePattern {
    segments: Vec<Segment>,
}

impl ResourcePattern {
    pub fn parse(pattern: &str) -> Result<Self, String> {
        if !pattern.starts_with('/') {
            return Err("pattern must start with '/'".to_string());
        }

        let mut segments = Vec::new();
        let mut captures = 0;
        for raw in pattern.trim_end_matches('/').split('/').skip(1) {
            if raw.starts_with('{') && raw.ends_with('}') && raw.len() > 2 {
                captures += 1;
                segments.push(Segment::Capture);
            } else if raw.contains('{') || raw.contains('}') {
                return Err(format!("malformed segment '{raw}'"));
            } else if raw.is_empty() {
                return Err("empty path segment".to_string());
            } else {
                segments.push(Segment::Literal(raw.to_string()));
            }
        }

        if captures != 1 {
            return Err(format!("expected exactly one {{name}} segment, found {captures}"));
        }
        Ok(Self { segments })
    }

    /// Returns the captured resource id when `path` matches segment-for-segment.
    pub fn capture<'a>(&self, path: &'a str) -> Option<&'a str> {
        let mut parts = path.trim_end_matches('/').split('/').skip(1);
        let mut captured = None;

        for segment in &self.segments {
            let part = parts.next()?;
            match segment {
                Segment::Literal(lit) if lit == part => {}
                Segment::Literal(_) => return None,
                Segment::Capture if part.is_empty() => return None,
                Segment::Capture => captured = Some(part),
            }
        }

        if parts.next().is_some() {
            return None;
        }
        captured
    }
}
