//! Route patterns and declarative route tables.
//!
//! A controller type declares its routes up front as a list of
//! [`RouteMapping`]s (handler identifier → method + path pattern). The
//! registrar parses that table once per registration and recomputes the
//! same keys when the plugin is unloaded.
//!
//! Patterns are `/`-separated; a segment is either a literal or a
//! `{name}` capture:
//!
//! ```text
//! /weather/current
//! /weather/forecast/{city}
//! ```

use std::collections::HashMap;
use std::fmt;

use http::Method;
use serde::Serialize;

use plughub_core::error::AppError;
use plughub_core::result::AppResult;

/// One route of a controller's declarative route table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMapping {
    /// Handler identifier passed to [`Controller::handle`](super::Controller::handle).
    pub handler: &'static str,
    /// HTTP method.
    pub method: Method,
    /// Path pattern relative to the plugin route prefix.
    pub path: &'static str,
}

impl RouteMapping {
    /// Creates a mapping for an arbitrary method.
    pub fn new(handler: &'static str, method: Method, path: &'static str) -> Self {
        Self {
            handler,
            method,
            path,
        }
    }

    /// `GET` mapping.
    pub fn get(handler: &'static str, path: &'static str) -> Self {
        Self::new(handler, Method::GET, path)
    }

    /// `POST` mapping.
    pub fn post(handler: &'static str, path: &'static str) -> Self {
        Self::new(handler, Method::POST, path)
    }

    /// `PUT` mapping.
    pub fn put(handler: &'static str, path: &'static str) -> Self {
        Self::new(handler, Method::PUT, path)
    }

    /// `DELETE` mapping.
    pub fn delete(handler: &'static str, path: &'static str) -> Self {
        Self::new(handler, Method::DELETE, path)
    }

    /// Parses the pattern and returns the dispatch key for this mapping.
    pub fn route_key(&self) -> AppResult<(RouteKey, PathPattern)> {
        let pattern = PathPattern::parse(self.path)?;
        let key = RouteKey {
            method: self.method.clone(),
            pattern: pattern.canonical(),
        };
        Ok((key, pattern))
    }
}

/// Identity of a route in the dispatch table.
///
/// Capture names do not take part in the identity: `/a/{x}` and `/a/{y}`
/// are the same route.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct RouteKey {
    /// HTTP method.
    #[serde(serialize_with = "serialize_method")]
    pub method: Method,
    /// Canonical pattern, captures written as `{}`.
    pub pattern: String,
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.pattern)
    }
}

fn serialize_method<S: serde::Serializer>(method: &Method, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(method.as_str())
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Capture(String),
}

/// A parsed route path pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
}

impl PathPattern {
    /// Parses a pattern such as `/weather/forecast/{city}`.
    ///
    /// A missing leading slash is tolerated and a trailing slash ignored.
    /// Empty capture names, braces inside a literal segment, and duplicate
    /// capture names are rejected.
    pub fn parse(raw: &str) -> AppResult<Self> {
        let mut segments = Vec::new();

        for part in split_path(raw) {
            if let Some(inner) = part.strip_prefix('{') {
                let name = inner.strip_suffix('}').ok_or_else(|| {
                    AppError::validation(format!("Unbalanced braces in route pattern '{raw}'"))
                })?;

                if name.is_empty() || name.contains(['{', '}']) {
                    return Err(AppError::validation(format!(
                        "Invalid capture '{part}' in route pattern '{raw}'"
                    )));
                }

                let duplicate = segments
                    .iter()
                    .any(|s| matches!(s, Segment::Capture(n) if n == name));
                if duplicate {
                    return Err(AppError::validation(format!(
                        "Duplicate capture '{name}' in route pattern '{raw}'"
                    )));
                }

                segments.push(Segment::Capture(name.to_string()));
            } else if part.contains(['{', '}']) {
                return Err(AppError::validation(format!(
                    "Unbalanced braces in route pattern '{raw}'"
                )));
            } else {
                segments.push(Segment::Literal(part.to_string()));
            }
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    /// The pattern as written.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Returns `true` if the pattern has no captures.
    pub fn is_static(&self) -> bool {
        self.segments
            .iter()
            .all(|s| matches!(s, Segment::Literal(_)))
    }

    /// Number of literal segments; more literals means a more specific route.
    pub fn specificity(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| matches!(s, Segment::Literal(_)))
            .count()
    }

    /// Normalized form used as the dispatch identity.
    pub fn canonical(&self) -> String {
        if self.segments.is_empty() {
            return "/".to_string();
        }

        self.segments
            .iter()
            .map(|s| match s {
                Segment::Literal(l) => format!("/{l}"),
                Segment::Capture(_) => "/{}".to_string(),
            })
            .collect()
    }

    /// Matches a request path, returning the captured parameters.
    pub fn matches(&self, path: &str) -> Option<HashMap<String, String>> {
        let parts: Vec<&str> = split_path(path).collect();
        if parts.len() != self.segments.len() {
            return None;
        }

        let mut params = HashMap::new();
        for (segment, part) in self.segments.iter().zip(parts) {
            match segment {
                Segment::Literal(l) if l == part => {}
                Segment::Literal(_) => return None,
                Segment::Capture(name) => {
                    params.insert(name.clone(), part.to_string());
                }
            }
        }

        Some(params)
    }
}

/// Normalizes a request path the same way patterns are normalized.
pub fn normalize_path(path: &str) -> String {
    let joined: String = split_path(path).map(|p| format!("/{p}")).collect();
    if joined.is_empty() {
        "/".to_string()
    } else {
        joined
    }
}

fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|p| !p.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_canonical_form() {
        let pattern = PathPattern::parse("/weather/forecast/{city}/").unwrap();
        assert_eq!(pattern.canonical(), "/weather/forecast/{}");
        assert!(!pattern.is_static());
        assert_eq!(pattern.specificity(), 2);

        let root = PathPattern::parse("").unwrap();
        assert_eq!(root.canonical(), "/");
        assert!(root.is_static());

        let relative = PathPattern::parse("status").unwrap();
        assert_eq!(relative.canonical(), "/status");
    }

    #[test]
    fn test_malformed_patterns_are_rejected() {
        for raw in ["/a/{}", "/a/{b", "/a/b}", "/a/x{b}", "/{id}/{id}", "/{a{b}}"] {
            assert!(PathPattern::parse(raw).is_err(), "accepted '{raw}'");
        }
    }

    #[test]
    fn test_matching_captures_params() {
        let pattern = PathPattern::parse("/weather/forecast/{city}").unwrap();

        let params = pattern.matches("/weather/forecast/oslo").unwrap();
        assert_eq!(params.get("city").map(String::as_str), Some("oslo"));

        assert!(pattern.matches("/weather/forecast").is_none());
        assert!(pattern.matches("/weather/current/oslo").is_none());
        assert!(pattern.matches("/weather/forecast/oslo/extra").is_none());
    }

    #[test]
    fn test_capture_names_do_not_change_identity() {
        let (a, _) = RouteMapping::get("a", "/items/{id}").route_key().unwrap();
        let (b, _) = RouteMapping::get("b", "/items/{item}").route_key().unwrap();
        let (c, _) = RouteMapping::post("c", "/items/{id}").route_key().unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.to_string(), "GET /items/{}");
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("//weather//current/"), "/weather/current");
        assert_eq!(normalize_path(""), "/");
    }
}
