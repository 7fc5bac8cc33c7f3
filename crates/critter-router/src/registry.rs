//! The route table.

use http::Method;
use regex::Regex;

use crate::captures::Captures;
use crate::error::{RouteError, RouteNotFound};

/// A registered (method, pattern) binding.
#[derive(Debug, Clone)]
pub struct Route<H> {
    method: Method,
    pattern: String,
    regex: Regex,
    handler: H,
}

impl<H> Route<H> {
    /// The method this route answers.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The pattern as it was registered, before anchoring.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// The bound handler.
    pub fn handler(&self) -> &H {
        &self.handler
    }

    fn matches(&self, method: &Method, path: &str) -> Option<Captures> {
        if self.method != *method {
            return None;
        }
        self.regex
            .captures(path)
            .map(|caps| Captures::from_regex(&self.regex, &caps))
    }
}

/// A successful resolution.
#[derive(Debug)]
pub struct RouteMatch<'a, H> {
    /// The handler of the first matching route.
    pub handler: &'a H,
    /// Capture groups from the path.
    pub captures: Captures,
    /// The pattern that matched.
    pub pattern: &'a str,
}

/// Ordered table of routes.
///
/// Lookup is a linear scan. Route tables are small and mostly static after
/// startup, so insertion order doubles as the priority order.
#[derive(Debug, Clone)]
pub struct Registry<H> {
    routes: Vec<Route<H>>,
}

impl<H> Default for Registry<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> Registry<H> {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self { routes: Vec::new() }
    }

    /// Registers a route.
    ///
    /// The pattern is wrapped as `^(?:pattern)$` so it must match the whole
    /// path. No uniqueness check is made; an earlier overlapping route
    /// shadows later ones.
    pub fn add(
        &mut self,
        method: Method,
        pattern: impl Into<String>,
        handler: H,
    ) -> Result<(), RouteError> {
        let pattern = pattern.into();
        let regex =
            Regex::new(&format!("^(?:{pattern})$")).map_err(|source| RouteError::InvalidPattern {
                pattern: pattern.clone(),
                source,
            })?;
        self.routes.push(Route {
            method,
            pattern,
            regex,
            handler,
        });
        Ok(())
    }

    /// Resolves a request to the first matching route.
    ///
    /// `path` should be the request path without the query string.
    pub fn resolve(&self, method: &Method, path: &str) -> Result<RouteMatch<'_, H>, RouteNotFound> {
        self.routes
            .iter()
            .find_map(|route| {
                route.matches(method, path).map(|captures| RouteMatch {
                    handler: &route.handler,
                    captures,
                    pattern: &route.pattern,
                })
            })
            .ok_or_else(|| RouteNotFound::new(method, path))
    }

    /// Number of registered routes.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Returns true if no routes are registered.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Iterates over routes in registration order.
    pub fn routes(&self) -> impl Iterator<Item = &Route<H>> {
        self.routes.iter()
    }
}
