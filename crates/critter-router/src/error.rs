//! Route registration and resolution errors.

use http::Method;
use thiserror::Error;

/// Errors raised while registering a route.
#[derive(Debug, Error)]
pub enum RouteError {
    /// The path pattern is not a valid regular expression.
    #[error("invalid route pattern '{pattern}': {source}")]
    InvalidPattern {
        /// The pattern as supplied by the caller.
        pattern: String,
        /// The underlying regex compilation error.
        #[source]
        source: regex::Error,
    },
}

/// No registered route matched a request.
///
/// This is the ordinary miss outcome of [`crate::Registry::resolve`], not
/// a failure of the registry itself.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no route for {method} {path}")]
pub struct RouteNotFound {
    method: Method,
    path: String,
}

impl RouteNotFound {
    pub(crate) fn new(method: &Method, path: &str) -> Self {
        Self {
            method: method.clone(),
            path: path.to_string(),
        }
    }

    /// The method of the unresolved request.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The path of the unresolved request.
    pub fn path(&self) -> &str {
        &self.path
    }
}
