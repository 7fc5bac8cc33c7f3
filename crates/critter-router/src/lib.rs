//! Ordered regex route registry for critter.
//!
//! Routes bind an HTTP method and a path pattern to a handler value. The
//! registry is generic over the handler type so the server can store its
//! own handler enum while this crate stays free of any transport concerns.
//!
//! # Matching rules
//!
//! - Patterns are regular expressions anchored to the whole path, so
//!   `/hello` never matches `/hello/world`.
//! - Routes are tried in insertion order and the first match wins.
//! - A method mismatch is a miss, not a `405`.
//!
//! # Example
//!
//! ```rust
//! use critter_router::Registry;
//! use http::Method;
//!
//! let mut registry = Registry::new();
//! registry.add(Method::GET, "/users/([0-9]+)", "getUser").unwrap();
//! registry.add(Method::GET, "/static(/.*)", "serveFile").unwrap();
//!
//! let found = registry.resolve(&Method::GET, "/users/42").unwrap();
//! assert_eq!(*found.handler, "getUser");
//! assert_eq!(found.captures.get(1), Some("42"));
//!
//! assert!(registry.resolve(&Method::POST, "/users/42").is_err());
//! ```

mod captures;
mod error;
mod registry;

pub use captures::Captures;
pub use error::{RouteError, RouteNotFound};
pub use registry::{Registry, Route, RouteMatch};

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;

    #[test]
    fn test_basic_resolution() {
        let mut registry = Registry::new();
        registry.add(Method::GET, "/hello", 1).unwrap();
        registry.add(Method::POST, "/hello", 2).unwrap();

        assert_eq!(*registry.resolve(&Method::GET, "/hello").unwrap().handler, 1);
        assert_eq!(*registry.resolve(&Method::POST, "/hello").unwrap().handler, 2);
    }

    #[test]
    fn test_directory_wildcard() {
        let mut registry = Registry::new();
        registry.add(Method::GET, "/assets(/.*)", "files").unwrap();

        let found = registry.resolve(&Method::GET, "/assets/css/site.css").unwrap();
        assert_eq!(found.captures.get(1), Some("/css/site.css"));
        assert!(registry.resolve(&Method::GET, "/assets").is_err());
        assert!(registry.resolve(&Method::GET, "/assetsx/a").is_err());
    }

    #[test]
    fn test_not_found_reports_target() {
        let registry: Registry<()> = Registry::new();
        let err = registry.resolve(&Method::DELETE, "/missing").unwrap_err();
        assert_eq!(err.path(), "/missing");
        assert_eq!(err.method(), &Method::DELETE);
    }
}
