//! Capture groups extracted from a matched path.
//!
//! Values are stored inline for the common case of a handful of groups.

use smallvec::SmallVec;

/// Number of groups stored without a heap allocation.
const INLINE_CAPTURES: usize = 4;

/// Capture groups from a route match.
///
/// Index `0` is always the whole path. Positional groups follow in pattern
/// order; groups that did not participate in the match are `None`. Named
/// groups (`(?P<name>...)`) are also reachable by name.
///
/// # Example
///
/// ```rust
/// use critter_router::Registry;
/// use http::Method;
///
/// let mut registry = Registry::new();
/// registry.add(Method::GET, "/orgs/(?P<org>[^/]+)/repos/([^/]+)", ()).unwrap();
///
/// let found = registry.resolve(&Method::GET, "/orgs/acme/repos/anvil").unwrap();
/// assert_eq!(found.captures.name("org"), Some("acme"));
/// assert_eq!(found.captures.get(2), Some("anvil"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Captures {
    positional: SmallVec<[Option<String>; INLINE_CAPTURES]>,
    named: SmallVec<[(String, String); INLINE_CAPTURES]>,
}

impl Captures {
    /// Creates an empty capture set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_regex(regex: &regex::Regex, caps: &regex::Captures<'_>) -> Self {
        let positional = caps
            .iter()
            .map(|m| m.map(|m| m.as_str().to_string()))
            .collect();
        let named = regex
            .capture_names()
            .flatten()
            .filter_map(|name| caps.name(name).map(|m| (name.to_string(), m.as_str().to_string())))
            .collect();
        Self { positional, named }
    }

    /// Returns the group at `index`, if it participated in the match.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&str> {
        self.positional.get(index).and_then(|v| v.as_deref())
    }

    /// Returns a named group.
    #[must_use]
    pub fn name(&self, name: &str) -> Option<&str> {
        self.named
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Returns the last participating group, or the whole match when the
    /// pattern has no groups.
    ///
    /// Suffix-wildcard routes such as `/static(/.*)` keep the remainder in
    /// their final group, which is what file serving needs.
    #[must_use]
    pub fn tail(&self) -> Option<&str> {
        self.positional.iter().rev().find_map(|v| v.as_deref())
    }

    /// Number of groups, including the implicit whole-match group.
    #[must_use]
    pub fn len(&self) -> usize {
        self.positional.len()
    }

    /// Returns true when nothing was captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positional.is_empty()
    }

    /// Iterates over the named groups.
    pub fn named(&self) -> impl Iterator<Item = (&str, &str)> {
        self.named.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;

    fn capture(pattern: &str, path: &str) -> Captures {
        let regex = Regex::new(pattern).unwrap();
        let caps = regex.captures(path).unwrap();
        Captures::from_regex(&regex, &caps)
    }

    #[test]
    fn test_whole_match_is_index_zero() {
        let caps = capture("^/a/(b)$", "/a/b");
        assert_eq!(caps.get(0), Some("/a/b"));
        assert_eq!(caps.get(1), Some("b"));
        assert_eq!(caps.len(), 2);
    }

    #[test]
    fn test_optional_group_absent() {
        let caps = capture("^/a(/x)?(/y)?$", "/a/y");
        assert_eq!(caps.get(1), None);
        assert_eq!(caps.get(2), Some("/y"));
        assert_eq!(caps.get(9), None);
    }

    #[test]
    fn test_named_groups() {
        let caps = capture("^/u/(?P<id>[0-9]+)$", "/u/7");
        assert_eq!(caps.name("id"), Some("7"));
        assert_eq!(caps.name("other"), None);
        assert_eq!(caps.named().count(), 1);
    }

    #[test]
    fn test_tail_prefers_last_group() {
        let caps = capture("^/static(/.*)$", "/static/app.js");
        assert_eq!(caps.tail(), Some("/app.js"));

        let caps = capture("^/plain$", "/plain");
        assert_eq!(caps.tail(), Some("/plain"));
    }

    #[test]
    fn test_empty() {
        let caps = Captures::new();
        assert!(caps.is_empty());
        assert_eq!(caps.tail(), None);
    }
}
