//! The navigation location shared between surfaces: a path plus flat
//! key/value query parameters, serialized as a URL-shaped string.
//!
//! This is the canonical wire format of the view state broadcast, so
//! parsing is strict about shape (path-absolute) but tolerant about
//! content; a subscriber that receives garbage keeps its last good
//! location instead of crashing.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub path: String,
    /// Insertion-ordered; `set_param` overwrites in place so repeated
    /// writes keep a stable serialization.
    pub query: Vec<(String, String)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocationParseError;

impl fmt::Display for LocationParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("location must be a path-absolute URL")
    }
}

impl Location {
    pub fn root() -> Self {
        Self {
            path: "/".to_string(),
            query: Vec::new(),
        }
    }

    /// Parse `/path?a=1&b=2`. Accepts full URLs by stripping a scheme
    /// and authority prefix; anything without a `/`-rooted path is an
    /// error.
    pub fn parse(raw: &str) -> Result<Self, LocationParseError> {
        let trimmed = raw.trim();
        let rest = match trimmed.find("://") {
            Some(idx) => {
                let after_scheme = &trimmed[idx + 3..];
                match after_scheme.find('/') {
                    Some(slash) => &after_scheme[slash..],
                    None => "/",
                }
            }
            None => trimmed,
        };
        if !rest.starts_with('/') {
            return Err(LocationParseError);
        }

        let (path, query_str) = match rest.split_once('?') {
            Some((path, query)) => (path, query),
            None => (rest, ""),
        };
        let query = query_str
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| match pair.split_once('=') {
                Some((key, value)) => (key.to_string(), value.to_string()),
                None => (pair.to_string(), String::new()),
            })
            .collect();

        Ok(Self {
            path: path.to_string(),
            query,
        })
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Set a query parameter, overwriting an existing value in place
    /// and preserving every unrelated key.
    pub fn set_param(&mut self, key: &str, value: &str) {
        if let Some(entry) = self.query.iter_mut().find(|(k, _)| k == key) {
            entry.1 = value.to_string();
        } else {
            self.query.push((key.to_string(), value.to_string()));
        }
    }

    /// Selection encoded in the path (`/<marker-id>`), if any.
    pub fn selection(&self) -> Option<&str> {
        let id = self.path.strip_prefix('/')?;
        if id.is_empty() { None } else { Some(id) }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)?;
        for (i, (key, value)) in self.query.iter().enumerate() {
            f.write_str(if i == 0 { "?" } else { "&" })?;
            write!(f, "{key}={value}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_path_and_query() {
        let loc = Location::parse("/abc123?x=10224.5&y=6401&zoom=4").unwrap();
        assert_eq!(loc.path, "/abc123");
        assert_eq!(loc.param("x"), Some("10224.5"));
        assert_eq!(loc.param("zoom"), Some("4"));
        assert_eq!(loc.selection(), Some("abc123"));
    }

    #[test]
    fn strips_origin_from_full_urls() {
        let loc = Location::parse("https://map.example.com/?zoom=3").unwrap();
        assert_eq!(loc.path, "/");
        assert_eq!(loc.param("zoom"), Some("3"));
        assert_eq!(loc.selection(), None);
    }

    #[test]
    fn rejects_relative_garbage() {
        assert!(Location::parse("not a url").is_err());
        assert!(Location::parse("").is_err());
    }

    #[test]
    fn set_param_overwrites_in_place_and_appends_new_keys() {
        let mut loc = Location::parse("/?x=1&mapFilters=ore,wood").unwrap();
        loc.set_param("x", "2");
        loc.set_param("y", "3");
        assert_eq!(loc.to_string(), "/?x=2&mapFilters=ore,wood&y=3");
    }

    #[test]
    fn display_round_trips() {
        for raw in ["/", "/marker1?x=1&y=2&zoom=3", "/?mapFilters="] {
            let loc = Location::parse(raw).unwrap();
            assert_eq!(Location::parse(&loc.to_string()).unwrap(), loc);
        }
    }
}
