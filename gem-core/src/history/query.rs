//! Query strings and location resolution.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use url::{form_urlencoded, Url};

use crate::error::{GemError, Result};

/// Origin used to resolve relative paths; never leaves this module.
const RESOLVE_ORIGIN: &str = "http://gem.invalid";

/// An ordered, multi-valued query string.
///
/// Renders with a leading `?`, or as the empty string when there are no
/// pairs, so it can be appended to a path directly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryString {
    pairs: Vec<(String, String)>,
}

impl QueryString {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `a=1&b=2`, with or without a leading `?`.
    pub fn parse(input: &str) -> Self {
        let input = input.strip_prefix('?').unwrap_or(input);
        Self {
            pairs: form_urlencoded::parse(input.as_bytes()).into_owned().collect(),
        }
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            pairs: pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }

    /// First value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn get_all(&self, key: &str) -> Vec<&str> {
        self.pairs
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    pub fn append(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.pairs.push((key.into(), value.into()));
    }

    /// Replace every value of `key` with a single `value`.
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self.pairs.iter().position(|(k, _)| k == key) {
            Some(first) => {
                self.pairs[first].1 = value;
                let mut index = 0;
                self.pairs.retain(|(k, _)| {
                    let keep = k != key || index == first;
                    index += 1;
                    keep
                });
            }
            None => self.pairs.push((key.to_string(), value)),
        }
    }

    pub fn delete(&mut self, key: &str) {
        self.pairs.retain(|(k, _)| k != key);
    }

    /// Append every pair of `other`.
    pub fn concat(&mut self, other: &QueryString) {
        self.pairs.extend(other.pairs.iter().cloned());
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl fmt::Display for QueryString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.pairs.is_empty() {
            return Ok(());
        }
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        serializer.extend_pairs(self.pairs.iter());
        write!(f, "?{}", serializer.finish())
    }
}

impl FromStr for QueryString {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl From<&str> for QueryString {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

impl Serialize for QueryString {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for QueryString {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}

/// Resolve `relative` against `current` the way a browser resolves a link.
pub(crate) fn resolve(current: &str, relative: &str) -> Result<Url> {
    let base = if current.starts_with('/') {
        format!("{RESOLVE_ORIGIN}{current}")
    } else {
        format!("{RESOLVE_ORIGIN}/{current}")
    };
    Url::parse(&base)
        .and_then(|base| base.join(relative))
        .map_err(|_| GemError::InvalidLocation(relative.to_string()))
}

/// Resolve `relative` against `current`, returning path, query and fragment.
pub fn absolute_location(current: &str, relative: &str) -> Result<String> {
    let url = resolve(current, relative)?;
    let mut location = url.path().to_string();
    if let Some(query) = url.query() {
        location.push('?');
        location.push_str(query);
    }
    if let Some(fragment) = url.fragment() {
        location.push('#');
        location.push_str(fragment);
    }
    Ok(location)
}

/// Split a URL-bar string into `(path, query, hash)`.
pub(crate) fn split_url(url: &str) -> (String, QueryString, String) {
    let (rest, hash) = match url.find('#') {
        Some(index) => (&url[..index], url[index..].to_string()),
        None => (url, String::new()),
    };
    let (path, query) = match rest.find('?') {
        Some(index) => (&rest[..index], QueryString::parse(&rest[index..])),
        None => (rest, QueryString::new()),
    };
    let path = if path.is_empty() { "/" } else { path };
    (path.to_string(), query, hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absolute_location_resolves_relative_paths() {
        assert_eq!(absolute_location("/a", "/a/b").unwrap(), "/a/b");
        assert_eq!(absolute_location("/a/c", "./b").unwrap(), "/a/b");
        assert_eq!(absolute_location("/a/c/d", "../b").unwrap(), "/a/b");
        assert_eq!(absolute_location("/a", "b?x=1#top").unwrap(), "/b?x=1#top");
    }

    #[test]
    fn query_string_round_trips_through_display() {
        assert_eq!(QueryString::parse("").to_string(), "");
        let mut query = QueryString::parse("a=1&b=2");
        assert_eq!(query.to_string(), "?a=1&b=2");
        assert_eq!(query.get("a"), Some("1"));

        query.concat(&QueryString::parse("?c=3"));
        assert_eq!(query.get("c"), Some("3"));
        query.append("d", "4");
        assert_eq!(query.to_string(), "?a=1&b=2&c=3&d=4");
        assert_eq!(QueryString::from_pairs([("a", "1")]).to_string(), "?a=1");
    }

    #[test]
    fn query_string_encodes_values() {
        let query = QueryString::from_pairs([("q", "a b&c")]);
        assert_eq!(query.to_string(), "?q=a+b%26c");
        assert_eq!(QueryString::parse(&query.to_string()).get("q"), Some("a b&c"));
    }

    #[test]
    fn set_and_delete() {
        let mut query = QueryString::parse("tab=a&x=1&tab=b");
        assert_eq!(query.get_all("tab"), vec!["a", "b"]);
        query.set("tab", "c");
        assert_eq!(query.to_string(), "?tab=c&x=1");
        query.delete("x");
        query.set("new", "1");
        assert_eq!(query.to_string(), "?tab=c&new=1");
    }

    #[test]
    fn serializes_as_a_string() {
        let query = QueryString::parse("a=1");
        assert_eq!(serde_json::to_string(&query).unwrap(), r#""?a=1""#);
        let back: QueryString = serde_json::from_str(r#""?a=1""#).unwrap();
        assert_eq!(back, query);
    }

    #[test]
    fn split_url_parts() {
        let (path, query, hash) = split_url("/a/b?x=1#h");
        assert_eq!(path, "/a/b");
        assert_eq!(query.get("x"), Some("1"));
        assert_eq!(hash, "#h");
        assert_eq!(split_url("").0, "/");
    }
}
