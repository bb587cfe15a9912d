//! Case-insensitive, multi-valued header map.
//!
//! [`Headers`] keeps insertion order and remembers the casing a name was first
//! inserted with, so `X-Request-Id` stays `X-Request-Id` when echoed back while
//! lookups by `x-request-id` still match.

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
struct HeaderEntry {
    name: String,
    values: Vec<String>,
}

/// Ordered, case-insensitive, multi-valued HTTP headers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<HeaderEntry>,
}

impl Headers {
    /// Creates an empty header map.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    fn entry(&self, name: &str) -> Option<&HeaderEntry> {
        self.entries
            .iter()
            .find(|entry| entry.name.eq_ignore_ascii_case(name))
    }

    fn entry_mut(&mut self, name: &str) -> Option<&mut HeaderEntry> {
        self.entries
            .iter_mut()
            .find(|entry| entry.name.eq_ignore_ascii_case(name))
    }

    /// First value for the header, if present.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entry(name)
            .and_then(|entry| entry.values.first())
            .map(String::as_str)
    }

    /// All values for the header, in insertion order.
    #[must_use]
    pub fn get_all(&self, name: &str) -> &[String] {
        self.entry(name)
            .map(|entry| entry.values.as_slice())
            .unwrap_or_default()
    }

    /// Returns `true` if the header is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entry(name).is_some()
    }

    /// Replaces every value of the header with `value`.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.entry_mut(&name) {
            Some(entry) => entry.values = vec![value],
            None => self.entries.push(HeaderEntry {
                name,
                values: vec![value],
            }),
        }
    }

    /// Adds `value` after the existing values of the header.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.entry_mut(&name) {
            Some(entry) => entry.values.push(value),
            None => self.entries.push(HeaderEntry {
                name,
                values: vec![value],
            }),
        }
    }

    /// Removes the header, returning its values.
    pub fn remove(&mut self, name: &str) -> Vec<String> {
        let position = self
            .entries
            .iter()
            .position(|entry| entry.name.eq_ignore_ascii_case(name));
        position.map_or_else(Vec::new, |index| self.entries.remove(index).values)
    }

    /// Header names, with the casing they were first inserted with.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.name.as_str())
    }

    /// Every `(name, value)` pair; multi-valued headers yield one pair per value.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().flat_map(|entry| {
            entry
                .values
                .iter()
                .map(move |value| (entry.name.as_str(), value.as_str()))
        })
    }

    /// Number of distinct header names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no header is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Converts into an [`http::HeaderMap`] for the wire.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequest`] if a name or value is not a valid HTTP token.
    pub fn to_header_map(&self) -> Result<http::HeaderMap> {
        let mut map = http::HeaderMap::with_capacity(self.entries.len());
        for (name, value) in self.iter() {
            let name = http::HeaderName::from_bytes(name.as_bytes())
                .map_err(|err| Error::invalid_request(format!("header name '{name}': {err}")))?;
            let value = http::HeaderValue::from_str(value)
                .map_err(|err| Error::invalid_request(format!("header '{name}' value: {err}")))?;
            map.append(name, value);
        }
        Ok(map)
    }
}

impl From<&http::HeaderMap> for Headers {
    fn from(map: &http::HeaderMap) -> Self {
        map.iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.to_string(), value.to_string()))
            })
            .collect()
    }
}

impl<K, V> FromIterator<(K, V)> for Headers
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Self::new();
        headers.extend(iter);
        headers
    }
}

impl<K, V> Extend<(K, V)> for Headers
where
    K: Into<String>,
    V: Into<String>,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (name, value) in iter {
            self.append(name, value);
        }
    }
}

/// Single-valued headers serialize as a string, multi-valued ones as an array.
impl Serialize for Headers {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for entry in &self.entries {
            match entry.values.as_slice() {
                [single] => map.serialize_entry(&entry.name, single)?,
                values => map.serialize_entry(&entry.name, values)?,
            }
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use assert2::{check, let_assert};

    use super::*;

    #[test]
    fn lookup_is_case_insensitive() {
        let mut headers = Headers::new();
        headers.set("Content-Type", "application/json");

        check!(headers.get("content-type") == Some("application/json"));
        check!(headers.get("CONTENT-TYPE") == Some("application/json"));
        check!(headers.contains("Content-type"));
        check!(headers.names().collect::<Vec<_>>() == ["Content-Type"]);
    }

    #[test]
    fn set_replaces_and_keeps_first_casing() {
        let mut headers = Headers::new();
        headers.append("X-Trace", "a");
        headers.append("x-trace", "b");
        check!(headers.get_all("X-TRACE") == ["a", "b"]);

        headers.set("x-TRACE", "c");
        check!(headers.get_all("x-trace") == ["c"]);
        check!(headers.names().collect::<Vec<_>>() == ["X-Trace"]);
        check!(headers.len() == 1);
    }

    #[test]
    fn remove_returns_values() {
        let mut headers: Headers = [("Accept", "text/plain"), ("accept", "text/html")]
            .into_iter()
            .collect();

        check!(headers.remove("ACCEPT") == ["text/plain", "text/html"]);
        check!(headers.is_empty());
        check!(headers.remove("Accept").is_empty());
    }

    #[test]
    fn iter_yields_one_pair_per_value() {
        let headers: Headers = [("A", "1"), ("B", "2"), ("a", "3")].into_iter().collect();
        let pairs: Vec<_> = headers.iter().collect();
        check!(pairs == [("A", "1"), ("A", "3"), ("B", "2")]);
    }

    #[test]
    fn serializes_as_json_object() {
        let headers: Headers = [("X-A", "1"), ("X-B", "2"), ("X-B", "3")]
            .into_iter()
            .collect();
        let value = serde_json::to_value(&headers).expect("serialize");
        check!(value == serde_json::json!({"X-A": "1", "X-B": ["2", "3"]}));
    }

    #[test]
    fn header_map_conversion() {
        let headers: Headers = [("Accept", "application/json"), ("X-Id", "7")]
            .into_iter()
            .collect();
        let map = headers.to_header_map().expect("valid headers");
        check!(map.get("accept").map(|v| v.as_bytes()) == Some(&b"application/json"[..]));

        let back = Headers::from(&map);
        check!(back.get("x-id") == Some("7"));
    }

    #[test]
    fn invalid_header_name_is_rejected() {
        let headers: Headers = [("bad name", "x")].into_iter().collect();
        let_assert!(Err(Error::InvalidRequest(message)) = headers.to_header_map());
        check!(message.contains("bad name"));
    }
}
