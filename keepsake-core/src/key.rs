//! Cache key types and derivation.
//!
//! This module provides:
//!
//! - [`CacheKey`] - The string identifying a cached entry
//! - [`KeyGenerator`] - Derives a key from a [`RequestDescriptor`]
//! - [`PruneSet`] - Names excluded from key derivation
//!
//! ## Format
//!
//! Keys are compact JSON documents with a fixed field order:
//!
//! ```text
//! {"method":"GET","uri":"http://localhost:3000/one","params":null,"options":{}}
//! ```
//!
//! - `uri` is the request URI without its query string
//! - `params` is `null` when the URI has no query string, otherwise the query
//!   parameters in request order (a repeated name keeps its last value)
//! - `options` holds the request headers sorted by name, minus the pruned ones
//!
//! ```
//! use http::{HeaderMap, Method};
//! use keepsake_core::{KeyGenerator, PruneSet, RequestDescriptor};
//!
//! let request = RequestDescriptor::new(
//!     Method::GET,
//!     "http://localhost:3000/one?page=1&token=abc".parse().unwrap(),
//!     HeaderMap::new(),
//! );
//! let prune_query: PruneSet = ["token"].into_iter().collect();
//! let key = KeyGenerator::generate(&request, &prune_query, &PruneSet::default());
//!
//! assert_eq!(
//!     key.as_str(),
//!     r#"{"method":"GET","uri":"http://localhost:3000/one","params":{"page":"1"},"options":{}}"#
//! );
//! ```

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use http::Method;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::request::RequestDescriptor;

/// Headers that never take part in a key.
///
/// Conditional headers are revalidation artifacts, `cache-control` carries the
/// per-call expiration override and `user-agent` is transport noise.
const ALWAYS_PRUNED_HEADERS: [&str; 4] = [
    "if-none-match",
    "if-modified-since",
    "cache-control",
    "user-agent",
];

/// A cache key identifying a cached entry.
///
/// `CacheKey` wraps its string in [`Arc`], so cloning only increments a
/// reference count.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct CacheKey(Arc<str>);

impl CacheKey {
    /// Wraps an already derived key string.
    pub fn new(key: impl Into<Arc<str>>) -> Self {
        CacheKey(key.into())
    }

    /// The key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Estimated memory usage in bytes: struct overhead plus string length.
    pub fn memory_size(&self) -> usize {
        std::mem::size_of::<Self>() + self.0.len()
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for CacheKey {
    fn from(key: String) -> Self {
        CacheKey(key.into())
    }
}

impl From<CacheKey> for String {
    fn from(key: CacheKey) -> Self {
        key.0.as_ref().to_owned()
    }
}

/// Set of query parameter or header names excluded from key derivation.
///
/// Pruning only affects the key: the outgoing call still carries every
/// parameter and header.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PruneSet(BTreeSet<String>);

impl PruneSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `name` is in the set, compared exactly.
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(name)
    }

    /// Whether `name` is in the set, compared ASCII case-insensitively.
    pub fn contains_ignore_case(&self, name: &str) -> bool {
        self.0.iter().any(|item| item.eq_ignore_ascii_case(name))
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over the names in the set.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for PruneSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        PruneSet(iter.into_iter().map(Into::into).collect())
    }
}

/// Derives deterministic cache keys from request snapshots.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyGenerator;

impl KeyGenerator {
    /// Derives the key of `request`.
    ///
    /// `prune_query` names are matched exactly, `prune_header` names
    /// case-insensitively.
    pub fn generate(
        request: &RequestDescriptor,
        prune_query: &PruneSet,
        prune_header: &PruneSet,
    ) -> CacheKey {
        Self::generate_for_method(request, request.method(), prune_query, prune_header)
    }

    /// Derives the key `request` would have if it were issued with `method`.
    pub fn generate_for_method(
        request: &RequestDescriptor,
        method: &Method,
        prune_query: &PruneSet,
        prune_header: &PruneSet,
    ) -> CacheKey {
        let params = request.cache_params(prune_query).map(|pairs| {
            pairs
                .into_iter()
                .map(|(name, value)| (name, Value::String(value)))
                .collect::<Map<String, Value>>()
        });

        let mut headers: BTreeMap<String, String> = BTreeMap::new();
        for (name, value) in request.headers() {
            let name = name.as_str();
            if ALWAYS_PRUNED_HEADERS.contains(&name) || prune_header.contains_ignore_case(name) {
                continue;
            }
            let value = String::from_utf8_lossy(value.as_bytes());
            match headers.entry(name.to_owned()) {
                Entry::Occupied(mut entry) => {
                    let joined = entry.get_mut();
                    joined.push_str(", ");
                    joined.push_str(&value);
                }
                Entry::Vacant(entry) => {
                    entry.insert(value.into_owned());
                }
            }
        }
        let options: Map<String, Value> = headers
            .into_iter()
            .map(|(name, value)| (name, Value::String(value)))
            .collect();

        let repr = json!({
            "method": method.as_str(),
            "uri": request.base_uri(),
            "params": params,
            "options": options,
        });
        CacheKey::new(repr.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{HeaderMap, HeaderValue};

    fn request(method: Method, uri: &str, headers: &[(&'static str, &'static str)]) -> RequestDescriptor {
        let mut map = HeaderMap::new();
        for (name, value) in headers {
            map.append(*name, HeaderValue::from_static(value));
        }
        RequestDescriptor::new(method, uri.parse().unwrap(), map)
    }

    fn none() -> PruneSet {
        PruneSet::default()
    }

    #[test]
    fn test_key_format_without_query() {
        let key = KeyGenerator::generate(
            &request(Method::GET, "http://localhost:3000/one", &[]),
            &none(),
            &none(),
        );
        assert_eq!(
            key.as_str(),
            r#"{"method":"GET","uri":"http://localhost:3000/one","params":null,"options":{}}"#
        );
    }

    #[test]
    fn test_pruned_query_does_not_influence_key() {
        let prune: PruneSet = ["token"].into_iter().collect();
        let first = request(Method::GET, "http://localhost/items?page=1&token=a", &[]);
        let second = request(Method::GET, "http://localhost/items?page=1&token=b", &[]);
        assert_eq!(
            KeyGenerator::generate(&first, &prune, &none()),
            KeyGenerator::generate(&second, &prune, &none()),
        );
        assert_ne!(
            KeyGenerator::generate(&first, &none(), &none()),
            KeyGenerator::generate(&second, &none(), &none()),
        );
    }

    #[test]
    fn test_pruned_header_is_case_insensitive() {
        let prune: PruneSet = ["X-Request-Id"].into_iter().collect();
        let first = request(Method::GET, "http://localhost/one", &[("x-request-id", "1")]);
        let second = request(Method::GET, "http://localhost/one", &[("x-request-id", "2")]);
        assert_eq!(
            KeyGenerator::generate(&first, &none(), &prune),
            KeyGenerator::generate(&second, &none(), &prune),
        );
    }

    #[test]
    fn test_conditional_headers_never_in_key() {
        let plain = request(Method::GET, "http://localhost/one", &[("accept", "application/json")]);
        let conditional = request(
            Method::GET,
            "http://localhost/one",
            &[
                ("accept", "application/json"),
                ("if-none-match", "\"abc\""),
                ("if-modified-since", "Tue, 01 Jan 2030 00:00:00 GMT"),
                ("cache-control", "max-age=60"),
            ],
        );
        let key = KeyGenerator::generate(&conditional, &none(), &none());
        assert_eq!(KeyGenerator::generate(&plain, &none(), &none()), key);
        assert!(key.as_str().contains(r#""options":{"accept":"application/json"}"#));
    }

    #[test]
    fn test_headers_sorted_and_joined() {
        let req = request(
            Method::GET,
            "http://localhost/one",
            &[("x-b", "2"), ("x-a", "1"), ("x-b", "3")],
        );
        let key = KeyGenerator::generate(&req, &none(), &none());
        assert!(key.as_str().ends_with(r#""options":{"x-a":"1","x-b":"2, 3"}}"#));
    }

    #[test]
    fn test_generate_for_method_substitutes_method() {
        let post = request(Method::POST, "http://localhost/one", &[]);
        let get = request(Method::GET, "http://localhost/one", &[]);
        assert_eq!(
            KeyGenerator::generate_for_method(&post, &Method::GET, &none(), &none()),
            KeyGenerator::generate(&get, &none(), &none()),
        );
    }

    #[test]
    fn test_empty_query_after_pruning_is_an_object() {
        let prune: PruneSet = ["token"].into_iter().collect();
        let key = KeyGenerator::generate(
            &request(Method::GET, "http://localhost/one?token=a", &[]),
            &prune,
            &none(),
        );
        assert!(key.as_str().contains(r#""params":{}"#));
    }
}
