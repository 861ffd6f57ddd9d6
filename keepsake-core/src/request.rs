//! Outgoing request snapshot.
//!
//! [`RequestDescriptor`] is the immutable view of a call the interceptor makes
//! its decisions on: method, full URI (query included) and headers. It is
//! taken once per call and handed to the transport when the network is
//! actually needed. The body travels with it but never takes part in a
//! cache decision.

use bytes::Bytes;
use http::header::{HeaderMap, HeaderName, HeaderValue};
use http::uri::{PathAndQuery, Uri};
use http::{Method, Request};

use crate::key::PruneSet;

/// How the interceptor treats a request method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodClass {
    /// `GET` and `HEAD`: looked up in and stored to the cache.
    Cacheable,
    /// `POST`, `PUT`, `PATCH` and `DELETE`: forwarded, then invalidate the resource.
    Unsafe,
    /// Any other verb: forwarded untouched, no key is ever computed.
    Unsupported,
}

impl MethodClass {
    /// Classifies a request method.
    pub fn of(method: &Method) -> Self {
        if method == Method::GET || method == Method::HEAD {
            MethodClass::Cacheable
        } else if method == Method::POST
            || method == Method::PUT
            || method == Method::PATCH
            || method == Method::DELETE
        {
            MethodClass::Unsafe
        } else {
            MethodClass::Unsupported
        }
    }
}

/// Immutable snapshot of an outgoing HTTP call.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
}

impl RequestDescriptor {
    /// Creates a body-less descriptor from its parts.
    pub fn new(method: Method, uri: Uri, headers: HeaderMap) -> Self {
        Self {
            method,
            uri,
            headers,
            body: Bytes::new(),
        }
    }

    /// Returns a copy carrying `body`.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Request method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Full request URI, query string included.
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Request headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Request body, empty when none was given.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Method class used for dispatch.
    pub fn class(&self) -> MethodClass {
        MethodClass::of(&self.method)
    }

    /// URI without its query string: `scheme://authority/path` for absolute
    /// URIs, the bare path otherwise.
    pub fn base_uri(&self) -> String {
        match (self.uri.scheme_str(), self.uri.authority()) {
            (Some(scheme), Some(authority)) => {
                format!("{scheme}://{authority}{}", self.uri.path())
            }
            _ => self.uri.path().to_owned(),
        }
    }

    /// Query parameters in request order.
    ///
    /// Returns `None` when the URI carries no query string at all. A query
    /// string that cannot be decoded yields an empty list.
    pub fn query_params(&self) -> Option<Vec<(String, String)>> {
        self.uri
            .query()
            .map(|query| serde_urlencoded::from_str(query).unwrap_or_default())
    }

    /// Returns a copy with `name` set to `value`, replacing previous values.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Returns a copy with every header of `headers` set, replacing previous values.
    pub fn with_headers(mut self, headers: &HeaderMap) -> Self {
        for name in headers.keys() {
            self.headers.remove(name);
        }
        for (name, value) in headers {
            self.headers.append(name.clone(), value.clone());
        }
        self
    }

    /// Query parameters as the cache sees them.
    ///
    /// Pruned names are dropped. A repeated name keeps its first position and
    /// its last value. `None` when the URI carries no query string.
    pub fn cache_params(&self, prune: &PruneSet) -> Option<Vec<(String, String)>> {
        let pairs = self.query_params()?;
        let mut params: Vec<(String, String)> = Vec::with_capacity(pairs.len());
        for (name, value) in pairs {
            if prune.contains(&name) {
                continue;
            }
            match params.iter_mut().find(|(seen, _)| *seen == name) {
                Some(slot) => slot.1 = value,
                None => params.push((name, value)),
            }
        }
        Some(params)
    }

    /// Returns a copy whose query string is rebuilt from
    /// [`cache_params`](Self::cache_params).
    ///
    /// The cache policy is evaluated against this view. The query is always
    /// re-encoded, so two requests sharing a cache key also share a policy
    /// URI whatever the percent-encoding of the originals.
    pub fn without_query_params(&self, prune: &PruneSet) -> Self {
        let Some(params) = self.cache_params(prune) else {
            return self.clone();
        };

        let mut path_and_query = self.uri.path().to_owned();
        if !params.is_empty() {
            let Ok(query) = serde_urlencoded::to_string(&params) else {
                return self.clone();
            };
            path_and_query.push('?');
            path_and_query.push_str(&query);
        }

        let mut parts = self.uri.clone().into_parts();
        parts.path_and_query = PathAndQuery::try_from(path_and_query).ok();
        match Uri::from_parts(parts) {
            Ok(uri) => Self {
                uri,
                ..self.clone()
            },
            Err(_) => self.clone(),
        }
    }

    /// Body-less `http::Request` view used by the cache policy primitive.
    pub fn to_http(&self) -> Request<()> {
        let mut request = Request::new(());
        *request.method_mut() = self.method.clone();
        *request.uri_mut() = self.uri.clone();
        *request.headers_mut() = self.headers.clone();
        request
    }
}

impl<B> From<&Request<B>> for RequestDescriptor {
    fn from(request: &Request<B>) -> Self {
        Self::new(
            request.method().clone(),
            request.uri().clone(),
            request.headers().clone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get(uri: &str) -> RequestDescriptor {
        RequestDescriptor::new(Method::GET, uri.parse().unwrap(), HeaderMap::new())
    }

    #[test]
    fn test_method_classes() {
        assert_eq!(MethodClass::of(&Method::GET), MethodClass::Cacheable);
        assert_eq!(MethodClass::of(&Method::HEAD), MethodClass::Cacheable);
        assert_eq!(MethodClass::of(&Method::PATCH), MethodClass::Unsafe);
        assert_eq!(MethodClass::of(&Method::DELETE), MethodClass::Unsafe);
        assert_eq!(MethodClass::of(&Method::OPTIONS), MethodClass::Unsupported);
        assert_eq!(MethodClass::of(&Method::TRACE), MethodClass::Unsupported);
    }

    #[test]
    fn test_base_uri_drops_query() {
        let request = get("http://localhost:3000/one?page=2");
        assert_eq!(request.base_uri(), "http://localhost:3000/one");
        assert_eq!(get("/relative?x=1").base_uri(), "/relative");
    }

    #[test]
    fn test_query_params_keep_order() {
        let request = get("http://localhost/search?b=2&a=1&b=3");
        assert_eq!(
            request.query_params().unwrap(),
            vec![
                ("b".to_owned(), "2".to_owned()),
                ("a".to_owned(), "1".to_owned()),
                ("b".to_owned(), "3".to_owned()),
            ]
        );
        assert!(get("http://localhost/search").query_params().is_none());
    }

    #[test]
    fn test_without_query_params() {
        let prune: PruneSet = ["token"].into_iter().collect();
        let request = get("http://localhost/items?page=1&token=abc");
        assert_eq!(
            request.without_query_params(&prune).uri().to_string(),
            "http://localhost/items?page=1"
        );

        let only_pruned = get("http://localhost/items?token=abc");
        assert_eq!(
            only_pruned.without_query_params(&prune).uri().to_string(),
            "http://localhost/items"
        );
    }

    #[test]
    fn test_policy_uri_is_canonical() {
        let prune: PruneSet = ["_"].into_iter().collect();
        let with_buster = get("http://localhost/s?q=a%20b&_=1").without_query_params(&prune);
        let without = get("http://localhost/s?q=a%20b").without_query_params(&prune);
        assert_eq!(with_buster.uri(), without.uri());
        assert_eq!(without.uri().to_string(), "http://localhost/s?q=a+b");

        let repeated = get("http://localhost/s?b=2&a=1&b=3").without_query_params(&PruneSet::default());
        assert_eq!(repeated.uri().to_string(), "http://localhost/s?b=3&a=1");
    }

    #[test]
    fn test_with_headers_replaces_values() {
        let request = get("http://localhost/").with_header(
            HeaderName::from_static("if-none-match"),
            HeaderValue::from_static("\"old\""),
        );
        let mut update = HeaderMap::new();
        update.insert("if-none-match", HeaderValue::from_static("\"new\""));
        let request = request.with_headers(&update);
        assert_eq!(request.headers().get_all("if-none-match").iter().count(), 1);
        assert_eq!(request.headers()["if-none-match"], "\"new\"");
    }
}
