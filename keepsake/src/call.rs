//! Chainable per-call surface.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderName, HeaderValue, Method, Uri};
use keepsake_backend::CacheBackend;
use keepsake_core::{
    CacheKey, CacheStatus, Projected, PruneSet, RequestDescriptor, TransportResponse, Upstream,
};
use serde::Serialize;
use serde_json::Value;

use crate::config::parse_header_names;
use crate::error::UsageError;
use crate::interceptor::Interceptor;
use crate::options::CallOptions;

/// What a call produced.
///
/// `key` is set for every call that derived a cache key, which excludes
/// unsupported methods. `status` is set when a cached or freshly fetched
/// response was returned for a cacheable call; it stays `None` for
/// passthrough calls, transport errors and `only-if-cached` misses.
pub struct CallOutcome<E> {
    /// The projection, or the transport error untouched.
    pub result: Result<Projected, E>,
    /// Cache key of the call.
    pub key: Option<CacheKey>,
    /// Value of the `x-cache` header stamped on the result.
    pub status: Option<CacheStatus>,
}

impl<E> CallOutcome<E> {
    pub(crate) fn passthrough(result: Result<Projected, E>, key: Option<CacheKey>) -> Self {
        Self {
            result,
            key,
            status: None,
        }
    }

    pub(crate) fn served(projected: Projected, key: CacheKey, status: CacheStatus) -> Self {
        Self {
            result: Ok(projected),
            key: Some(key),
            status: Some(status),
        }
    }

    /// Whether the result came from the cache.
    pub fn is_hit(&self) -> bool {
        self.status == Some(CacheStatus::Hit)
    }

    /// Drops the key and status.
    pub fn into_result(self) -> Result<Projected, E> {
        self.result
    }
}

impl<E: fmt::Debug> fmt::Debug for CallOutcome<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallOutcome")
            .field("result", &self.result)
            .field("key", &self.key)
            .field("status", &self.status)
            .finish()
    }
}

/// Builder of a single call, created by [`Interceptor::request`].
///
/// Options start from the interceptor defaults. Construction mistakes such as
/// an invalid header name are kept until [`send`](CallBuilder::send), which
/// reports the first one before any I/O happens.
#[must_use = "a call does nothing until `send` is awaited"]
pub struct CallBuilder<'a, B, U> {
    interceptor: &'a Interceptor<B, U>,
    method: Method,
    uri: String,
    query: Vec<String>,
    headers: HeaderMap,
    body: Bytes,
    options: CallOptions,
    error: Option<UsageError>,
}

impl<'a, B, U> CallBuilder<'a, B, U> {
    pub(crate) fn new(
        interceptor: &'a Interceptor<B, U>,
        method: Method,
        uri: String,
        options: CallOptions,
    ) -> Self {
        Self {
            interceptor,
            method,
            uri,
            query: Vec::new(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
            options,
            error: None,
        }
    }

    fn fail(mut self, error: UsageError) -> Self {
        self.error.get_or_insert(error);
        self
    }

    /// Appends a request header.
    pub fn header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        let name = name.as_ref();
        let Ok(header_name) = HeaderName::from_bytes(name.as_bytes()) else {
            return self.fail(UsageError::InvalidHeaderName(name.to_owned()));
        };
        let Ok(header_value) = HeaderValue::from_str(value.as_ref()) else {
            return self.fail(UsageError::InvalidHeaderValue(name.to_owned()));
        };
        self.headers.append(header_name, header_value);
        self
    }

    /// Appends query parameters, serialized as `application/x-www-form-urlencoded`.
    pub fn query<T: Serialize + ?Sized>(mut self, query: &T) -> Self {
        match serde_urlencoded::to_string(query) {
            Ok(encoded) if encoded.is_empty() => self,
            Ok(encoded) => {
                self.query.push(encoded);
                self
            }
            Err(error) => self.fail(UsageError::Encode(error.to_string())),
        }
    }

    /// Sets the request body.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Sets a JSON request body and its content type.
    pub fn json<T: Serialize + ?Sized>(mut self, json: &T) -> Self {
        match serde_json::to_vec(json) {
            Ok(body) => {
                self.headers
                    .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
                self.body = body.into();
                self
            }
            Err(error) => self.fail(UsageError::Encode(error.to_string())),
        }
    }

    /// Whether a miss may fall through to the network.
    pub fn do_query(mut self, do_query: bool) -> Self {
        self.options.do_query = do_query;
        self
    }

    /// Query parameter names left out of the cache key.
    pub fn prune_query<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.prune_query = names.into_iter().collect::<PruneSet>();
        self
    }

    /// Header names left out of the cache key.
    pub fn prune_header<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.prune_header = names.into_iter().collect::<PruneSet>();
        self
    }

    /// Replaces the default projection with `prune`.
    pub fn prune<F>(mut self, prune: F) -> Self
    where
        F: Fn(&TransportResponse) -> Value + Send + Sync + 'static,
    {
        self.options.prune = Some(Arc::new(prune));
        self
    }

    /// Returns only the named field of the default projection.
    pub fn response_prop(mut self, field: impl Into<String>) -> Self {
        self.options.response_prop = Some(field.into());
        self
    }

    /// Upper bound in seconds for the stored freshness. `0` never stores.
    pub fn expiration(mut self, seconds: u64) -> Self {
        self.options.expiration = Some(seconds);
        self
    }

    /// Whether empty projections are stored.
    pub fn cache_when_empty(mut self, cache_when_empty: bool) -> Self {
        self.options.cache_when_empty = cache_when_empty;
        self
    }

    /// Skips the cache lookup.
    pub fn force_update(self) -> Self {
        self.force_update_if(true)
    }

    /// Skips the cache lookup when `force` is true.
    pub fn force_update_if(mut self, force: bool) -> Self {
        self.options.force_update = force;
        self
    }

    /// Headers copied from this request onto a response served from cache.
    pub fn bypass_headers<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names: Vec<S> = names.into_iter().collect();
        match parse_header_names(names.iter().map(|name| name.as_ref())) {
            Ok(parsed) => {
                self.options.bypass_headers = parsed;
                self
            }
            Err(error) => self.fail(error),
        }
    }

    /// Single-name form of [`bypass_headers`](Self::bypass_headers).
    pub fn bypass_header(self, name: impl AsRef<str>) -> Self {
        self.bypass_headers([name])
    }

    /// Serialises concurrent identical calls.
    pub fn prevent_duplicate_calls(mut self, prevent: bool) -> Self {
        self.options.prevent_duplicate_calls = prevent;
        self
    }

    /// Replaces every option at once.
    pub fn options(mut self, options: CallOptions) -> Self {
        self.options = options;
        self
    }

    fn into_parts(self) -> Result<(RequestDescriptor, CallOptions), UsageError> {
        if let Some(error) = self.error {
            return Err(error);
        }
        let mut uri = self.uri;
        if !self.query.is_empty() {
            uri.push(if uri.contains('?') { '&' } else { '?' });
            uri.push_str(&self.query.join("&"));
        }
        let parsed: Uri = uri
            .parse()
            .map_err(|source| UsageError::InvalidUri { uri, source })?;
        let request = RequestDescriptor::new(self.method, parsed, self.headers).with_body(self.body);
        Ok((request, self.options))
    }
}

impl<B, U> CallBuilder<'_, B, U>
where
    B: CacheBackend + Send + Sync + 'static,
    U: Upstream + Clone,
{
    /// Runs the call.
    pub async fn send(self) -> Result<CallOutcome<U::Error>, UsageError> {
        let interceptor = self.interceptor;
        let (request, options) = self.into_parts()?;
        Ok(interceptor.call(request, options).await)
    }
}
