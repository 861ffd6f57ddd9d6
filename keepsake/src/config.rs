//! Instance configuration.
//!
//! [`CacheDefaults`] is the declarative form of the instance-wide
//! [`CallOptions`], meant to be loaded from a configuration file. The
//! [`InterceptorBuilder`] wires defaults, cache store and transport together.

use std::sync::Arc;
use std::time::Duration;

use http::HeaderName;
use keepsake_backend::CacheBackend;
use keepsake_core::{PruneSet, Upstream};
use serde::{Deserialize, Serialize};

use crate::error::UsageError;
use crate::interceptor::Interceptor;
use crate::options::{CallOptions, PruneFn};

/// Instance-wide defaults for every call.
///
/// Absent fields keep the [`CallOptions`] default.
///
/// ```
/// use keepsake::CacheDefaults;
///
/// let defaults: CacheDefaults = serde_json::from_str(
///     r#"{"expiration": "5m", "prune_query": ["_"], "bypass_headers": "x-request-id"}"#,
/// ).unwrap();
/// assert_eq!(defaults.expiration, Some(std::time::Duration::from_secs(300)));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheDefaults {
    /// See [`CallOptions::do_query`].
    pub do_query: Option<bool>,
    /// See [`CallOptions::prune_query`].
    pub prune_query: Option<PruneSet>,
    /// See [`CallOptions::prune_header`].
    pub prune_header: Option<PruneSet>,
    /// See [`CallOptions::response_prop`].
    pub response_prop: Option<String>,
    /// See [`CallOptions::expiration`]. Written as a human readable duration
    /// such as `"90s"` or `"5m"`, rounded down to whole seconds.
    #[serde(with = "humantime_serde")]
    pub expiration: Option<Duration>,
    /// See [`CallOptions::cache_when_empty`].
    pub cache_when_empty: Option<bool>,
    /// See [`CallOptions::force_update`].
    pub force_update: Option<bool>,
    /// See [`CallOptions::bypass_headers`]. A single name or a list.
    pub bypass_headers: Option<HeaderNames>,
    /// See [`CallOptions::prevent_duplicate_calls`].
    pub prevent_duplicate_calls: Option<bool>,
}

/// One header name or a list of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HeaderNames {
    /// A single name.
    One(String),
    /// Several names.
    Many(Vec<String>),
}

impl HeaderNames {
    fn iter(&self) -> impl Iterator<Item = &str> {
        let names: &[String] = match self {
            HeaderNames::One(name) => std::slice::from_ref(name),
            HeaderNames::Many(names) => names,
        };
        names.iter().map(String::as_str)
    }
}

/// Parses header names, reporting the first invalid one.
pub(crate) fn parse_header_names<'a>(
    names: impl IntoIterator<Item = &'a str>,
) -> Result<Vec<HeaderName>, UsageError> {
    names
        .into_iter()
        .map(|name| {
            HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| UsageError::InvalidHeaderName(name.to_owned()))
        })
        .collect()
}

impl TryFrom<CacheDefaults> for CallOptions {
    type Error = UsageError;

    fn try_from(defaults: CacheDefaults) -> Result<Self, Self::Error> {
        let base = CallOptions::default();
        let bypass_headers = match &defaults.bypass_headers {
            Some(names) => parse_header_names(names.iter())?,
            None => base.bypass_headers,
        };
        Ok(CallOptions {
            do_query: defaults.do_query.unwrap_or(base.do_query),
            prune_query: defaults.prune_query.unwrap_or(base.prune_query),
            prune_header: defaults.prune_header.unwrap_or(base.prune_header),
            prune: None,
            response_prop: defaults.response_prop,
            expiration: defaults.expiration.map(|expiration| expiration.as_secs()),
            cache_when_empty: defaults.cache_when_empty.unwrap_or(base.cache_when_empty),
            force_update: defaults.force_update.unwrap_or(base.force_update),
            bypass_headers,
            prevent_duplicate_calls: defaults
                .prevent_duplicate_calls
                .unwrap_or(base.prevent_duplicate_calls),
        })
    }
}

/// Marker type for unset builder fields.
///
/// When you see `NotSet` in a compiler error, it means you haven't called
/// the corresponding builder method yet.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotSet;

/// Builder for [`Interceptor`].
///
/// Use [`Interceptor::builder()`] to create a new builder. `build()` only
/// exists once both a cache store and a transport are set.
pub struct InterceptorBuilder<B, U> {
    backend: B,
    upstream: U,
    defaults: CallOptions,
}

impl InterceptorBuilder<NotSet, NotSet> {
    /// Creates a new builder with no fields set.
    pub fn new() -> Self {
        Self {
            backend: NotSet,
            upstream: NotSet,
            defaults: CallOptions::default(),
        }
    }
}

impl Default for InterceptorBuilder<NotSet, NotSet> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B, U> InterceptorBuilder<B, U> {
    /// Sets the cache store.
    pub fn backend<NewB>(self, backend: NewB) -> InterceptorBuilder<Arc<NewB>, U>
    where
        NewB: CacheBackend + Send + Sync + 'static,
    {
        self.shared_backend(Arc::new(backend))
    }

    /// Sets a cache store shared with other owners.
    pub fn shared_backend<NewB>(self, backend: Arc<NewB>) -> InterceptorBuilder<Arc<NewB>, U>
    where
        NewB: CacheBackend + Send + Sync + 'static,
    {
        InterceptorBuilder {
            backend,
            upstream: self.upstream,
            defaults: self.defaults,
        }
    }

    /// Sets the transport.
    pub fn upstream<NewU>(self, upstream: NewU) -> InterceptorBuilder<B, NewU>
    where
        NewU: Upstream + Clone,
    {
        InterceptorBuilder {
            backend: self.backend,
            upstream,
            defaults: self.defaults,
        }
    }

    /// Replaces the instance defaults.
    pub fn defaults(self, defaults: CallOptions) -> Self {
        Self { defaults, ..self }
    }

    /// Replaces the instance defaults with declarative ones.
    pub fn config(self, defaults: CacheDefaults) -> Result<Self, UsageError> {
        Ok(self.defaults(defaults.try_into()?))
    }

    /// Sets the default response transform.
    pub fn prune(mut self, prune: PruneFn) -> Self {
        self.defaults.prune = Some(prune);
        self
    }
}

impl<B, U> InterceptorBuilder<Arc<B>, U>
where
    B: CacheBackend + Send + Sync + 'static,
    U: Upstream + Clone,
{
    /// Builds the [`Interceptor`].
    pub fn build(self) -> Interceptor<B, U> {
        Interceptor::new(self.backend, self.upstream, self.defaults)
    }
}
