//! Per-call cache options.

use std::fmt;
use std::sync::Arc;

use http::HeaderName;
use keepsake_core::{PruneSet, TransportResponse};
use serde_json::Value;

/// Response transform replacing the default projection.
///
/// Its return value is cached and handed back verbatim, `false` and `null`
/// included.
pub type PruneFn = Arc<dyn Fn(&TransportResponse) -> Value + Send + Sync>;

/// Cache behaviour of a single call.
///
/// Built from the interceptor defaults and the per-call setters of
/// [`CallBuilder`](crate::CallBuilder). Once a call starts its options never
/// change, except for the overrides the request's own `Cache-Control` header
/// applies.
#[derive(Clone)]
pub struct CallOptions {
    /// Fall through to the network on a miss. `false` turns a miss into a
    /// synthetic 504.
    pub do_query: bool,
    /// Query parameter names left out of the cache key.
    pub prune_query: PruneSet,
    /// Header names left out of the cache key, compared case-insensitively.
    pub prune_header: PruneSet,
    /// Response transform used instead of the default projection.
    pub prune: Option<PruneFn>,
    /// Single field of the default projection to return instead of all of it.
    pub response_prop: Option<String>,
    /// Upper bound in seconds for the stored freshness. `0` never stores.
    pub expiration: Option<u64>,
    /// Store projections that are `false`, `null` or `{}`.
    pub cache_when_empty: bool,
    /// Skip the lookup and always go to the network.
    pub force_update: bool,
    /// Headers copied from the live request onto responses served from cache.
    pub bypass_headers: Vec<HeaderName>,
    /// Serialise concurrent cacheable calls sharing a key.
    pub prevent_duplicate_calls: bool,
}

impl Default for CallOptions {
    fn default() -> Self {
        Self {
            do_query: true,
            prune_query: PruneSet::default(),
            prune_header: PruneSet::default(),
            prune: None,
            response_prop: None,
            expiration: None,
            cache_when_empty: true,
            force_update: false,
            bypass_headers: Vec::new(),
            prevent_duplicate_calls: false,
        }
    }
}

impl fmt::Debug for CallOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallOptions")
            .field("do_query", &self.do_query)
            .field("prune_query", &self.prune_query)
            .field("prune_header", &self.prune_header)
            .field("prune", &self.prune.as_ref().map(|_| "..."))
            .field("response_prop", &self.response_prop)
            .field("expiration", &self.expiration)
            .field("cache_when_empty", &self.cache_when_empty)
            .field("force_update", &self.force_update)
            .field("bypass_headers", &self.bypass_headers)
            .field("prevent_duplicate_calls", &self.prevent_duplicate_calls)
            .finish()
    }
}

impl CallOptions {
    /// Whether a projection may be stored given its emptiness.
    pub(crate) fn allows_storing(&self, empty: bool) -> bool {
        self.expiration != Some(0) && (!empty || self.cache_when_empty)
    }
}
