//! The request interceptor.
//!
//! A call walks through a small state machine. Every transition is logged at
//! `debug` level inside the call's span:
//!
//! ```text
//! Initial ─┬─ Unsupported ─────────────────────────────────────────┐
//!          ├─ Unsafe ──────────────────────────────────────────────┤
//!          └─ Cacheable ── PollCache ─┬─ Fresh ────────────────────┤
//!                                     ├─ OnlyIfCachedMiss ─────────┤
//!                                     └─ PollUpstream ─┬─ NotModified ─┤
//!                                                      └─ UpdateCache ─┴─ Response
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use http::header::CACHE_CONTROL;
use http::{HeaderMap, HeaderValue, Method, StatusCode};
use keepsake_backend::CacheBackend;
use keepsake_core::{
    CacheEntry, CacheKey, CacheStatus, KeyGenerator, MethodClass, RequestDescriptor,
    TransportResponse, Upstream, UpstreamError,
};
use tracing::{Instrument, debug, debug_span, warn};

use crate::call::{CallBuilder, CallOutcome};
use crate::concurrency::{CallPermit, DuplicateCalls};
use crate::config::{InterceptorBuilder, NotSet};
use crate::invalidation::InvalidationManager;
use crate::metrics;
use crate::options::CallOptions;
use crate::policy::{Freshness, PolicyAdapter};
use crate::projector::ResponseProjector;

struct Shared<B> {
    backend: Arc<B>,
    defaults: CallOptions,
    invalidations: InvalidationManager<B>,
    duplicates: DuplicateCalls,
}

/// HTTP caching interceptor around a transport.
///
/// Cheap to clone: clones share the cache store, the defaults and the
/// pending invalidations.
///
/// ```ignore
/// let interceptor = Interceptor::builder()
///     .backend(MokaBackend::builder().max_entries(10_000).build())
///     .upstream(transport)
///     .build();
///
/// let outcome = interceptor
///     .request(Method::GET, "http://localhost:3000/one")
///     .bypass_header("x-correlation-id")
///     .send()
///     .await?;
/// ```
pub struct Interceptor<B, U> {
    shared: Arc<Shared<B>>,
    upstream: U,
}

impl<B, U: Clone> Clone for Interceptor<B, U> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            upstream: self.upstream.clone(),
        }
    }
}

impl<B, U> fmt::Debug for Interceptor<B, U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interceptor")
            .field("defaults", &self.shared.defaults)
            .field("invalidations", &self.shared.invalidations)
            .finish_non_exhaustive()
    }
}

impl Interceptor<NotSet, NotSet> {
    /// Creates a new [`InterceptorBuilder`].
    pub fn builder() -> InterceptorBuilder<NotSet, NotSet> {
        InterceptorBuilder::new()
    }
}

enum State<E> {
    Initial,
    Unsupported,
    Unsafe,
    Cacheable,
    PollCache {
        key: CacheKey,
    },
    Fresh {
        key: CacheKey,
        entry: CacheEntry,
        headers: HeaderMap,
    },
    OnlyIfCachedMiss {
        key: CacheKey,
    },
    PollUpstream {
        key: CacheKey,
        entry: Option<CacheEntry>,
        conditional: HeaderMap,
    },
    NotModified {
        key: CacheKey,
        entry: CacheEntry,
        response: TransportResponse,
    },
    UpdateCache {
        key: CacheKey,
        response: TransportResponse,
    },
    Response(CallOutcome<E>),
}

impl<E> fmt::Debug for State<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            State::Initial => f.write_str("Initial"),
            State::Unsupported => f.write_str("Unsupported"),
            State::Unsafe => f.write_str("Unsafe"),
            State::Cacheable => f.write_str("Cacheable"),
            State::PollCache { key } => f.debug_struct("PollCache").field("key", key).finish(),
            State::Fresh { key, .. } => f.debug_struct("Fresh").field("key", key).finish(),
            State::OnlyIfCachedMiss { key } => {
                f.debug_struct("OnlyIfCachedMiss").field("key", key).finish()
            }
            State::PollUpstream {
                key, conditional, ..
            } => f
                .debug_struct("PollUpstream")
                .field("key", key)
                .field("conditional", &!conditional.is_empty())
                .finish(),
            State::NotModified { key, .. } => {
                f.debug_struct("NotModified").field("key", key).finish()
            }
            State::UpdateCache { key, response } => f
                .debug_struct("UpdateCache")
                .field("key", key)
                .field("status", &response.status())
                .finish(),
            State::Response(outcome) => f
                .debug_struct("Response")
                .field("status", &outcome.status)
                .field("ok", &outcome.result.is_ok())
                .finish(),
        }
    }
}

impl<B, U> Interceptor<B, U>
where
    B: CacheBackend + Send + Sync + 'static,
    U: Upstream + Clone,
{
    pub(crate) fn new(backend: Arc<B>, upstream: U, defaults: CallOptions) -> Self {
        Self {
            shared: Arc::new(Shared {
                invalidations: InvalidationManager::new(Arc::clone(&backend)),
                backend,
                defaults,
                duplicates: DuplicateCalls::new(),
            }),
            upstream,
        }
    }

    /// Starts building a call. Options start from the instance defaults.
    pub fn request(&self, method: Method, uri: impl Into<String>) -> CallBuilder<'_, B, U> {
        CallBuilder::new(self, method, uri.into(), self.shared.defaults.clone())
    }

    /// Instance defaults.
    pub fn defaults(&self) -> &CallOptions {
        &self.shared.defaults
    }

    /// The cache store.
    pub fn backend(&self) -> &Arc<B> {
        &self.shared.backend
    }

    /// Background deletions triggered by unsafe calls.
    pub fn invalidations(&self) -> &InvalidationManager<B> {
        &self.shared.invalidations
    }

    /// Runs `request` through the cache.
    ///
    /// Transport errors are returned untouched in
    /// [`CallOutcome::result`]. Cache store failures never are: a failed read
    /// is a miss and a failed write is logged.
    pub async fn call(
        &self,
        request: RequestDescriptor,
        options: CallOptions,
    ) -> CallOutcome<U::Error> {
        let span = debug_span!(
            "keepsake::call",
            method = %request.method(),
            uri = %request.uri(),
        );
        self.run(request, options).instrument(span).await
    }

    async fn run(
        &self,
        mut request: RequestDescriptor,
        mut options: CallOptions,
    ) -> CallOutcome<U::Error> {
        let started = Instant::now();
        let mut upstream = self.upstream.clone();
        let mut _permit: Option<CallPermit> = None;
        let mut state = State::Initial;

        loop {
            debug!(?state);
            state = match state {
                State::Initial => match request.class() {
                    MethodClass::Unsupported => State::Unsupported,
                    MethodClass::Unsafe => State::Unsafe,
                    MethodClass::Cacheable => State::Cacheable,
                },
                State::Unsupported => {
                    let result = upstream.call(request.clone()).await;
                    let result =
                        result.map(|response| ResponseProjector::passthrough(&request, &response));
                    State::Response(CallOutcome::passthrough(result, None))
                }
                State::Unsafe => {
                    let key = KeyGenerator::generate(
                        &request,
                        &options.prune_query,
                        &options.prune_header,
                    );
                    let result = upstream.call(request.clone()).await;
                    if let Ok(response) = &result {
                        if is_success(response.status()) {
                            self.shared.invalidations.invalidate(
                                &request,
                                &options.prune_query,
                                &options.prune_header,
                            );
                        }
                    }
                    let result =
                        result.map(|response| ResponseProjector::passthrough(&request, &response));
                    State::Response(CallOutcome::passthrough(result, Some(key)))
                }
                State::Cacheable => {
                    if let Some(expiration) = options.expiration {
                        if !request.headers().contains_key(CACHE_CONTROL) {
                            let max_age = HeaderValue::try_from(format!("max-age={expiration}"));
                            if let Ok(max_age) = max_age {
                                request = request.with_header(CACHE_CONTROL, max_age);
                            }
                        }
                    }
                    options = PolicyAdapter::evaluate_request_only(&request).apply(options);

                    let key = KeyGenerator::generate(
                        &request,
                        &options.prune_query,
                        &options.prune_header,
                    );
                    if options.prevent_duplicate_calls {
                        _permit = Some(self.shared.duplicates.acquire(&key).await);
                    }
                    self.shared.invalidations.settle(&key).await;
                    State::PollCache { key }
                }
                State::PollCache { key } => {
                    let entry = if options.force_update {
                        None
                    } else {
                        self.read(&key).await
                    };
                    let policy_request = request.without_query_params(&options.prune_query);
                    match entry {
                        Some(entry) => match PolicyAdapter::freshness(&entry.policy, &policy_request)
                        {
                            Freshness::Fresh(headers) => State::Fresh {
                                key,
                                entry,
                                headers,
                            },
                            Freshness::Stale(conditional) if options.do_query => {
                                State::PollUpstream {
                                    key,
                                    entry: Some(entry),
                                    conditional,
                                }
                            }
                            Freshness::Stale(_) => State::OnlyIfCachedMiss { key },
                        },
                        None if options.do_query => State::PollUpstream {
                            key,
                            entry: None,
                            conditional: HeaderMap::new(),
                        },
                        None => State::OnlyIfCachedMiss { key },
                    }
                }
                State::Fresh {
                    key,
                    entry,
                    headers,
                } => {
                    let projected = ResponseProjector::serve_cached(
                        entry.response,
                        &headers,
                        &request,
                        &options,
                    );
                    State::Response(CallOutcome::served(projected, key, CacheStatus::Hit))
                }
                State::OnlyIfCachedMiss { key } => {
                    let projected = ResponseProjector::only_if_cached(&request);
                    State::Response(CallOutcome {
                        result: Ok(projected),
                        key: Some(key),
                        status: None,
                    })
                }
                State::PollUpstream {
                    key,
                    entry,
                    conditional,
                } => {
                    let outgoing = request.clone().with_headers(&conditional);
                    let upstream_started = Instant::now();
                    let result = upstream.call(outgoing).await;
                    metrics::record_upstream(upstream_started.elapsed());

                    let result = match result {
                        Err(error) if entry.is_some() => error.into_not_modified(),
                        result => result,
                    };
                    match (result, entry) {
                        (Err(error), _) => {
                            State::Response(CallOutcome::passthrough(Err(error), Some(key)))
                        }
                        (Ok(response), Some(entry))
                            if response.status() == StatusCode::NOT_MODIFIED =>
                        {
                            State::NotModified {
                                key,
                                entry,
                                response,
                            }
                        }
                        (Ok(response), _) => State::UpdateCache { key, response },
                    }
                }
                State::NotModified {
                    key,
                    entry,
                    response,
                } => {
                    let policy_request = request.without_query_params(&options.prune_query);
                    let revalidated = PolicyAdapter::merge(&entry.policy, &policy_request, &response);
                    let ttl = PolicyAdapter::storage_ttl(&revalidated.policy, options.expiration);
                    let mut entry = entry.with_policy(revalidated.policy);
                    entry.response.replace_headers(&revalidated.headers);
                    if let Some(ttl) = ttl {
                        self.store(&key, &entry, ttl).await;
                    }
                    metrics::record_revalidated(self.shared.backend.name());
                    let projected = ResponseProjector::serve_cached(
                        entry.response,
                        &revalidated.headers,
                        &request,
                        &options,
                    );
                    State::Response(CallOutcome::served(projected, key, CacheStatus::Hit))
                }
                State::UpdateCache { key, response } => {
                    let policy_request = request.without_query_params(&options.prune_query);
                    let policy = PolicyAdapter::from_response(&policy_request, &response);
                    let projected = ResponseProjector::project(&request, &response, &options);
                    if options.allows_storing(projected.is_empty()) {
                        if let Some(ttl) = PolicyAdapter::storage_ttl(&policy, options.expiration) {
                            let entry = CacheEntry::new(policy, projected.clone());
                            self.store(&key, &entry, ttl).await;
                        }
                    }
                    let projected = ResponseProjector::stamp(projected, CacheStatus::Miss);
                    State::Response(CallOutcome::served(projected, key, CacheStatus::Miss))
                }
                State::Response(outcome) => {
                    if request.class() == MethodClass::Cacheable && outcome.result.is_ok() {
                        metrics::record_call(
                            outcome.status,
                            self.shared.backend.name(),
                            started.elapsed(),
                        );
                    }
                    return outcome;
                }
            };
        }
    }

    async fn read(&self, key: &CacheKey) -> Option<CacheEntry> {
        match self.shared.backend.get(key).await {
            Ok(entry) => entry,
            Err(error) => {
                warn!(
                    %error,
                    backend = self.shared.backend.name(),
                    "cache read failed, treating as a miss"
                );
                None
            }
        }
    }

    async fn store(&self, key: &CacheKey, entry: &CacheEntry, ttl: Duration) {
        match self.shared.backend.set(key, entry, ttl).await {
            Ok(()) => {
                debug!(ttl_secs = ttl.as_secs(), "cache entry stored");
                metrics::record_store(self.shared.backend.name());
            }
            Err(error) => warn!(
                %error,
                backend = self.shared.backend.name(),
                "cache write failed"
            ),
        }
    }
}

fn is_success(status: StatusCode) -> bool {
    !(status.is_client_error() || status.is_server_error())
}
