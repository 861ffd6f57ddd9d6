#![doc = include_str!("../README.md")]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

/// Cache store re-exports.
///
/// This module provides access to the [`Backend`](keepsake_backend::Backend)
/// trait and related types for implementing custom stores.
pub mod backend;

/// Per-call builder and call outcome.
pub mod call;

/// Serialisation of concurrent identical calls.
///
/// Opt-in through `prevent_duplicate_calls`: calls sharing a cache key wait
/// for each other so that only the first one reaches the network on a miss.
pub mod concurrency;

/// Instance defaults and the interceptor builder.
pub mod config;

/// Error types raised before any I/O.
pub mod error;

/// The request interceptor and its state machine.
pub mod interceptor;

/// Cache invalidation after successful unsafe calls.
pub mod invalidation;

/// Metrics collection for cache observability.
///
/// When the `metrics` feature is enabled, this module provides counters
/// and histograms for:
/// - Cache hits, misses and `only-if-cached` misses
/// - Stores, revalidations and invalidations
/// - Call and upstream latency
pub mod metrics;

/// Per-call cache options.
pub mod options;

/// RFC 7234 policy evaluation.
///
/// Wraps `http-cache-semantics` for request directives, freshness checks,
/// conditional headers, 304 merges and storage lifetimes.
pub mod policy;

/// Shaping of returned and cached values.
pub mod projector;

pub use call::{CallBuilder, CallOutcome};
pub use config::{CacheDefaults, HeaderNames, InterceptorBuilder, NotSet};
pub use error::UsageError;
pub use interceptor::Interceptor;
pub use invalidation::InvalidationManager;
pub use options::{CallOptions, PruneFn};
pub use policy::{Freshness, PolicyAdapter, RequestDirectives, Revalidated};
pub use projector::ResponseProjector;

pub use keepsake_core::{
    CacheEntry, CacheKey, CacheStatus, KeyGenerator, MethodClass, Projected, ProjectedResponse,
    PruneSet, RequestDescriptor, RequestSnapshot, TransportResponse, Upstream, UpstreamError,
    X_CACHE,
};

/// The `keepsake` prelude.
///
/// ```rust
/// use keepsake::prelude::*;
/// ```
///
/// This imports:
/// - [`Interceptor`] - the caching interceptor
/// - [`CallOutcome`] - what a call produced
/// - [`Upstream`] and [`UpstreamError`] - the transport traits
pub mod prelude {
    pub use crate::{CallOutcome, Interceptor, Upstream, UpstreamError};
}
