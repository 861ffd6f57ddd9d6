//! Metrics declaration and recording helpers.
//!
//! Counters are only registered when the `metrics` feature is enabled. The
//! helpers below compile to nothing otherwise.

use std::time::Duration;

use keepsake_core::CacheStatus;

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
lazy_static! {
    // Cache status metrics

    /// Track number of cache hit events.
    pub static ref CACHE_HIT_COUNTER: &'static str = {
        metrics::describe_counter!(
            "keepsake_cache_hit_total",
            "Total number of calls served from cache."
        );
        "keepsake_cache_hit_total"
    };
    /// Track number of cache miss events.
    pub static ref CACHE_MISS_COUNTER: &'static str = {
        metrics::describe_counter!(
            "keepsake_cache_miss_total",
            "Total number of calls answered by the network."
        );
        "keepsake_cache_miss_total"
    };
    /// Track number of only-if-cached calls that found nothing.
    pub static ref CACHE_ONLY_IF_CACHED_MISS: &'static str = {
        metrics::describe_counter!(
            "keepsake_only_if_cached_miss_total",
            "Total number of synthetic 504 responses."
        );
        "keepsake_only_if_cached_miss_total"
    };
    /// Track number of 304 revalidations.
    pub static ref CACHE_REVALIDATED_COUNTER: &'static str = {
        metrics::describe_counter!(
            "keepsake_revalidated_total",
            "Total number of stale entries refreshed by a 304."
        );
        "keepsake_revalidated_total"
    };
    /// Track number of stored entries.
    pub static ref CACHE_STORE_COUNTER: &'static str = {
        metrics::describe_counter!(
            "keepsake_store_total",
            "Total number of entries written to the cache store."
        );
        "keepsake_store_total"
    };
    /// Track number of invalidated keys.
    pub static ref CACHE_INVALIDATION_COUNTER: &'static str = {
        metrics::describe_counter!(
            "keepsake_invalidation_total",
            "Total number of cache keys invalidated by unsafe calls."
        );
        "keepsake_invalidation_total"
    };

    // Latency metrics

    /// Histogram of cacheable call duration.
    pub static ref CALL_DURATION: &'static str = {
        metrics::describe_histogram!(
            "keepsake_call_duration_seconds",
            metrics::Unit::Seconds,
            "Duration of cacheable calls in seconds."
        );
        "keepsake_call_duration_seconds"
    };
    /// Histogram of upstream call duration.
    pub static ref UPSTREAM_DURATION: &'static str = {
        metrics::describe_histogram!(
            "keepsake_upstream_duration_seconds",
            metrics::Unit::Seconds,
            "Duration of upstream requests in seconds."
        );
        "keepsake_upstream_duration_seconds"
    };
}

/// Record the outcome of a cacheable call.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_call(status: Option<CacheStatus>, backend: &str, duration: Duration) {
    let label = status.map(|status| status.as_str()).unwrap_or("NONE");
    metrics::histogram!(
        *CALL_DURATION,
        "status" => label,
        "backend" => backend.to_string()
    )
    .record(duration.as_secs_f64());

    let counter = match status {
        Some(CacheStatus::Hit) => *CACHE_HIT_COUNTER,
        Some(CacheStatus::Miss) => *CACHE_MISS_COUNTER,
        None => *CACHE_ONLY_IF_CACHED_MISS,
    };
    metrics::counter!(counter, "backend" => backend.to_string()).increment(1);
}

/// Record the duration of an upstream call.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_upstream(duration: Duration) {
    metrics::histogram!(*UPSTREAM_DURATION).record(duration.as_secs_f64());
}

/// Record a successful store write.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_store(backend: &str) {
    metrics::counter!(*CACHE_STORE_COUNTER, "backend" => backend.to_string()).increment(1);
}

/// Record a 304 revalidation.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_revalidated(backend: &str) {
    metrics::counter!(*CACHE_REVALIDATED_COUNTER, "backend" => backend.to_string()).increment(1);
}

/// Record invalidated keys.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_invalidation(keys: usize) {
    metrics::counter!(*CACHE_INVALIDATION_COUNTER).increment(keys as u64);
}

/// No-op versions when the `metrics` feature is disabled.
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_call(_status: Option<CacheStatus>, _backend: &str, _duration: Duration) {}

#[cfg(not(feature = "metrics"))]
#[inline]
#[allow(missing_docs)]
pub fn record_upstream(_duration: Duration) {}

#[cfg(not(feature = "metrics"))]
#[inline]
#[allow(missing_docs)]
pub fn record_store(_backend: &str) {}

#[cfg(not(feature = "metrics"))]
#[inline]
#[allow(missing_docs)]
pub fn record_revalidated(_backend: &str) {}

#[cfg(not(feature = "metrics"))]
#[inline]
#[allow(missing_docs)]
pub fn record_invalidation(_keys: usize) {}
