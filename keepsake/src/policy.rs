//! Integration of the RFC 7234 policy primitive.
//!
//! [`PolicyAdapter`] is the only place that talks to `http-cache-semantics`.
//! Every function takes the request as the cache sees it, that is with the
//! pruned query parameters already removed, so that policies agree with
//! cache keys on what "the same resource" means.

use std::time::{Duration, SystemTime};

use http::header::{CACHE_CONTROL, IF_MODIFIED_SINCE, IF_NONE_MATCH};
use http::{HeaderMap, Response, StatusCode};
use http_cache_semantics::{AfterResponse, BeforeRequest, CachePolicy};
use keepsake_core::{RequestDescriptor, TransportResponse};

use crate::options::CallOptions;

/// Cache directives carried by the request itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestDirectives {
    /// `only-if-cached` was requested.
    pub only_if_cached: bool,
    /// Expiration forced by `max-age`, `no-cache` or `no-store`, in seconds.
    pub expiration: Option<u64>,
}

impl RequestDirectives {
    /// Applies the directives on top of the call options.
    pub fn apply(&self, mut options: CallOptions) -> CallOptions {
        if self.only_if_cached {
            options.do_query = false;
        }
        if let Some(expiration) = self.expiration {
            options.expiration = Some(expiration);
        }
        options
    }
}

/// Outcome of checking a stored policy against a new request.
#[derive(Debug, Clone)]
pub enum Freshness {
    /// The entry may be served as is, with these response headers.
    Fresh(HeaderMap),
    /// The entry must be revalidated, with these conditional headers.
    Stale(HeaderMap),
}

/// Policy and response headers after a `304 Not Modified`.
#[derive(Debug, Clone)]
pub struct Revalidated {
    /// Policy replacing the stored one.
    pub policy: CachePolicy,
    /// Response headers to serve the stored body with.
    pub headers: HeaderMap,
}

/// Wraps [`CachePolicy`] for the interceptor.
#[derive(Debug, Clone, Copy, Default)]
pub struct PolicyAdapter;

impl PolicyAdapter {
    /// Reads the request's own `Cache-Control` before any network call.
    ///
    /// `max-age=N` sets the expiration to `N` seconds, `no-cache` and
    /// `no-store` (or `max-age=0`) set it to zero. Without such directives the
    /// call options are left alone.
    pub fn evaluate_request_only(request: &RequestDescriptor) -> RequestDirectives {
        let mut directives = RequestDirectives::default();
        let mut affects_expiration = false;
        for value in request.headers().get_all(CACHE_CONTROL) {
            let Ok(value) = value.to_str() else {
                continue;
            };
            for directive in value.split(',') {
                let directive = directive.trim().to_ascii_lowercase();
                let name = directive.split('=').next().unwrap_or_default().trim();
                match name {
                    "only-if-cached" => directives.only_if_cached = true,
                    "max-age" | "no-cache" | "no-store" => affects_expiration = true,
                    _ => {}
                }
            }
        }
        if !affects_expiration {
            return directives;
        }

        // The request headers stand in for a response: the primitive then
        // parses max-age and no-store the same way it would for a real one.
        let mut as_response = Response::new(());
        *as_response.status_mut() = StatusCode::OK;
        for value in request.headers().get_all(CACHE_CONTROL) {
            as_response
                .headers_mut()
                .append(CACHE_CONTROL, value.clone());
        }
        let baseline = CachePolicy::new(&request.to_http(), &as_response);
        directives.expiration = Some(if baseline.is_storable() {
            round_secs(baseline.time_to_live(SystemTime::now()))
        } else {
            0
        });
        directives
    }

    /// Builds the policy of a fresh network response.
    pub fn from_response(request: &RequestDescriptor, response: &TransportResponse) -> CachePolicy {
        CachePolicy::new(&request.to_http(), &response.to_http())
    }

    /// Checks whether `policy` satisfies `request` without revalidation.
    pub fn freshness(policy: &CachePolicy, request: &RequestDescriptor) -> Freshness {
        match policy.before_request(&request.to_http(), SystemTime::now()) {
            BeforeRequest::Fresh(parts) => Freshness::Fresh(parts.headers),
            BeforeRequest::Stale { request, .. } => {
                let mut conditional = HeaderMap::new();
                for name in [IF_NONE_MATCH, IF_MODIFIED_SINCE] {
                    for value in request.headers.get_all(&name) {
                        conditional.append(name.clone(), value.clone());
                    }
                }
                Freshness::Stale(conditional)
            }
        }
    }

    /// Whether the stored entry may be served as is.
    pub fn is_fresh_enough(policy: &CachePolicy, request: &RequestDescriptor) -> bool {
        matches!(Self::freshness(policy, request), Freshness::Fresh(_))
    }

    /// Conditional headers to revalidate the stored entry with. Empty when
    /// the entry is fresh or has no validators.
    pub fn revalidation_headers(policy: &CachePolicy, request: &RequestDescriptor) -> HeaderMap {
        match Self::freshness(policy, request) {
            Freshness::Fresh(_) => HeaderMap::new(),
            Freshness::Stale(headers) => headers,
        }
    }

    /// Merges a `304 Not Modified` into the stored policy.
    ///
    /// The body is never touched, only freshness metadata and response
    /// headers are refreshed.
    pub fn merge(
        policy: &CachePolicy,
        request: &RequestDescriptor,
        response: &TransportResponse,
    ) -> Revalidated {
        let (policy, parts) =
            match policy.after_response(&request.to_http(), &response.to_http(), SystemTime::now())
            {
                AfterResponse::NotModified(policy, parts) => (policy, parts),
                AfterResponse::Modified(policy, parts) => {
                    tracing::debug!("304 validators did not match the stored response");
                    (policy, parts)
                }
            };
        Revalidated {
            policy,
            headers: parts.headers,
        }
    }

    /// Lifetime to hand to the cache store, `None` when the entry must not
    /// be stored.
    ///
    /// Twice the freshness lifetime, bounded by `override_secs`, so that a
    /// stale entry stays around long enough to be revalidated.
    pub fn storage_ttl(policy: &CachePolicy, override_secs: Option<u64>) -> Option<Duration> {
        if !policy.is_storable() {
            return None;
        }
        let ttl = round_secs(policy.time_to_live(SystemTime::now()));
        let effective = match override_secs {
            Some(secs) => secs.min(ttl),
            None => ttl,
        };
        (effective > 0).then(|| Duration::from_secs(effective.saturating_mul(2)))
    }
}

fn round_secs(duration: Duration) -> u64 {
    duration.as_secs_f64().round() as u64
}
