//! Shaping of the value handed back to callers.

use http::{HeaderMap, HeaderValue};
use keepsake_core::{
    CacheStatus, Projected, ProjectedResponse, RequestDescriptor, TransportResponse, X_CACHE,
};

use crate::options::CallOptions;

/// Builds [`Projected`] values out of transport responses and cache entries.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseProjector;

impl ResponseProjector {
    /// Projects a network response for caching and returning.
    ///
    /// The prune function wins over `response_prop`, which wins over the
    /// default projection. An unknown `response_prop` yields `null`.
    pub fn project(
        request: &RequestDescriptor,
        response: &TransportResponse,
        options: &CallOptions,
    ) -> Projected {
        if let Some(prune) = &options.prune {
            return Projected::Value(prune(response));
        }
        let projected = ProjectedResponse::new(request, response);
        match &options.response_prop {
            Some(field) => Projected::Value(projected.field(field)),
            None => Projected::Response(projected),
        }
    }

    /// Projection of an unsafe or unsupported call. Never carries `x-cache`.
    pub fn passthrough(request: &RequestDescriptor, response: &TransportResponse) -> Projected {
        Projected::Response(ProjectedResponse::new(request, response))
    }

    /// Synthetic answer to an `only-if-cached` call that found no entry.
    pub fn only_if_cached(request: &RequestDescriptor) -> Projected {
        Projected::Response(ProjectedResponse::gateway_timeout(request))
    }

    /// Prepares a stored projection for serving to `request`.
    ///
    /// The stored body is served with `headers`, the response headers the
    /// cache policy computes for this moment (hop-by-hop headers dropped,
    /// `age` added). Bypass headers are then copied from the live request so
    /// that per-request values such as correlation ids never leak from the
    /// call that populated the cache.
    pub fn serve_cached(
        mut projected: Projected,
        headers: &HeaderMap,
        request: &RequestDescriptor,
        options: &CallOptions,
    ) -> Projected {
        projected.replace_headers(headers);
        projected.copy_headers_from(&options.bypass_headers, request.headers());
        Self::stamp(projected, CacheStatus::Hit)
    }

    /// Sets `x-cache` to `status`.
    pub fn stamp(mut projected: Projected, status: CacheStatus) -> Projected {
        projected.set_header(X_CACHE, HeaderValue::from_static(status.as_str()));
        projected
    }
}
