#![allow(dead_code)]

mod test_backend;
mod upstream;

pub use test_backend::{ErrorBackend, TestBackend};
pub use upstream::{MockError, MockUpstream};

use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use keepsake::{Interceptor, Projected, ProjectedResponse};
use keepsake_core::TransportResponse;
use serde_json::Value;

pub const BASE: &str = "http://localhost:3000";

pub fn url(path: &str) -> String {
    format!("{BASE}{path}")
}

/// JSON response with the given extra headers.
pub fn json_response(status: u16, body: Value, headers: &[(&str, &str)]) -> TransportResponse {
    let mut map = HeaderMap::new();
    map.insert("content-type", HeaderValue::from_static("application/json"));
    for (name, value) in headers {
        map.append(
            HeaderName::from_bytes(name.as_bytes()).unwrap(),
            HeaderValue::from_str(value).unwrap(),
        );
    }
    TransportResponse::new(
        StatusCode::from_u16(status).unwrap(),
        map,
        serde_json::to_vec(&body).unwrap(),
    )
}

/// 200 response fresh for `max_age` seconds.
pub fn fresh(body: Value, max_age: u64) -> TransportResponse {
    json_response(200, body, &[("cache-control", &format!("max-age={max_age}"))])
}

pub fn interceptor(upstream: &MockUpstream) -> Interceptor<TestBackend, MockUpstream> {
    Interceptor::builder()
        .backend(TestBackend::new())
        .upstream(upstream.clone())
        .build()
}

pub fn full(projected: &Projected) -> &ProjectedResponse {
    projected.as_response().expect("default projection")
}

pub fn x_cache(projected: &Projected) -> Option<String> {
    full(projected)
        .header
        .get("x-cache")
        .map(|value| value.to_str().unwrap().to_owned())
}
