#![allow(dead_code)]

mod test_backend;

pub use test_backend::{ErrorBackend, TestBackend};

use http::{Request, Response};
use http_cache_semantics::CachePolicy;
use keepsake_core::{CacheEntry, Projected};
use serde_json::json;

/// Entry for `GET http://localhost/one` cacheable for `max_age` seconds.
pub fn entry(max_age: u64) -> CacheEntry {
    let request = Request::get("http://localhost/one").body(()).unwrap();
    let response = Response::builder()
        .header("cache-control", format!("max-age={max_age}"))
        .body(())
        .unwrap();
    CacheEntry::new(
        CachePolicy::new(&request, &response),
        Projected::Value(json!({"key": "one"})),
    )
}
