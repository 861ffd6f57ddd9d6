//! Tests for capacity eviction and expiry of the Moka store.

use std::time::Duration;

use bytes::Bytes;
use chrono::Utc;
use http::{Request, Response};
use http_cache_semantics::CachePolicy;
use keepsake_backend::{Backend, CacheBackend, DeleteStatus};
use keepsake_core::{CacheEntry, CacheKey, CacheValue, Projected};
use keepsake_moka::{MokaBackend, MokaBackendBuilder};
use serde_json::json;

/// Create a cache key with predictable size.
fn make_key(id: u32) -> CacheKey {
    CacheKey::new(format!("{{\"method\":\"GET\",\"uri\":\"/items/{id:04}\"}}"))
}

/// Create a cache value with specified data size.
fn make_value(size: usize) -> CacheValue<Bytes> {
    let data = Bytes::from(vec![0u8; size]);
    CacheValue::new(data, Some(Utc::now() + chrono::Duration::hours(1)))
}

fn entry() -> CacheEntry {
    let request = Request::get("http://localhost/one").body(()).unwrap();
    let response = Response::builder()
        .header("cache-control", "max-age=60")
        .body(())
        .unwrap();
    CacheEntry::new(
        CachePolicy::new(&request, &response),
        Projected::Value(json!({"key": "one"})),
    )
}

#[tokio::test]
async fn test_max_bytes_eviction() {
    let key = make_key(1);
    let value = make_value(100);
    let single_entry_size = key.memory_size() + value.memory_size();

    // Capacity for exactly 3 entries
    let backend = MokaBackendBuilder::default()
        .max_bytes((single_entry_size * 3) as u64)
        .build();

    for i in 1..=4 {
        backend
            .write(&make_key(i), make_value(100), None)
            .await
            .unwrap();
        backend.cache().run_pending_tasks().await;
    }

    assert!(backend.read(&make_key(4)).await.unwrap().is_some());

    let mut count = 0;
    for i in 1..=4 {
        if backend.read(&make_key(i)).await.unwrap().is_some() {
            count += 1;
        }
    }
    assert_eq!(count, 3, "Should have exactly 3 entries after eviction");
}

#[tokio::test]
async fn test_entry_expires_at_value_timestamp() {
    let backend = MokaBackend::builder().max_entries(100).build();
    let key = make_key(1);

    let value = CacheValue::new(
        Bytes::from_static(b"{}"),
        Some(Utc::now() + chrono::Duration::milliseconds(200)),
    );
    backend.write(&key, value, None).await.unwrap();
    assert!(backend.read(&key).await.unwrap().is_some());

    tokio::time::sleep(Duration::from_millis(400)).await;
    backend.cache().run_pending_tasks().await;
    assert!(backend.read(&key).await.unwrap().is_none());
}

#[tokio::test]
async fn test_update_uses_new_expiry() {
    let backend = MokaBackend::builder().max_entries(100).build();
    let key = make_key(1);

    let short = CacheValue::new(
        Bytes::from_static(b"{}"),
        Some(Utc::now() + chrono::Duration::milliseconds(200)),
    );
    backend.write(&key, short, None).await.unwrap();
    backend.write(&key, make_value(10), None).await.unwrap();

    tokio::time::sleep(Duration::from_millis(400)).await;
    backend.cache().run_pending_tasks().await;
    assert!(backend.read(&key).await.unwrap().is_some());
}

#[tokio::test]
async fn test_typed_round_trip_and_delete() {
    let backend = MokaBackend::builder().name("api").max_entries(100).build();
    assert_eq!(backend.name(), "api");

    let get = make_key(1);
    let head = make_key(2);
    backend
        .set(&get, &entry(), Duration::from_secs(120))
        .await
        .unwrap();

    let stored = backend.get(&get).await.unwrap().unwrap();
    assert_eq!(stored.response, Projected::Value(json!({"key": "one"})));

    let status = backend.delete(&[get.clone(), head]).await.unwrap();
    assert_eq!(status, DeleteStatus::Deleted(1));
    assert!(backend.get(&get).await.unwrap().is_none());
}

#[tokio::test]
async fn test_stored_bytes_are_json() {
    let backend = MokaBackendBuilder::new()
        .max_bytes(1024 * 1024)
        .eviction_policy(keepsake_moka::EvictionPolicy::tiny_lfu())
        .build();
    assert_eq!(backend.name(), "moka");

    let key = make_key(7);
    backend
        .set(&key, &entry(), Duration::from_secs(60))
        .await
        .unwrap();

    let raw = backend.read(&key).await.unwrap().unwrap();
    let decoded: serde_json::Value = serde_json::from_slice(raw.data()).unwrap();
    assert_eq!(decoded["response"], json!({"value": {"key": "one"}}));
}

#[tokio::test]
async fn test_past_deadline_is_never_served() {
    let backend = MokaBackend::builder().max_entries(10).build();
    let key = make_key(1);
    let value = CacheValue::new(
        Bytes::from_static(b"{}"),
        Some(Utc::now() - chrono::Duration::seconds(1)),
    );
    backend.write(&key, value, None).await.unwrap();
    backend.cache().run_pending_tasks().await;
    assert!(backend.read(&key).await.unwrap().is_none());
}
