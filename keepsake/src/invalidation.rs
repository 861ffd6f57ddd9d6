//! Purging of cached reads after successful writes.
//!
//! Deletions run in the background so the unsafe call returns right away.
//! Until a deletion settles its keys stay registered as pending, and a
//! cacheable call for one of those keys waits for it before reading the
//! store.

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use http::Method;
use keepsake_backend::CacheBackend;
use keepsake_core::{CacheKey, KeyGenerator, PruneSet, RequestDescriptor};
use tokio::sync::watch;
use tracing::{Instrument, debug, info_span, warn};

/// Deletes the GET and HEAD entries of resources written through the
/// interceptor.
pub struct InvalidationManager<B> {
    backend: Arc<B>,
    pending: Arc<DashMap<CacheKey, watch::Receiver<bool>>>,
}

impl<B> Clone for InvalidationManager<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            pending: Arc::clone(&self.pending),
        }
    }
}

impl<B> fmt::Debug for InvalidationManager<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvalidationManager")
            .field("pending", &self.pending.len())
            .finish()
    }
}

impl<B> InvalidationManager<B>
where
    B: CacheBackend + Send + Sync + 'static,
{
    /// Creates a manager deleting from `backend`.
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            backend,
            pending: Arc::new(DashMap::new()),
        }
    }

    /// Schedules the deletion of the entries `request` would have had as a
    /// GET and as a HEAD. Returns the keys being deleted.
    ///
    /// Must be called from within a tokio runtime.
    pub fn invalidate(
        &self,
        request: &RequestDescriptor,
        prune_query: &PruneSet,
        prune_header: &PruneSet,
    ) -> Vec<CacheKey> {
        let keys: Vec<CacheKey> = [Method::GET, Method::HEAD]
            .iter()
            .map(|method| {
                KeyGenerator::generate_for_method(request, method, prune_query, prune_header)
            })
            .collect();

        let (done, watcher) = watch::channel(false);
        for key in &keys {
            self.pending.insert(key.clone(), watcher.clone());
        }

        let backend = Arc::clone(&self.backend);
        let pending = Arc::clone(&self.pending);
        let task_keys = keys.clone();
        let span = info_span!(
            "invalidation",
            backend = backend.name(),
            uri = %request.uri(),
        );
        tokio::spawn(
            async move {
                match backend.delete(&task_keys).await {
                    Ok(status) => debug!(?status, "cache entries invalidated"),
                    Err(error) => warn!(%error, "cache invalidation failed"),
                }
                done.send_replace(true);
                for key in &task_keys {
                    // A newer invalidation of the same key keeps its own registration.
                    pending.remove_if(key, |_, registered| registered.same_channel(&watcher));
                }
            }
            .instrument(span),
        );

        crate::metrics::record_invalidation(keys.len());
        keys
    }

    /// Waits until no deletion of `key` is in flight.
    pub async fn settle(&self, key: &CacheKey) {
        let Some(mut watcher) = self.pending.get(key).map(|entry| entry.value().clone()) else {
            return;
        };
        // An error means the deletion task ended without reporting.
        let _ = watcher.wait_for(|done| *done).await;
    }

    /// Number of keys with a deletion in flight.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use http::{HeaderMap, Request, Response};
    use http_cache_semantics::CachePolicy;
    use keepsake_core::{CacheEntry, Projected};
    use keepsake_moka::MokaBackend;
    use serde_json::json;

    fn request(method: Method) -> RequestDescriptor {
        RequestDescriptor::new(
            method,
            "http://localhost/one?page=1".parse().unwrap(),
            HeaderMap::new(),
        )
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
    async fn test_invalidates_get_and_head_entries() {
        let backend = Arc::new(MokaBackend::builder().max_entries(100).build());
        let manager = InvalidationManager::new(Arc::clone(&backend));
        let none = PruneSet::new();

        let get = KeyGenerator::generate(&request(Method::GET), &none, &none);
        let head = KeyGenerator::generate(&request(Method::HEAD), &none, &none);
        let ttl = Duration::from_secs(120);
        backend.set(&get, &entry(), ttl).await.unwrap();
        backend.set(&head, &entry(), ttl).await.unwrap();

        let keys = manager.invalidate(&request(Method::POST), &none, &none);
        assert_eq!(keys, vec![get.clone(), head.clone()]);

        manager.settle(&get).await;
        manager.settle(&head).await;
        assert!(backend.get(&get).await.unwrap().is_none());
        assert!(backend.get(&head).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_settle_without_pending_returns() {
        let backend = Arc::new(MokaBackend::builder().max_entries(10).build());
        let manager = InvalidationManager::new(backend);
        manager.settle(&CacheKey::new("nothing")).await;
        assert_eq!(manager.pending(), 0);
    }
}
