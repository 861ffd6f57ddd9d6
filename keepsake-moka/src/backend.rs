//! The [`Backend`] implementation over a moka future cache.

use std::time::Duration;

use async_trait::async_trait;
use keepsake_backend::{Backend, BackendResult, CacheBackend, DeleteStatus};
use keepsake_core::{CacheKey, CacheValue, Raw};
use moka::future::Cache;
use tracing::trace;

use crate::builder::MokaBackendBuilder;

/// In-process cache store powered by Moka.
///
/// Entries expire at the timestamp carried by their [`CacheValue`], which the
/// interceptor sets to the storage TTL of the entry. Values are JSON encoded
/// by the default [`Backend::value_format`].
///
/// ```
/// use keepsake_moka::MokaBackend;
///
/// let backend = MokaBackend::builder()
///     .name("api-cache")
///     .max_entries(10_000)
///     .build();
/// ```
///
/// Contents live in this process only and are lost on restart. Moka evicts
/// expired entries lazily, so a raw `read` may still see one for a moment;
/// the typed `get` filters those out.
#[derive(Clone, Debug)]
pub struct MokaBackend {
    cache: Cache<CacheKey, CacheValue<Raw>>,
    name: String,
}

impl MokaBackend {
    /// Returns a builder; a capacity must be chosen before `build()`.
    pub fn builder() -> MokaBackendBuilder {
        MokaBackendBuilder::new()
    }

    pub(crate) fn from_parts(cache: Cache<CacheKey, CacheValue<Raw>>, name: String) -> Self {
        Self { cache, name }
    }

    /// The underlying Moka cache, for maintenance such as `run_pending_tasks`.
    pub fn cache(&self) -> &Cache<CacheKey, CacheValue<Raw>> {
        &self.cache
    }
}

#[async_trait]
impl Backend for MokaBackend {
    async fn read(&self, key: &CacheKey) -> BackendResult<Option<CacheValue<Raw>>> {
        Ok(self.cache.get(key).await)
    }

    // The deadline travels inside the value, see `StoredExpiry`.
    async fn write(
        &self,
        key: &CacheKey,
        value: CacheValue<Raw>,
        _ttl: Option<Duration>,
    ) -> BackendResult<()> {
        trace!(backend = %self.name, key = %key, bytes = value.data().len(), "moka insert");
        self.cache.insert(key.clone(), value).await;
        Ok(())
    }

    async fn remove(&self, key: &CacheKey) -> BackendResult<DeleteStatus> {
        Ok(match self.cache.remove(key).await {
            Some(_) => DeleteStatus::Deleted(1),
            None => DeleteStatus::Missing,
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl CacheBackend for MokaBackend {}
