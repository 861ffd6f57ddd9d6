use std::{future::Future, time::Duration};

use async_trait::async_trait;
use keepsake_core::{CacheEntry, CacheKey, CacheValue, Raw};

use crate::{
    BackendError, DeleteStatus,
    format::{Format, JsonFormat},
};

/// Result alias for backend operations.
pub type BackendResult<T> = Result<T, BackendError>;

/// Raw key-value store with per-entry expiry.
#[async_trait]
pub trait Backend: Sync + Send {
    /// Reads the value stored under `key`.
    async fn read(&self, key: &CacheKey) -> BackendResult<Option<CacheValue<Raw>>>;

    /// Stores `value` under `key`. `ttl` mirrors the value's expire timestamp
    /// for stores that take a relative lifetime.
    async fn write(
        &self,
        key: &CacheKey,
        value: CacheValue<Raw>,
        ttl: Option<Duration>,
    ) -> BackendResult<()>;

    /// Removes the value stored under `key`.
    async fn remove(&self, key: &CacheKey) -> BackendResult<DeleteStatus>;

    /// Name used in logs.
    fn name(&self) -> &str {
        "backend"
    }

    /// Encoding of stored entries.
    fn value_format(&self) -> &dyn Format {
        &JsonFormat
    }
}

/// Typed cache store operations used by the interceptor.
///
/// `get`, `set` and `delete` encode and decode [`CacheEntry`] values with the
/// backend's [`Format`] on top of the raw [`Backend`] methods.
pub trait CacheBackend: Backend {
    /// Reads the entry stored under `key`.
    ///
    /// A value whose expire timestamp already passed reads as absent, even if
    /// the store has not evicted it yet.
    fn get(
        &self,
        key: &CacheKey,
    ) -> impl Future<Output = BackendResult<Option<CacheEntry>>> + Send {
        async move {
            let Some(value) = self.read(key).await? else {
                return Ok(None);
            };
            if value.is_expired() {
                tracing::trace!(backend = self.name(), "stored value expired");
                return Ok(None);
            }
            let entry = self.value_format().deserialize(value.data())?;
            Ok(Some(entry))
        }
    }

    /// Stores `entry` under `key` for `ttl`.
    fn set(
        &self,
        key: &CacheKey,
        entry: &CacheEntry,
        ttl: Duration,
    ) -> impl Future<Output = BackendResult<()>> + Send {
        async move {
            let data = self.value_format().serialize(entry)?;
            let value = CacheValue::with_ttl(data, ttl);
            self.write(key, value, Some(ttl)).await
        }
    }

    /// Removes every key in `keys`.
    ///
    /// All removals are attempted. The first error is returned after that.
    fn delete(
        &self,
        keys: &[CacheKey],
    ) -> impl Future<Output = BackendResult<DeleteStatus>> + Send {
        async move {
            let mut deleted = 0;
            let mut failure = None;
            for key in keys {
                match self.remove(key).await {
                    Ok(DeleteStatus::Deleted(count)) => deleted += count,
                    Ok(DeleteStatus::Missing) => {}
                    Err(err) => {
                        failure.get_or_insert(err);
                    }
                }
            }
            match failure {
                Some(err) => Err(err),
                None if deleted > 0 => Ok(DeleteStatus::Deleted(deleted)),
                None => Ok(DeleteStatus::Missing),
            }
        }
    }
}
