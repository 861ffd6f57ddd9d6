//! Stores used by the backend suite.

use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use keepsake_backend::{Backend, BackendError, BackendResult, CacheBackend, DeleteStatus};
use keepsake_core::{CacheKey, CacheValue, Raw};

/// DashMap store remembering the TTL hint of every write.
#[derive(Clone, Default)]
pub struct TestBackend {
    store: Arc<DashMap<CacheKey, CacheValue<Raw>>>,
    ttl_hints: Arc<Mutex<Vec<Option<Duration>>>>,
}

impl TestBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has(&self, key: &CacheKey) -> bool {
        self.store.contains_key(key)
    }

    pub fn get_raw(&self, key: &CacheKey) -> Option<CacheValue<Raw>> {
        self.store.get(key).map(|entry| entry.value().clone())
    }

    /// Bypasses the format, for planting expired or corrupt values.
    pub fn put_raw(&self, key: CacheKey, value: CacheValue<Raw>) {
        self.store.insert(key, value);
    }

    pub fn ttl_hints(&self) -> Vec<Option<Duration>> {
        self.ttl_hints.lock().unwrap().clone()
    }
}

#[async_trait]
impl Backend for TestBackend {
    async fn read(&self, key: &CacheKey) -> BackendResult<Option<CacheValue<Raw>>> {
        Ok(self.get_raw(key))
    }

    async fn write(
        &self,
        key: &CacheKey,
        value: CacheValue<Raw>,
        ttl: Option<Duration>,
    ) -> BackendResult<()> {
        self.ttl_hints.lock().unwrap().push(ttl);
        self.put_raw(key.clone(), value);
        Ok(())
    }

    async fn remove(&self, key: &CacheKey) -> BackendResult<DeleteStatus> {
        Ok(self
            .store
            .remove(key)
            .map_or(DeleteStatus::Missing, |_| DeleteStatus::Deleted(1)))
    }

    fn name(&self) -> &str {
        "test"
    }
}

impl CacheBackend for TestBackend {}

/// Store whose every operation fails.
#[derive(Clone, Copy, Default)]
pub struct ErrorBackend {
    /// Fail with `InternalError` instead of `ConnectionError`.
    pub internal: bool,
}

impl ErrorBackend {
    fn error(&self) -> BackendError {
        let cause = Box::new(io::Error::other("store unavailable"));
        if self.internal {
            BackendError::InternalError(cause)
        } else {
            BackendError::ConnectionError(cause)
        }
    }
}

#[async_trait]
impl Backend for ErrorBackend {
    async fn read(&self, _key: &CacheKey) -> BackendResult<Option<CacheValue<Raw>>> {
        Err(self.error())
    }

    async fn write(
        &self,
        _key: &CacheKey,
        _value: CacheValue<Raw>,
        _ttl: Option<Duration>,
    ) -> BackendResult<()> {
        Err(self.error())
    }

    async fn remove(&self, _key: &CacheKey) -> BackendResult<DeleteStatus> {
        Err(self.error())
    }

    fn name(&self) -> &str {
        "error"
    }
}

impl CacheBackend for ErrorBackend {}
