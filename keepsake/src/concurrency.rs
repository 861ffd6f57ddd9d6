//! Per-key serialisation of concurrent cacheable calls.
//!
//! When `prevent_duplicate_calls` is set, calls sharing a cache key run one
//! after another: the first one fetches and stores, the following ones find
//! the stored entry instead of hitting the network again.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use keepsake_core::CacheKey;

/// Registry of in-flight cacheable calls.
#[derive(Debug, Clone, Default)]
pub struct DuplicateCalls {
    locks: Arc<DashMap<CacheKey, Arc<Mutex<()>>>>,
}

impl DuplicateCalls {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until no other call holds `key`, then holds it until the
    /// returned permit is dropped.
    pub async fn acquire(&self, key: &CacheKey) -> CallPermit {
        let lock = self
            .locks
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let guard = lock.lock_owned().await;
        CallPermit {
            key: key.clone(),
            locks: self.locks.clone(),
            guard: Some(guard),
        }
    }

    /// Number of keys with a call in flight or waiting.
    pub fn in_flight(&self) -> usize {
        self.locks.len()
    }
}

/// Exclusive right to run the call for one cache key.
#[derive(Debug)]
pub struct CallPermit {
    key: CacheKey,
    locks: Arc<DashMap<CacheKey, Arc<Mutex<()>>>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for CallPermit {
    fn drop(&mut self) {
        drop(self.guard.take());
        // Only the registry still refers to the lock: nobody is waiting.
        self.locks
            .remove_if(&self.key, |_, lock| Arc::strong_count(lock) == 1);
    }
}
