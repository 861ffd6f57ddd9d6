//! Typestate builder for [`MokaBackend`].

use std::time::{Duration, Instant};

use chrono::Utc;
use keepsake_core::{CacheKey, CacheValue, Raw};
use moka::Expiry;
use moka::future::{Cache, CacheBuilder};
use moka::policy::EvictionPolicy;

use crate::backend::MokaBackend;

type Store = Cache<CacheKey, CacheValue<Raw>>;

/// Lets every entry live until the timestamp stored in its [`CacheValue`].
struct StoredExpiry;

impl StoredExpiry {
    fn remaining(value: &CacheValue<Raw>) -> Option<Duration> {
        let expire = value.expire()?;
        // A deadline already in the past maps to zero, which moka treats as expired.
        Some((expire - Utc::now()).to_std().unwrap_or(Duration::ZERO))
    }
}

impl Expiry<CacheKey, CacheValue<Raw>> for StoredExpiry {
    fn expire_after_create(
        &self,
        _key: &CacheKey,
        value: &CacheValue<Raw>,
        _created_at: Instant,
    ) -> Option<Duration> {
        Self::remaining(value)
    }

    // Rewrites after a 304 carry a new deadline that replaces the old one.
    fn expire_after_update(
        &self,
        _key: &CacheKey,
        value: &CacheValue<Raw>,
        _updated_at: Instant,
        _current: Option<Duration>,
    ) -> Option<Duration> {
        Self::remaining(value)
    }
}

mod sealed {
    pub trait Sealed {}
}

/// A capacity limit the builder knows how to turn into a moka cache.
///
/// Implemented by [`EntryCapacity`] and [`ByteCapacity`] only.
pub trait Capacity: sealed::Sealed {
    #[doc(hidden)]
    fn create(&self, name: &str, eviction: Option<EvictionPolicy>) -> Store;
}

/// No capacity chosen yet; `build()` is unavailable.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCapacity;

/// At most this many entries. Evicts with TinyLFU unless told otherwise.
#[derive(Debug, Clone, Copy)]
pub struct EntryCapacity(u64);

/// At most this many bytes of keys and values. Evicts with LRU unless told
/// otherwise, since TinyLFU admission may refuse a large newcomer outright.
#[derive(Debug, Clone, Copy)]
pub struct ByteCapacity(u64);

impl sealed::Sealed for EntryCapacity {}
impl sealed::Sealed for ByteCapacity {}

impl Capacity for EntryCapacity {
    fn create(&self, name: &str, eviction: Option<EvictionPolicy>) -> Store {
        CacheBuilder::new(self.0)
            .name(name)
            .eviction_policy(eviction.unwrap_or_else(EvictionPolicy::tiny_lfu))
            .expire_after(StoredExpiry)
            .build()
    }
}

impl Capacity for ByteCapacity {
    fn create(&self, name: &str, eviction: Option<EvictionPolicy>) -> Store {
        CacheBuilder::new(self.0)
            .name(name)
            .weigher(|key: &CacheKey, value: &CacheValue<Raw>| {
                u32::try_from(key.memory_size() + value.memory_size()).unwrap_or(u32::MAX)
            })
            .eviction_policy(eviction.unwrap_or_else(EvictionPolicy::lru))
            .expire_after(StoredExpiry)
            .build()
    }
}

/// Configures a [`MokaBackend`].
///
/// A capacity must be picked with [`max_entries`](Self::max_entries) or
/// [`max_bytes`](Self::max_bytes) before `build()` becomes callable, and
/// only one of them can be picked.
///
/// ```
/// use keepsake_moka::{EvictionPolicy, MokaBackend};
///
/// let backend = MokaBackend::builder()
///     .max_bytes(100 * 1024 * 1024)
///     .eviction_policy(EvictionPolicy::tiny_lfu())
///     .build();
/// ```
pub struct MokaBackendBuilder<C = NoCapacity> {
    capacity: C,
    name: String,
    eviction: Option<EvictionPolicy>,
}

impl Default for MokaBackendBuilder {
    fn default() -> Self {
        Self {
            capacity: NoCapacity,
            name: String::from("moka"),
            eviction: None,
        }
    }
}

impl MokaBackendBuilder {
    /// Starts without a capacity.
    pub fn new() -> Self {
        Self::default()
    }

    /// Caps the store at `entries` entries.
    pub fn max_entries(self, entries: u64) -> MokaBackendBuilder<EntryCapacity> {
        self.limit(EntryCapacity(entries))
    }

    /// Caps the store at roughly `bytes` bytes, weighing each entry by its
    /// key and raw value.
    pub fn max_bytes(self, bytes: u64) -> MokaBackendBuilder<ByteCapacity> {
        self.limit(ByteCapacity(bytes))
    }

    fn limit<C: Capacity>(self, capacity: C) -> MokaBackendBuilder<C> {
        let Self { name, eviction, .. } = self;
        MokaBackendBuilder {
            capacity,
            name,
            eviction,
        }
    }
}

impl<C> MokaBackendBuilder<C> {
    /// Name reported by [`Backend::name`](keepsake_backend::Backend::name)
    /// and given to the moka cache. Defaults to `"moka"`.
    pub fn name(self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self
        }
    }

    /// Overrides the eviction policy picked by the capacity kind.
    pub fn eviction_policy(self, policy: EvictionPolicy) -> Self {
        Self {
            eviction: Some(policy),
            ..self
        }
    }
}

impl<C: Capacity> MokaBackendBuilder<C> {
    /// Creates the store.
    pub fn build(self) -> MokaBackend {
        let cache = self.capacity.create(&self.name, self.eviction);
        MokaBackend::from_parts(cache, self.name)
    }
}
