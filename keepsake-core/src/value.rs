//! Cached value with expiration metadata.
//!
//! [`CacheValue`] is what stores persist: the serialized entry plus the
//! instant after which the store may drop it. Stores use the timestamp for
//! their own eviction; freshness of the HTTP response itself is decided by the
//! policy carried inside the entry.

use chrono::{DateTime, Utc};
use std::mem::size_of;
use std::time::Duration;

use crate::Raw;

/// A cached value with an optional expiration timestamp.
///
/// # Example
///
/// ```
/// use keepsake_core::CacheValue;
/// use chrono::Utc;
///
/// let value = CacheValue::new("entry", Some(Utc::now() + chrono::Duration::hours(1)));
/// assert_eq!(value.data(), &"entry");
/// assert!(value.ttl().is_some());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheValue<T> {
    data: T,
    expire: Option<DateTime<Utc>>,
}

impl<T> CacheValue<T> {
    /// Creates a new value expiring at `expire`, or never when `None`.
    pub fn new(data: T, expire: Option<DateTime<Utc>>) -> Self {
        CacheValue { data, expire }
    }

    /// Creates a value that expires `ttl` from now.
    pub fn with_ttl(data: T, ttl: Duration) -> Self {
        let expire = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| Utc::now().checked_add_signed(ttl));
        CacheValue::new(data, expire)
    }

    /// Returns a reference to the cached data.
    #[inline]
    pub fn data(&self) -> &T {
        &self.data
    }

    /// Returns when the store may drop the value.
    #[inline]
    pub fn expire(&self) -> Option<DateTime<Utc>> {
        self.expire
    }

    /// Whether the expiration timestamp has passed.
    pub fn is_expired(&self) -> bool {
        self.expire.is_some_and(|expire| expire <= Utc::now())
    }

    /// Remaining time to live.
    ///
    /// Returns `None` when there is no expire time or it already passed.
    pub fn ttl(&self) -> Option<Duration> {
        self.expire.and_then(|expire| {
            let duration = expire.signed_duration_since(Utc::now());
            if duration.num_seconds() > 0 {
                Some(Duration::from_secs(duration.num_seconds() as u64))
            } else {
                None
            }
        })
    }
}

impl CacheValue<Raw> {
    /// Estimated memory usage in bytes: struct overhead plus payload length.
    pub fn memory_size(&self) -> usize {
        size_of::<Self>() + self.data.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_ttl_sets_future_expire() {
        let value = CacheValue::with_ttl((), Duration::from_secs(120));
        let ttl = value.ttl().unwrap();
        assert!(ttl <= Duration::from_secs(120));
        assert!(ttl >= Duration::from_secs(118));
        assert!(!value.is_expired());
    }

    #[test]
    fn test_past_expire_is_expired() {
        let value = CacheValue::new(1u8, Some(Utc::now() - chrono::Duration::seconds(1)));
        assert!(value.is_expired());
        assert_eq!(value.ttl(), None);
    }

    #[test]
    fn test_no_expire_never_expires() {
        let value = CacheValue::new("x", None);
        assert!(!value.is_expired());
        assert_eq!(value.ttl(), None);
    }
}
