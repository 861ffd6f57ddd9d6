//! Cache status reported on every cacheable call.

use std::fmt;

use http::HeaderName;

/// Name of the header carrying the [`CacheStatus`] on returned responses.
pub const X_CACHE: HeaderName = HeaderName::from_static("x-cache");

/// Whether a cacheable call was answered from the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheStatus {
    /// Served from a stored entry, fresh or revalidated by a 304.
    Hit,
    /// Answered with a response fetched from the network.
    Miss,
}

impl CacheStatus {
    /// Header value for this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
        }
    }
}

impl fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
