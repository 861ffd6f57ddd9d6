use http_cache_semantics::CachePolicy;
use serde::{Deserialize, Serialize};

use crate::response::Projected;

/// A stored response together with the cache policy it was stored under.
///
/// An entry is only written when its policy was storable with a positive
/// time to live at write time. Revalidation replaces the policy and keeps the
/// response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Policy derived from the request/response pair.
    pub policy: CachePolicy,
    /// Projection handed back on a hit.
    pub response: Projected,
}

impl CacheEntry {
    /// Creates an entry.
    pub fn new(policy: CachePolicy, response: Projected) -> Self {
        Self { policy, response }
    }

    /// Returns the entry with `policy` in place of the current one.
    pub fn with_policy(self, policy: CachePolicy) -> Self {
        Self {
            policy,
            response: self.response,
        }
    }
}
