//! Cache store traits.
//!
//! Re-exports from `keepsake-backend` for implementing custom stores:
//!
//! - `Backend` - Raw byte storage with per-entry expiry
//! - `CacheBackend` - Typed `get`/`set`/`delete` of cache entries
//! - `BackendError` - Error type for store operations
//! - `DeleteStatus` - Result of a delete
//!
//! [`keepsake-moka`] provides an in-memory store.
//!
//! [`keepsake-moka`]: https://docs.rs/keepsake-moka

pub use keepsake_backend::{Backend, BackendError, CacheBackend, DeleteStatus};
