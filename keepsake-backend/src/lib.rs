//! Traits and structs for keepsake cache store interaction.
//!
//! A store only has to move bytes: implement [`Backend`] (`read`, `write`,
//! `remove`), add an empty `impl CacheBackend`, and the interceptor gets typed
//! `get`/`set`/`delete` of [`CacheEntry`](keepsake_core::CacheEntry)
//! values serialized with [`JsonFormat`], or whatever [`Format`] the store
//! returns from [`Backend::value_format`].
mod backend;
mod error;
pub mod format;

pub use backend::{Backend, BackendResult, CacheBackend};
pub use error::BackendError;
pub use format::{Format, FormatError, JsonFormat};

/// Status of deleting result.
#[derive(Debug, PartialEq, Eq)]
pub enum DeleteStatus {
    /// Records successfully deleted.
    Deleted(u32),
    /// Record already missing.
    Missing,
}
