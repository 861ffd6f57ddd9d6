//! Serialization of cache entries.

use keepsake_core::{CacheEntry, Raw};
use thiserror::Error;

mod json;

pub use json::JsonFormat;

/// Error raised while encoding or decoding an entry.
#[derive(Error, Debug)]
pub enum FormatError {
    /// Encoding failed.
    #[error(transparent)]
    Serialize(Box<dyn std::error::Error + Send + Sync>),

    /// Decoding failed.
    #[error(transparent)]
    Deserialize(Box<dyn std::error::Error + Send + Sync>),
}

/// Byte encoding of [`CacheEntry`] values.
///
/// Object safe, so a backend can hand out `&dyn Format`.
pub trait Format: Send + Sync + std::fmt::Debug {
    /// Encodes an entry.
    fn serialize(&self, entry: &CacheEntry) -> Result<Raw, FormatError>;

    /// Decodes an entry.
    fn deserialize(&self, data: &[u8]) -> Result<CacheEntry, FormatError>;
}
