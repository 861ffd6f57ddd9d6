#![warn(missing_docs)]
//! # keepsake-core
//!
//! Core types shared by the keepsake HTTP caching interceptor.
//!
//! This crate holds the protocol-level vocabulary the interceptor, the cache
//! stores and the transports agree on:
//!
//! - **Describe** an outgoing call ([`RequestDescriptor`], [`MethodClass`])
//! - **Identify** a cached resource ([`CacheKey`], [`KeyGenerator`])
//! - **Shape** what gets cached and returned ([`Projected`], [`ProjectedResponse`])
//! - **Persist** a response together with its policy ([`CacheEntry`], [`CacheValue`])
//! - **Reach** the network ([`Upstream`], [`UpstreamError`], [`TransportResponse`])

pub mod entry;
pub mod key;
pub mod request;
pub mod response;
pub mod status;
pub mod upstream;
pub mod value;

pub use entry::CacheEntry;
pub use key::{CacheKey, KeyGenerator, PruneSet};
pub use request::{MethodClass, RequestDescriptor};
pub use response::{Projected, ProjectedResponse, RequestSnapshot, TransportResponse};
pub use status::{CacheStatus, X_CACHE};
pub use upstream::{Upstream, UpstreamError};
pub use value::CacheValue;

/// Raw byte data type used for serialized cache values.
/// Using `Bytes` provides efficient zero-copy cloning via reference counting.
pub type Raw = bytes::Bytes;
