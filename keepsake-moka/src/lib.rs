//! In-memory cache store for keepsake, backed by [moka].
//!
//! ```
//! use keepsake_moka::MokaBackend;
//!
//! let backend = MokaBackend::builder().max_entries(10_000).build();
//! ```
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod backend;
mod builder;

pub use backend::MokaBackend;
pub use builder::{ByteCapacity, Capacity, EntryCapacity, MokaBackendBuilder, NoCapacity};
pub use moka::policy::EvictionPolicy;
