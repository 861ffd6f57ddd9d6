//! reqwest integration for keepsake.
//!
//! [`ReqwestUpstream`] is the transport the interceptor calls on a miss or a
//! revalidation. [`CachedClient`] pairs it with an [`Interceptor`] and
//! exposes one method per HTTP verb.
//!
//! ```rust,ignore
//! use keepsake_moka::MokaBackend;
//! use keepsake_reqwest::CachedClient;
//!
//! let client = CachedClient::new(reqwest::Client::new(), MokaBackend::builder().build());
//!
//! let first = client.get("http://localhost:3000/one").send().await?;
//! let second = client.get("http://localhost:3000/one").send().await?;
//! assert!(second.is_hit());
//! ```
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod client;
mod upstream;

pub use client::CachedClient;
pub use upstream::{ReqwestUpstream, ReqwestUpstreamError};

pub use keepsake::{CallBuilder, CallOptions, CallOutcome, Interceptor};
