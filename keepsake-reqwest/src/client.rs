//! Cached HTTP client facade.

use std::sync::Arc;

use http::Method;
use keepsake::{CallBuilder, CallOptions, Interceptor};
use keepsake_backend::CacheBackend;
use reqwest_middleware::ClientWithMiddleware;

use crate::upstream::ReqwestUpstream;

/// HTTP client whose calls go through a keepsake [`Interceptor`].
///
/// Each verb method starts a [`CallBuilder`] carrying the instance defaults;
/// per-call options are chained before `send()`.
///
/// ```rust,ignore
/// use keepsake_moka::MokaBackend;
/// use keepsake_reqwest::CachedClient;
///
/// let client = CachedClient::new(reqwest::Client::new(), MokaBackend::builder().build());
/// let outcome = client
///     .get("http://localhost:3000/one")
///     .expiration(30)
///     .send()
///     .await?;
/// ```
pub struct CachedClient<B> {
    interceptor: Interceptor<B, ReqwestUpstream>,
}

impl<B> Clone for CachedClient<B> {
    fn clone(&self) -> Self {
        Self {
            interceptor: self.interceptor.clone(),
        }
    }
}

impl<B> std::fmt::Debug for CachedClient<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedClient")
            .field("interceptor", &self.interceptor)
            .finish()
    }
}

impl<B> CachedClient<B>
where
    B: CacheBackend + Send + Sync + 'static,
{
    /// Client over `client` storing into `backend`, with default options.
    pub fn new(client: impl Into<ClientWithMiddleware>, backend: B) -> Self {
        Self::with_defaults(client, Arc::new(backend), CallOptions::default())
    }

    /// Client over `client` sharing `backend`, starting every call from `defaults`.
    pub fn with_defaults(
        client: impl Into<ClientWithMiddleware>,
        backend: Arc<B>,
        defaults: CallOptions,
    ) -> Self {
        let interceptor = Interceptor::builder()
            .shared_backend(backend)
            .upstream(ReqwestUpstream::new(client))
            .defaults(defaults)
            .build();
        Self { interceptor }
    }

    /// Wrap an interceptor built elsewhere.
    pub fn from_interceptor(interceptor: Interceptor<B, ReqwestUpstream>) -> Self {
        Self { interceptor }
    }

    /// The underlying interceptor.
    pub fn interceptor(&self) -> &Interceptor<B, ReqwestUpstream> {
        &self.interceptor
    }

    /// Start a call with an arbitrary method.
    pub fn request(
        &self,
        method: Method,
        url: impl Into<String>,
    ) -> CallBuilder<'_, B, ReqwestUpstream> {
        self.interceptor.request(method, url)
    }

    /// Start a `GET` call.
    pub fn get(&self, url: impl Into<String>) -> CallBuilder<'_, B, ReqwestUpstream> {
        self.request(Method::GET, url)
    }

    /// Start a `HEAD` call.
    pub fn head(&self, url: impl Into<String>) -> CallBuilder<'_, B, ReqwestUpstream> {
        self.request(Method::HEAD, url)
    }

    /// Start a `POST` call.
    pub fn post(&self, url: impl Into<String>) -> CallBuilder<'_, B, ReqwestUpstream> {
        self.request(Method::POST, url)
    }

    /// Start a `PUT` call.
    pub fn put(&self, url: impl Into<String>) -> CallBuilder<'_, B, ReqwestUpstream> {
        self.request(Method::PUT, url)
    }

    /// Start a `PATCH` call.
    pub fn patch(&self, url: impl Into<String>) -> CallBuilder<'_, B, ReqwestUpstream> {
        self.request(Method::PATCH, url)
    }

    /// Start a `DELETE` call.
    pub fn delete(&self, url: impl Into<String>) -> CallBuilder<'_, B, ReqwestUpstream> {
        self.request(Method::DELETE, url)
    }
}
