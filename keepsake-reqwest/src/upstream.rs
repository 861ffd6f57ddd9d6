//! Transport over a `reqwest-middleware` client.

use std::future::Future;
use std::pin::Pin;

use keepsake_core::{RequestDescriptor, TransportResponse, Upstream, UpstreamError};
use reqwest_middleware::ClientWithMiddleware;
use tracing::trace;

/// Error raised by [`ReqwestUpstream`].
#[derive(Debug, thiserror::Error)]
pub enum ReqwestUpstreamError {
    /// The request could not be sent or its body could not be read.
    #[error(transparent)]
    Transport(#[from] reqwest_middleware::Error),
    /// A non-2xx response, raised when `error_for_status` is on.
    #[error("HTTP status {}", .0.status())]
    Status(TransportResponse),
}

impl From<reqwest::Error> for ReqwestUpstreamError {
    fn from(error: reqwest::Error) -> Self {
        ReqwestUpstreamError::Transport(reqwest_middleware::Error::Reqwest(error))
    }
}

impl ReqwestUpstreamError {
    /// The response carried by a [`Status`](Self::Status) error.
    pub fn response(&self) -> Option<&TransportResponse> {
        match self {
            ReqwestUpstreamError::Status(response) => Some(response),
            ReqwestUpstreamError::Transport(_) => None,
        }
    }
}

impl UpstreamError for ReqwestUpstreamError {
    fn into_not_modified(self) -> Result<TransportResponse, Self> {
        match self {
            ReqwestUpstreamError::Status(response)
                if response.status() == http::StatusCode::NOT_MODIFIED =>
            {
                Ok(response)
            }
            other => Err(other),
        }
    }
}

/// [`Upstream`] that sends requests through a [`ClientWithMiddleware`].
///
/// Any middleware already installed on the client (retries, tracing, auth)
/// runs for every request that reaches the network.
#[derive(Clone, Debug)]
pub struct ReqwestUpstream {
    client: ClientWithMiddleware,
    error_for_status: bool,
}

impl ReqwestUpstream {
    /// Create a transport over `client`. Every status is returned as a response.
    pub fn new(client: impl Into<ClientWithMiddleware>) -> Self {
        Self {
            client: client.into(),
            error_for_status: false,
        }
    }

    /// Raise non-2xx responses as [`ReqwestUpstreamError::Status`].
    ///
    /// A `304 Not Modified` raised this way is still recognised as a
    /// successful revalidation by the interceptor.
    pub fn error_for_status(mut self, enabled: bool) -> Self {
        self.error_for_status = enabled;
        self
    }
}

impl Upstream for ReqwestUpstream {
    type Error = ReqwestUpstreamError;
    type Future = Pin<Box<dyn Future<Output = Result<TransportResponse, Self::Error>> + Send>>;

    fn call(&mut self, req: RequestDescriptor) -> Self::Future {
        let client = self.client.clone();
        let error_for_status = self.error_for_status;

        Box::pin(async move {
            let mut builder = client
                .request(req.method().clone(), req.uri().to_string())
                .headers(req.headers().clone());
            if !req.body().is_empty() {
                builder = builder.body(req.body().clone());
            }

            let response = builder.send().await?;
            let status = response.status();
            let headers = response.headers().clone();
            let body = response.bytes().await?;
            trace!(%status, bytes = body.len(), "upstream responded");

            let response = TransportResponse::new(status, headers, body);
            if error_for_status && !status.is_success() {
                return Err(ReqwestUpstreamError::Status(response));
            }
            Ok(response)
        })
    }
}
