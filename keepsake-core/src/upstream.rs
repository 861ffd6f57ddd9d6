use std::error::Error as StdError;
use std::future::Future;

use crate::request::RequestDescriptor;
use crate::response::TransportResponse;

/// Error type of an [`Upstream`].
///
/// Some transports surface a `304 Not Modified` as an error rather than a
/// response. Such transports override [`into_not_modified`] so the
/// interceptor can still treat the 304 as a successful revalidation.
///
/// [`into_not_modified`]: UpstreamError::into_not_modified
pub trait UpstreamError: StdError + Send + Sync + 'static {
    /// Recovers the 304 response carried by this error, if any.
    fn into_not_modified(self) -> Result<TransportResponse, Self>
    where
        Self: Sized,
    {
        Err(self)
    }
}

/// Trait for performing the actual network call.
///
/// This trait is transport-agnostic: the interceptor hands it a
/// [`RequestDescriptor`], possibly with conditional headers added, and gets
/// back the raw status, headers and body.
///
/// # Examples
///
/// ```rust,ignore
/// use keepsake_core::{RequestDescriptor, TransportResponse, Upstream};
/// use std::future::Ready;
///
/// struct Canned(TransportResponse);
///
/// impl Upstream for Canned {
///     type Error = MyError;
///     type Future = Ready<Result<TransportResponse, MyError>>;
///
///     fn call(&mut self, _req: RequestDescriptor) -> Self::Future {
///         std::future::ready(Ok(self.0.clone()))
///     }
/// }
/// ```
pub trait Upstream {
    /// Transport error.
    type Error: UpstreamError;

    /// The future that resolves to the transport response.
    type Future: Future<Output = Result<TransportResponse, Self::Error>> + Send;

    /// Performs the call described by `req`.
    fn call(&mut self, req: RequestDescriptor) -> Self::Future;
}
