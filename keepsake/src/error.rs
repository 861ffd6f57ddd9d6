//! Error types raised by the interceptor itself.
//!
//! Transport errors are never wrapped: they reach the caller as the
//! transport's own error type inside [`CallOutcome`](crate::CallOutcome).
//! Cache store errors never reach the caller at all.

/// A call could not be built.
///
/// These are programming mistakes, reported by
/// [`CallBuilder::send`](crate::CallBuilder::send) before any I/O happens.
#[derive(Debug, thiserror::Error)]
pub enum UsageError {
    /// The request URI does not parse.
    #[error("invalid request URI `{uri}`: {source}")]
    InvalidUri {
        /// The offending URI.
        uri: String,
        /// Parse failure.
        #[source]
        source: http::uri::InvalidUri,
    },

    /// A header name does not parse.
    #[error("invalid header name `{0}`")]
    InvalidHeaderName(String),

    /// A header value is not a valid header value.
    #[error("invalid value for header `{0}`")]
    InvalidHeaderValue(String),

    /// Query parameters or a JSON body could not be encoded.
    #[error("cannot encode request: {0}")]
    Encode(String),
}
