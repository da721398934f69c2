use std::sync::Arc;
use thiserror::Error;

/// Unified error type for the API manager.
///
/// Transport and timeout failures are the only failures the request pipeline
/// surfaces; HTTP-level error statuses (4xx/5xx) are decoded and returned as
/// ordinary response bodies for the caller to interpret.
#[derive(Debug, Error)]
pub enum Error {
    /// The per-caller timeout (or the transport deadline) fired before a
    /// response arrived.
    #[error("request timed out")]
    RequestTimedOut,

    /// Any other transport-level failure: connection refused, DNS failure,
    /// TLS handshake error, broken body stream.
    #[error("request failed: {0}")]
    RequestFailed(#[source] reqwest::Error),

    /// `upload_file` was called with a path that is not a regular file.
    #[error("invalid upload: {0}")]
    InvalidUpload(String),

    /// Cache backend failure. Absorbed inside the request pipeline (a failing
    /// read degrades to a miss, a failing write skips the write-back); only
    /// direct cache-management calls surface it.
    #[error("cache storage error: {0}")]
    Storage(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// A coalesced caller observing the failure of the call it shared.
    /// The original error is behind an `Arc` because transport errors are
    /// not cloneable. Displays as its cause: the initiating caller receives
    /// this wrap too, and its message should read the same either way.
    #[error(transparent)]
    Shared(Arc<Error>),
}

impl Error {
    /// Map a `reqwest` failure into the crate taxonomy. A transport-level
    /// timeout is distinguished from every other transport failure.
    pub(crate) fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Error::RequestTimedOut
        } else {
            Error::RequestFailed(err)
        }
    }

    /// Whether this error (possibly through a shared layer) is a timeout.
    pub fn is_timeout(&self) -> bool {
        match self {
            Error::RequestTimedOut => true,
            Error::Shared(inner) => inner.is_timeout(),
            _ => false,
        }
    }
}

impl From<Arc<Error>> for Error {
    fn from(err: Arc<Error>) -> Self {
        Error::Shared(err)
    }
}

/// Result type alias for the library.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_errors_display_as_their_cause() {
        let shared = Error::Shared(Arc::new(Error::RequestTimedOut));
        assert_eq!(shared.to_string(), "request timed out");
        assert!(shared.is_timeout());
    }

    #[test]
    fn shared_wrap_nests_without_changing_the_message() {
        let inner = Error::InvalidUpload("not a file".into());
        let shared = Error::Shared(Arc::new(inner));
        assert_eq!(shared.to_string(), "invalid upload: not a file");
        assert!(!shared.is_timeout());
    }
}
