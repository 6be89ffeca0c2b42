//! Error types for the asset cache
//!
//! Provides unified error handling using thiserror.

use std::time::Duration;

use thiserror::Error;
use tracing::warn;

/// Boxed error used to carry an underlying cause across collaborator seams.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

// == Network Error Enum ==
/// Failure reported by the transport while fetching bytes.
#[derive(Error, Debug)]
pub enum NetworkError {
    /// The fetch did not finish within its allotted time
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The fetch was cancelled before it produced a result
    #[error("request cancelled")]
    Cancelled,

    /// The server answered with a non-success status code
    #[error("unexpected status code {0}")]
    Status(u16),

    /// Connection-level or I/O failure
    #[error("connection failed: {0}")]
    Connection(#[source] BoxError),
}

/// Timeouts are classified by the transport, which knows the configured duration.
impl From<reqwest::Error> for NetworkError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => NetworkError::Status(status.as_u16()),
            None => NetworkError::Connection(Box::new(err)),
        }
    }
}

// == Asset Error Enum ==
/// Unified error type for asset requests.
#[derive(Error, Debug)]
pub enum AssetError {
    /// Fetching the bytes failed
    #[error("network error: {0}")]
    Network(#[from] NetworkError),

    /// The payload did not match the shape the decoder expected
    #[error("decode error: {0}")]
    Decode(#[source] BoxError),
}

impl AssetError {
    /// Wraps any decoder failure.
    pub fn decode<E>(err: E) -> Self
    where
        E: Into<BoxError>,
    {
        AssetError::Decode(err.into())
    }

    /// True when the underlying fetch was cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, AssetError::Network(NetworkError::Cancelled))
    }
}

// == Failure Logging ==
/// Records a failure against the place it happened.
///
/// Side channel only: the error is still delivered to the caller.
pub(crate) fn log_failure(err: &dyn std::error::Error, context: &str) {
    warn!(error = %err, context, "asset request failed");
}

// == Result Type Alias ==
/// Convenience Result type for asset requests.
pub type Result<T> = std::result::Result<T, AssetError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_error_display() {
        let err = NetworkError::Status(404);
        assert_eq!(err.to_string(), "unexpected status code 404");

        let err = NetworkError::Timeout(Duration::from_secs(10));
        assert_eq!(err.to_string(), "request timed out after 10s");
    }

    #[test]
    fn test_asset_error_from_network() {
        let err: AssetError = NetworkError::Cancelled.into();
        assert!(err.is_cancelled());
        assert_eq!(err.to_string(), "network error: request cancelled");
    }

    #[test]
    fn test_decode_error_keeps_source() {
        let cause = serde_json::from_slice::<u32>(b"nope").unwrap_err();
        let err = AssetError::decode(cause);

        assert!(!err.is_cancelled());
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.to_string().starts_with("decode error:"));
    }
}
