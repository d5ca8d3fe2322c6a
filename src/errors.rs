//! Error types for the S3 adapters.
//!
//! Every failure surfaced to the host maps to one variant of [`Error`].
//! "Not found" and "expired" are *not* errors at the client layer -- the
//! [`crate::client::S3Client`] recovers them into ordinary status codes
//! (404 / 410) and lets each adapter decide its own contract.

use thiserror::Error;

/// Boxed error source for transport-level faults.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised by the S3 adapters.
#[derive(Debug, Error)]
pub enum Error {
    /// The backend rejected a write, or the write failed in transit.
    #[error("unable to upload object to {key}: {reason}")]
    Upload { key: String, reason: String },

    /// The backend accepted a delete request but reported a non-success status.
    #[error("failed to remove {key}: status code {status}")]
    Delete { key: String, status: u16 },

    /// A feature is enabled but its required configuration is absent.
    /// Raised before any network call.
    #[error("{message}")]
    Configuration { message: String },

    /// The object does not exist, in a contract that promises a value.
    #[error("object not found at {key}: {reason}")]
    NotFound { key: String, reason: String },

    /// Connection failure or malformed backend response.
    #[error("S3 {operation} failed for {key}")]
    Transport {
        operation: &'static str,
        key: String,
        #[source]
        source: BoxError,
    },
}

impl Error {
    /// Wrap a transport-level fault with the operation and key it occurred on.
    pub fn transport(
        operation: &'static str,
        key: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        Error::Transport {
            operation,
            key: key.into(),
            source: source.into(),
        }
    }
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;
