//! Loader-role adapter: read-only fetch of original inputs.
//!
//! When no bucket is configured, the first segment of the requested path
//! names the bucket and the remainder is the key, so one loader can serve
//! sources spread across many buckets. "Not found" is reported through the
//! result, never as an error; only transport faults propagate.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::client::{Expiry, S3Client};
use crate::config::{Config, S3ClientConfig};
use crate::errors::Result;
use crate::normalizer;

/// Why a load did not produce an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoaderErrorCode {
    /// The source object does not exist (or the backend refused the read).
    NotFound,
}

/// Outcome of a [`Loader::load`] call.
#[derive(Debug, Clone)]
pub struct LoaderResult {
    /// Whether a source image was produced.
    pub successful: bool,
    /// The source bytes on success, empty otherwise.
    pub buffer: Bytes,
    /// Failure classification when unsuccessful.
    pub error: Option<LoaderErrorCode>,
    /// Diagnostic detail from the backend when unsuccessful.
    pub diagnostic: Option<String>,
    /// Byte length of the source on success.
    pub size: usize,
    /// Last-modified timestamp of the source, when reported.
    pub updated_at: Option<DateTime<Utc>>,
}

/// Source loader backed by S3.
pub struct Loader {
    client: S3Client,
}

impl Loader {
    /// Build the adapter from the host configuration. Compatibility-mode
    /// remapping is resolved here, once. The SDK connection itself is
    /// created lazily on the first `load` and reused afterwards.
    pub fn new(config: &Config) -> Self {
        Self {
            client: S3Client::new(S3ClientConfig::for_loader(config)),
        }
    }

    /// The underlying object-store client.
    pub fn client(&self) -> &S3Client {
        &self.client
    }

    /// Fetch the source object for `path`.
    pub async fn load(&self, path: &str) -> Result<LoaderResult> {
        let (bucket, real_path) = bucket_and_path(self.client.bucket(), path);
        let key = normalizer::normalize(self.client.root_path(), &real_path);

        debug!("loading source: bucket={} key={}", bucket, key);

        let response = self.client.get_data(&bucket, &key, Expiry::Never).await?;

        if response.status != 200 {
            return Ok(LoaderResult {
                successful: false,
                buffer: Bytes::new(),
                error: Some(LoaderErrorCode::NotFound),
                diagnostic: Some(if response.body.is_empty() {
                    format!("status code {}", response.status)
                } else {
                    String::from_utf8_lossy(&response.body).into_owned()
                }),
                size: 0,
                updated_at: None,
            });
        }

        Ok(LoaderResult {
            successful: true,
            size: response.body.len(),
            updated_at: response.last_modified,
            buffer: response.body,
            error: None,
            diagnostic: None,
        })
    }
}

/// Split a request path into (bucket, path).
///
/// With a configured bucket the whole input is the path. With an empty
/// bucket the first slash-separated segment names the bucket.
fn bucket_and_path(configured_bucket: &str, path: &str) -> (String, String) {
    if !configured_bucket.is_empty() {
        return (configured_bucket.to_string(), path.to_string());
    }

    let stripped = path.trim_start_matches('/');
    match stripped.split_once('/') {
        Some((bucket, rest)) => (bucket.to_string(), rest.to_string()),
        None => (stripped.to_string(), String::new()),
    }
}
