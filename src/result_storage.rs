//! ResultStorage-role adapter: cache of final rendered output.
//!
//! Results are keyed by the request URL that produced them, prefixed with
//! the adapter's root path and a variant segment: `auto_webp` when the
//! global toggle is on and the request accepts webp, `default` otherwise.
//! The host supplies the request URL and capability flag on every call;
//! the adapter keeps no per-request state.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::client::{Expiry, S3Client};
use crate::config::{Config, S3ClientConfig};
use crate::errors::Result;
use crate::{mime, normalizer};

/// Variant segment for webp-converted results.
const WEBP_SEGMENT: &str = "auto_webp";
/// Variant segment for everything else.
const DEFAULT_SEGMENT: &str = "default";

/// Metadata attached to a cached result.
///
/// Content length and content type are derived from the returned body,
/// never trusted from response headers.
#[derive(Debug, Clone)]
pub struct ResultMetadata {
    /// Last-modified timestamp, normalized to UTC.
    pub last_modified: Option<DateTime<Utc>>,
    /// Byte length of the returned body.
    pub content_length: usize,
    /// MIME type inferred from the body's signature.
    pub content_type: &'static str,
}

/// A cached result: the rendered bytes plus their metadata.
#[derive(Debug, Clone)]
pub struct ResultStorageResult {
    pub buffer: Bytes,
    pub metadata: ResultMetadata,
}

/// Rendered-output cache backed by S3.
pub struct ResultStorage {
    client: S3Client,
    auto_webp: bool,
}

impl ResultStorage {
    /// Build the adapter from the host configuration. Compatibility-mode
    /// remapping is resolved here, once.
    pub fn new(config: &Config) -> Self {
        Self {
            client: S3Client::new(S3ClientConfig::for_result_storage(config)),
            auto_webp: config.auto_webp,
        }
    }

    /// The underlying object-store client.
    pub fn client(&self) -> &S3Client {
        &self.client
    }

    /// Key for a request URL: `<root>/<variant>/<decoded path>`.
    pub fn normalize_path(&self, request_url: &str, accepts_webp: bool) -> String {
        let variant = if self.auto_webp && accepts_webp {
            WEBP_SEGMENT
        } else {
            DEFAULT_SEGMENT
        };
        let prefix = format!("{}/{}", self.client.root_path().trim_end_matches('/'), variant);
        normalizer::normalize(&prefix, request_url)
    }

    /// Cache the rendered result of `request_url`, returning its public URL.
    pub async fn put(&self, request_url: &str, accepts_webp: bool, data: Bytes) -> Result<String> {
        let key = self.normalize_path(request_url, accepts_webp);
        debug!("storing result at {}", key);

        let content_type = mime::from_bytes(&data);
        let url = self.client.upload(&key, data, content_type).await?;

        info!("result uploaded successfully to {}", key);
        Ok(url)
    }

    /// Fetch the cached result for `request_url`, if present and fresh.
    ///
    /// Existence is probed first so a cold cache costs a metadata round
    /// trip rather than a failed fetch. Stale entries return `None`.
    pub async fn get(
        &self,
        request_url: &str,
        accepts_webp: bool,
    ) -> Result<Option<ResultStorageResult>> {
        let key = self.normalize_path(request_url, accepts_webp);
        debug!("fetching result from {}", key);

        if !self.client.object_exists(&key).await? {
            debug!("no cached result at {}", key);
            return Ok(None);
        }

        let response = self
            .client
            .get_data(self.client.bucket(), &key, Expiry::Configured)
            .await?;

        if response.status != 200 {
            debug!(
                "cached result at {} not served (status {})",
                key, response.status
            );
            return Ok(None);
        }

        info!("result retrieved successfully from {}", key);

        let metadata = ResultMetadata {
            last_modified: response.last_modified,
            content_length: response.body.len(),
            content_type: mime::from_bytes(&response.body),
        };

        Ok(Some(ResultStorageResult {
            buffer: response.body,
            metadata,
        }))
    }

    /// Last-modified readout for legacy callers.
    ///
    /// Metadata-only probe that bypasses the freshness policy entirely.
    #[deprecated(note = "use the last_modified field of the result metadata instead")]
    pub async fn last_updated(
        &self,
        request_url: &str,
        accepts_webp: bool,
    ) -> Result<DateTime<Utc>> {
        let key = self.normalize_path(request_url, accepts_webp);
        debug!("probing last-modified for {}", key);
        self.client.object_last_modified(&key).await
    }
}
