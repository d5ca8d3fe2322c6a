//! Storage-role adapter: cache of source images plus sidecar metadata.
//!
//! Each cached image may carry two sidecar objects derived from its path:
//! `<path>.txt` holds the signing key in force when the image was stored,
//! and `<path>.detectors.txt` holds detector output as JSON. Sidecars are
//! independent objects; one may exist without the other.
//!
//! Contract note: `get`, `get_security_token` and `get_detector_data` all
//! promise a value, so a missing object surfaces as [`Error::NotFound`]
//! rather than an optional result.

use bytes::Bytes;
use tracing::debug;

use crate::client::{Expiry, S3Client};
use crate::config::{Config, S3ClientConfig};
use crate::errors::{Error, Result};
use crate::{mime, normalizer};

/// Suffix of the signing-key sidecar.
const SECURITY_TOKEN_SUFFIX: &str = ".txt";
/// Suffix of the detector-data sidecar.
const DETECTOR_DATA_SUFFIX: &str = ".detectors.txt";

/// Source-image cache backed by S3.
pub struct Storage {
    client: S3Client,
    store_security_key: bool,
    security_key: Option<String>,
}

impl Storage {
    /// Build the adapter from the host configuration. Compatibility-mode
    /// remapping is resolved here, once.
    pub fn new(config: &Config) -> Self {
        Self {
            client: S3Client::new(S3ClientConfig::for_storage(config)),
            store_security_key: config.store_security_key,
            security_key: config.security_key.clone(),
        }
    }

    /// The underlying object-store client.
    pub fn client(&self) -> &S3Client {
        &self.client
    }

    fn normalize_path(&self, path: &str) -> String {
        normalizer::normalize(self.client.root_path(), path)
    }

    fn security_token_key(&self, path: &str) -> String {
        format!("{}{}", self.normalize_path(path), SECURITY_TOKEN_SUFFIX)
    }

    fn detector_data_key(&self, path: &str) -> String {
        format!("{}{}", self.normalize_path(path), DETECTOR_DATA_SUFFIX)
    }

    /// Store `data` at `path`, returning the object's public URL.
    /// The content type is inferred from the payload signature.
    pub async fn put(&self, path: &str, data: Bytes) -> Result<String> {
        let key = self.normalize_path(path);
        let content_type = mime::from_bytes(&data);
        self.client.upload(&key, data, content_type).await
    }

    /// Store the configured signing key in the `<path>.txt` sidecar.
    ///
    /// Returns `Ok(None)` without touching the network when the feature is
    /// disabled. Fails with a configuration error when enabled without a
    /// signing key.
    pub async fn put_security_token(&self, path: &str) -> Result<Option<String>> {
        if !self.store_security_key {
            return Ok(None);
        }

        let security_key = self.security_key.as_ref().ok_or_else(|| Error::Configuration {
            message: "store_security_key can't be enabled if no security_key is specified"
                .to_string(),
        })?;

        let key = self.security_token_key(path);
        let url = self
            .client
            .upload(&key, Bytes::from(security_key.clone().into_bytes()), "text/plain")
            .await?;

        debug!("stored security token at {}", key);

        Ok(Some(url))
    }

    /// Serialize `data` as JSON into the `<path>.detectors.txt` sidecar.
    pub async fn put_detector_data(&self, path: &str, data: &serde_json::Value) -> Result<String> {
        let key = self.detector_data_key(path);
        let body = serde_json::to_vec(data)
            .map_err(|err| Error::transport("serialize detector data", key.as_str(), err))?;
        self.client.upload(&key, Bytes::from(body), "application/json").await
    }

    /// Fetch the cached image at `path`.
    pub async fn get(&self, path: &str) -> Result<Bytes> {
        let key = self.normalize_path(path);
        let response = self
            .client
            .get_data(self.client.bucket(), &key, Expiry::Configured)
            .await?;

        if response.status != 200 {
            return Err(Error::NotFound {
                key,
                reason: diagnostic(&response.body, response.status),
            });
        }

        Ok(response.body)
    }

    /// Fetch the signing key stored alongside the image at `path`.
    pub async fn get_security_token(&self, path: &str) -> Result<String> {
        let key = self.security_token_key(path);
        let response = self
            .client
            .get_data(self.client.bucket(), &key, Expiry::Configured)
            .await?;

        if response.status != 200 {
            return Err(Error::NotFound {
                key,
                reason: diagnostic(&response.body, response.status),
            });
        }

        Ok(String::from_utf8_lossy(&response.body).into_owned())
    }

    /// Fetch and parse the detector-data sidecar for `path`.
    pub async fn get_detector_data(&self, path: &str) -> Result<serde_json::Value> {
        let key = self.detector_data_key(path);
        let response = self
            .client
            .get_data(self.client.bucket(), &key, Expiry::Configured)
            .await?;

        if response.status != 200 {
            return Err(Error::NotFound {
                key: key.clone(),
                reason: diagnostic(&response.body, response.status),
            });
        }

        serde_json::from_slice(&response.body)
            .map_err(|err| Error::transport("parse detector data", key.as_str(), err))
    }

    /// Whether an image is cached at `path`.
    pub async fn exists(&self, path: &str) -> Result<bool> {
        let key = self.normalize_path(path);
        self.client.object_exists(&key).await
    }

    /// Remove the cached image at `path`. Removing a path that was never
    /// stored is a successful no-op.
    pub async fn remove(&self, path: &str) -> Result<()> {
        let key = self.normalize_path(path);
        self.client.delete_object(&key).await
    }
}

fn diagnostic(body: &Bytes, status: u16) -> String {
    if body.is_empty() {
        format!("status code {status}")
    } else {
        String::from_utf8_lossy(body).into_owned()
    }
}
