//! S3 object-store client shared by all three adapters.
//!
//! Wraps the AWS SDK with the uniform result contract the adapters build
//! on: every read yields an HTTP-like status, the materialized body, and
//! the object's last-modified timestamp. "Not found" (404) and "expired"
//! (410) are ordinary statuses here, never errors.
//!
//! Credentials are resolved via the standard AWS credential chain
//! (env vars, `~/.aws/credentials`, IAM role, etc.) unless an explicit
//! key pair is configured.

use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_s3::config::retry::RetryConfig;
use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::error::{DisplayErrorContext, SdkError};
use aws_sdk_s3::primitives::{ByteStream, DateTime as AwsDateTime};
use aws_sdk_s3::types::ObjectCannedAcl;
use aws_sdk_s3::Client;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::OnceCell;
use tracing::{debug, error, warn};

use crate::config::S3ClientConfig;
use crate::errors::{Error, Result};

/// Process-wide base SDK configuration (the "session").
///
/// Loaded at most once, on first use, and shared by every client in the
/// process. Per-adapter settings (region, endpoint, credentials) are
/// layered on top when each client is built.
static SDK_CONFIG: OnceCell<SdkConfig> = OnceCell::const_new();

/// Return the shared base SDK configuration, loading it on first call.
///
/// Concurrent first callers are serialized by the cell; initialization
/// happens exactly once.
pub async fn shared_sdk_config() -> &'static SdkConfig {
    SDK_CONFIG
        .get_or_init(|| async { aws_config::defaults(BehaviorVersion::latest()).load().await })
        .await
}

/// Uniform result of a read operation.
#[derive(Debug, Clone)]
pub struct GetResponse {
    /// HTTP-equivalent status: 200 on success, 404 when the key does not
    /// exist, 410 when the object is stale, otherwise the backend's status.
    pub status: u16,
    /// Object body on 200; empty on 404/410; a diagnostic message on
    /// other statuses.
    pub body: Bytes,
    /// Last-modified timestamp when the backend reported one. Present on
    /// 410 responses so callers can inspect staleness.
    pub last_modified: Option<DateTime<Utc>>,
}

/// Freshness window applied to a read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
    /// Use the client's configured expiration window.
    Configured,
    /// Never expire, regardless of configuration.
    Never,
    /// Explicit window in seconds. Zero means always expired.
    Seconds(u64),
}

/// Thin wrapper over the AWS S3 SDK, one per adapter instance.
///
/// The underlying SDK client is built lazily on first use and memoized;
/// it holds no per-call state and is safe for unlimited concurrent use.
pub struct S3Client {
    config: S3ClientConfig,
    client: OnceCell<Client>,
}

impl S3Client {
    /// Create a client from resolved connection settings.
    ///
    /// No network activity happens here; the SDK client is built on the
    /// first operation.
    pub fn new(config: S3ClientConfig) -> Self {
        Self {
            config,
            client: OnceCell::new(),
        }
    }

    /// Effective connection settings (compatibility remapping already applied).
    pub fn config(&self) -> &S3ClientConfig {
        &self.config
    }

    /// The bucket this client writes to.
    pub fn bucket(&self) -> &str {
        &self.config.bucket
    }

    /// The key prefix this client normalizes paths under.
    pub fn root_path(&self) -> &str {
        &self.config.root_path
    }

    /// The memoized SDK client, built from the shared base configuration
    /// plus this client's overrides.
    async fn client(&self) -> &Client {
        self.client
            .get_or_init(|| async {
                let sdk_config = shared_sdk_config().await;
                let mut builder = aws_sdk_s3::config::Builder::from(sdk_config)
                    .region(Region::new(self.config.region.clone()))
                    .retry_config(RetryConfig::disabled())
                    .force_path_style(self.config.endpoint_url.is_some());

                if let Some(ref endpoint) = self.config.endpoint_url {
                    builder = builder.endpoint_url(endpoint);
                }

                if let (Some(ref access_key), Some(ref secret_key)) =
                    (&self.config.access_key_id, &self.config.secret_access_key)
                {
                    builder = builder.credentials_provider(Credentials::new(
                        access_key,
                        secret_key,
                        None,
                        None,
                        "imgstore-config",
                    ));
                }

                Client::from_conf(builder.build())
            })
            .await
    }

    /// Upload `data` to `key` in the configured bucket, returning the
    /// object's public URL.
    pub async fn upload(&self, key: &str, data: Bytes, content_type: &str) -> Result<String> {
        debug!("put_object: bucket={} key={}", self.config.bucket, key);

        let mut request = self
            .client()
            .await
            .put_object()
            .bucket(&self.config.bucket)
            .key(key)
            .body(ByteStream::from(data))
            .content_type(content_type);

        if let Some(ref acl) = self.config.acl {
            request = request.acl(ObjectCannedAcl::from(acl.as_str()));
        }

        request.send().await.map_err(|err| {
            let reason = format!("{}", DisplayErrorContext(&err));
            error!("unable to upload object to {}: {}", key, reason);
            Error::Upload {
                key: key.to_string(),
                reason,
            }
        })?;

        // The SDK does not surface the Location response header on
        // PutObject outputs; many S3-compatible backends omit it anyway.
        // Fall back to the configured location template.
        note_missing_location(key);
        let location = self.resolved_default_location();
        Ok(join_location(&location, key))
    }

    /// Read the object at `key` in `bucket`, applying the freshness window.
    ///
    /// Missing keys and stale objects are recovered into 404/410 responses;
    /// other backend failures come back with their status and a diagnostic
    /// body. Only transport-level faults return an error.
    pub async fn get_data(&self, bucket: &str, key: &str, expiry: Expiry) -> Result<GetResponse> {
        debug!("get_object: bucket={} key={}", bucket, key);

        let response = match self
            .client()
            .await
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
        {
            Ok(response) => response,
            Err(SdkError::ServiceError(context)) => {
                if context.err().is_no_such_key() {
                    return Ok(GetResponse {
                        status: 404,
                        body: Bytes::new(),
                        last_modified: None,
                    });
                }
                let status = context.raw().status().as_u16();
                let message = format!("unable to read object at {key}: status code {status}");
                error!("{}", message);
                return Ok(GetResponse {
                    status,
                    body: Bytes::from(message),
                    last_modified: None,
                });
            }
            Err(err) => return Err(Error::transport("get_object", key, err)),
        };

        let last_modified = response.last_modified().and_then(to_chrono);

        // A backend that omits the timestamp cannot be checked for
        // staleness; such objects are served as fresh.
        if let Some(last_modified) = last_modified {
            if self.is_expired(last_modified, expiry) {
                return Ok(GetResponse {
                    status: 410,
                    body: Bytes::new(),
                    last_modified: Some(last_modified),
                });
            }
        }

        let body = response
            .body
            .collect()
            .await
            .map_err(|err| Error::transport("get_object body", key, err))?
            .into_bytes();

        Ok(GetResponse {
            status: 200,
            body,
            last_modified,
        })
    }

    /// Probe whether `key` exists in the configured bucket.
    ///
    /// Uses a GetObjectAcl metadata probe; the body is never fetched.
    pub async fn object_exists(&self, key: &str) -> Result<bool> {
        debug!(
            "get_object_acl (existence probe): bucket={} key={}",
            self.config.bucket, key
        );

        match self
            .client()
            .await
            .get_object_acl()
            .bucket(&self.config.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(SdkError::ServiceError(context)) if context.err().is_no_such_key() => Ok(false),
            Err(err) => Err(Error::transport("get_object_acl", key, err)),
        }
    }

    /// Metadata-only readout of the object's last-modified timestamp.
    ///
    /// Bypasses the freshness policy; kept for the deprecated
    /// `last_updated` path of the result storage.
    pub async fn object_last_modified(&self, key: &str) -> Result<DateTime<Utc>> {
        debug!(
            "head_object: bucket={} key={}",
            self.config.bucket, key
        );

        let response = match self
            .client()
            .await
            .head_object()
            .bucket(&self.config.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(response) => response,
            Err(SdkError::ServiceError(context)) if context.err().is_not_found() => {
                return Err(Error::NotFound {
                    key: key.to_string(),
                    reason: "no such object".to_string(),
                });
            }
            Err(err) => return Err(Error::transport("head_object", key, err)),
        };

        response
            .last_modified()
            .and_then(to_chrono)
            .ok_or_else(|| Error::NotFound {
                key: key.to_string(),
                reason: "response carried no last-modified timestamp".to_string(),
            })
    }

    /// Delete the object at `key`. Deleting a key that does not exist is a
    /// successful no-op.
    pub async fn delete_object(&self, key: &str) -> Result<()> {
        if !self.object_exists(key).await? {
            return Ok(());
        }

        debug!("delete_object: bucket={} key={}", self.config.bucket, key);

        match self
            .client()
            .await
            .delete_object()
            .bucket(&self.config.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(()),
            Err(SdkError::ServiceError(context)) => {
                let status = context.raw().status().as_u16();
                Err(Error::Delete {
                    key: key.to_string(),
                    status,
                })
            }
            Err(err) => Err(Error::transport("delete_object", key, err)),
        }
    }

    /// The configured location template with the bucket name interpolated.
    fn resolved_default_location(&self) -> String {
        self.config
            .default_location
            .replace("{bucket_name}", &self.config.bucket)
    }

    /// Freshness policy: expired when `now - last_modified >= window`.
    /// The boundary is inclusive, so a zero window is always expired.
    fn is_expired(&self, last_modified: DateTime<Utc>, expiry: Expiry) -> bool {
        let window = match expiry {
            Expiry::Never => return false,
            Expiry::Seconds(seconds) => Some(seconds),
            Expiry::Configured => self.config.expiration_seconds,
        };
        match window {
            None => false,
            Some(window) => (Utc::now() - last_modified).num_seconds() >= window as i64,
        }
    }
}

static LOCATION_FALLBACK_WARNED: AtomicBool = AtomicBool::new(false);

/// Record the missing-location fallback: warn level on the first upload
/// in the process, debug afterwards. Returns whether this call warned.
fn note_missing_location(key: &str) -> bool {
    if LOCATION_FALLBACK_WARNED.swap(true, Ordering::Relaxed) {
        debug!(
            "no location header in response for {}; using the default location template",
            key
        );
        false
    } else {
        warn!(
            "no location header in response for {}; using the default location template",
            key
        );
        true
    }
}

/// Join a location URL and a key without doubling the slash.
fn join_location(location: &str, key: &str) -> String {
    format!(
        "{}/{}",
        location.trim_end_matches('/'),
        key.trim_start_matches('/')
    )
}

fn to_chrono(timestamp: &AwsDateTime) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(timestamp.secs(), timestamp.subsec_nanos())
}
