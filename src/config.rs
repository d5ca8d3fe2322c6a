//! Configuration loading and types.
//!
//! Configuration is read from a YAML file and deserialized into the
//! [`Config`] struct. Each adapter (loader, storage, result storage) has its
//! own section with independent connection settings, so the three roles can
//! point at different buckets, regions or even different S3-compatible
//! backends.
//!
//! Legacy installations configured through the old `tc_aws`-style field set
//! are supported via the `compatibility` section: when it is enabled, its
//! region/endpoint/bucket/root-path values override the per-adapter ones.
//! The override is resolved exactly once, when an adapter is constructed --
//! never per call.

use serde::Deserialize;
use std::path::Path;

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Fallback public-URL template used when S3 omits the `Location`
    /// response header. May contain a `{bucket_name}` placeholder.
    #[serde(default = "default_location_template")]
    pub default_location: String,

    /// Globally enables the `auto_webp` result-storage variant for clients
    /// that accept webp.
    #[serde(default)]
    pub auto_webp: bool,

    /// Store the signing key alongside every cached source image.
    #[serde(default)]
    pub store_security_key: bool,

    /// Signing key uploaded by `put_security_token`. Required when
    /// `store_security_key` is true.
    #[serde(default)]
    pub security_key: Option<String>,

    /// Source-image cache settings (Storage role).
    #[serde(default)]
    pub storage: StorageConfig,

    /// Rendered-result cache settings (ResultStorage role).
    #[serde(default)]
    pub result_storage: ResultStorageConfig,

    /// Original-input loader settings (Loader role).
    #[serde(default)]
    pub loader: LoaderConfig,

    /// Legacy `tc_aws`-compatible configuration namespace.
    #[serde(default)]
    pub compatibility: CompatibilityConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_location: default_location_template(),
            auto_webp: false,
            store_security_key: false,
            security_key: None,
            storage: StorageConfig::default(),
            result_storage: ResultStorageConfig::default(),
            loader: LoaderConfig::default(),
            compatibility: CompatibilityConfig::default(),
        }
    }
}

/// Storage-role (source cache) configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// AWS region objects are stored in.
    #[serde(default = "default_region")]
    pub region: String,

    /// Target bucket.
    #[serde(default = "default_bucket")]
    pub bucket: String,

    /// Key prefix for all stored objects.
    #[serde(default = "default_storage_root_path")]
    pub root_path: String,

    /// Explicit access key (falls back to the ambient credential chain).
    #[serde(default)]
    pub access_key_id: Option<String>,

    /// Explicit secret key (falls back to the ambient credential chain).
    #[serde(default)]
    pub secret_access_key: Option<String>,

    /// Custom S3-compatible endpoint (e.g. MinIO, LocalStack).
    #[serde(default)]
    pub endpoint_url: Option<String>,

    /// Canned ACL applied on writes. Unset means the backend default.
    #[serde(default)]
    pub acl: Option<String>,

    /// Freshness window in seconds. Unset means entries never expire.
    #[serde(default)]
    pub expiration_seconds: Option<u64>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            region: default_region(),
            bucket: default_bucket(),
            root_path: default_storage_root_path(),
            access_key_id: None,
            secret_access_key: None,
            endpoint_url: None,
            acl: None,
            expiration_seconds: None,
        }
    }
}

/// ResultStorage-role (rendered output cache) configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ResultStorageConfig {
    /// AWS region results are stored in.
    #[serde(default = "default_region")]
    pub region: String,

    /// Target bucket.
    #[serde(default = "default_bucket")]
    pub bucket: String,

    /// Key prefix for all cached results.
    #[serde(default = "default_result_storage_root_path")]
    pub root_path: String,

    /// Explicit access key (falls back to the ambient credential chain).
    #[serde(default)]
    pub access_key_id: Option<String>,

    /// Explicit secret key (falls back to the ambient credential chain).
    #[serde(default)]
    pub secret_access_key: Option<String>,

    /// Custom S3-compatible endpoint.
    #[serde(default)]
    pub endpoint_url: Option<String>,

    /// Canned ACL applied on writes. Unset means the backend default.
    #[serde(default)]
    pub acl: Option<String>,

    /// Freshness window in seconds. Unset means entries never expire.
    #[serde(default)]
    pub expiration_seconds: Option<u64>,
}

impl Default for ResultStorageConfig {
    fn default() -> Self {
        Self {
            region: default_region(),
            bucket: default_bucket(),
            root_path: default_result_storage_root_path(),
            access_key_id: None,
            secret_access_key: None,
            endpoint_url: None,
            acl: None,
            expiration_seconds: None,
        }
    }
}

/// Loader-role (source fetch) configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoaderConfig {
    /// AWS region source objects are loaded from.
    #[serde(default = "default_region")]
    pub region: String,

    /// Source bucket. An empty string means the first segment of each
    /// requested path names the bucket.
    #[serde(default = "default_bucket")]
    pub bucket: String,

    /// Key prefix for loaded objects.
    #[serde(default = "default_loader_root_path")]
    pub root_path: String,

    /// Explicit access key (falls back to the ambient credential chain).
    #[serde(default)]
    pub access_key_id: Option<String>,

    /// Explicit secret key (falls back to the ambient credential chain).
    #[serde(default)]
    pub secret_access_key: Option<String>,

    /// Custom S3-compatible endpoint.
    #[serde(default)]
    pub endpoint_url: Option<String>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            region: default_region(),
            bucket: default_bucket(),
            root_path: default_loader_root_path(),
            access_key_id: None,
            secret_access_key: None,
            endpoint_url: None,
        }
    }
}

/// Legacy `tc_aws`-compatible field set.
///
/// When `enabled` is true, these values replace the per-adapter region,
/// endpoint, bucket and root path wholesale.
#[derive(Debug, Clone, Deserialize)]
pub struct CompatibilityConfig {
    /// Run with the legacy field set instead of the per-adapter sections.
    #[serde(default)]
    pub enabled: bool,

    /// Legacy shared region.
    #[serde(default = "default_region")]
    pub region: String,

    /// Legacy shared endpoint override.
    #[serde(default)]
    pub endpoint_url: Option<String>,

    /// Legacy loader bucket. Empty keeps bucket-from-path mode.
    #[serde(default)]
    pub loader_bucket: String,

    /// Legacy loader key prefix.
    #[serde(default)]
    pub loader_root_path: String,

    /// Legacy storage bucket.
    #[serde(default)]
    pub storage_bucket: String,

    /// Legacy storage key prefix.
    #[serde(default)]
    pub storage_root_path: String,

    /// Legacy result-storage bucket.
    #[serde(default)]
    pub result_storage_bucket: String,

    /// Legacy result-storage key prefix.
    #[serde(default)]
    pub result_storage_root_path: String,
}

impl Default for CompatibilityConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            region: default_region(),
            endpoint_url: None,
            loader_bucket: String::new(),
            loader_root_path: String::new(),
            storage_bucket: String::new(),
            storage_root_path: String::new(),
            result_storage_bucket: String::new(),
            result_storage_root_path: String::new(),
        }
    }
}

/// Effective connection settings for one [`crate::client::S3Client`].
///
/// Produced from a [`Config`] by the `for_*` constructors below, with any
/// compatibility-mode remapping already applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3ClientConfig {
    pub region: String,
    pub bucket: String,
    pub root_path: String,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub endpoint_url: Option<String>,
    pub acl: Option<String>,
    pub expiration_seconds: Option<u64>,
    pub default_location: String,
}

impl S3ClientConfig {
    /// Resolve the Storage adapter's effective settings.
    pub fn for_storage(config: &Config) -> Self {
        let mut resolved = Self {
            region: config.storage.region.clone(),
            bucket: config.storage.bucket.clone(),
            root_path: config.storage.root_path.clone(),
            access_key_id: config.storage.access_key_id.clone(),
            secret_access_key: config.storage.secret_access_key.clone(),
            endpoint_url: config.storage.endpoint_url.clone(),
            acl: config.storage.acl.clone(),
            expiration_seconds: config.storage.expiration_seconds,
            default_location: config.default_location.clone(),
        };
        if config.compatibility.enabled {
            resolved.region = config.compatibility.region.clone();
            resolved.endpoint_url = config.compatibility.endpoint_url.clone();
            resolved.bucket = config.compatibility.storage_bucket.clone();
            resolved.root_path = config.compatibility.storage_root_path.clone();
        }
        resolved
    }

    /// Resolve the ResultStorage adapter's effective settings.
    pub fn for_result_storage(config: &Config) -> Self {
        let mut resolved = Self {
            region: config.result_storage.region.clone(),
            bucket: config.result_storage.bucket.clone(),
            root_path: config.result_storage.root_path.clone(),
            access_key_id: config.result_storage.access_key_id.clone(),
            secret_access_key: config.result_storage.secret_access_key.clone(),
            endpoint_url: config.result_storage.endpoint_url.clone(),
            acl: config.result_storage.acl.clone(),
            expiration_seconds: config.result_storage.expiration_seconds,
            default_location: config.default_location.clone(),
        };
        if config.compatibility.enabled {
            resolved.region = config.compatibility.region.clone();
            resolved.endpoint_url = config.compatibility.endpoint_url.clone();
            resolved.bucket = config.compatibility.result_storage_bucket.clone();
            resolved.root_path = config.compatibility.result_storage_root_path.clone();
        }
        resolved
    }

    /// Resolve the Loader adapter's effective settings.
    ///
    /// Loaded objects are never served from a freshness window, so the
    /// expiration field stays unset.
    pub fn for_loader(config: &Config) -> Self {
        let mut resolved = Self {
            region: config.loader.region.clone(),
            bucket: config.loader.bucket.clone(),
            root_path: config.loader.root_path.clone(),
            access_key_id: config.loader.access_key_id.clone(),
            secret_access_key: config.loader.secret_access_key.clone(),
            endpoint_url: config.loader.endpoint_url.clone(),
            acl: None,
            expiration_seconds: None,
            default_location: config.default_location.clone(),
        };
        if config.compatibility.enabled {
            resolved.region = config.compatibility.region.clone();
            resolved.endpoint_url = config.compatibility.endpoint_url.clone();
            resolved.bucket = config.compatibility.loader_bucket.clone();
            resolved.root_path = config.compatibility.loader_root_path.clone();
        }
        resolved
    }
}

// -- Defaults ----------------------------------------------------------------

fn default_location_template() -> String {
    "https://{bucket_name}.s3.amazonaws.com".to_string()
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_bucket() -> String {
    "imgstore".to_string()
}

fn default_storage_root_path() -> String {
    "/st".to_string()
}

fn default_result_storage_root_path() -> String {
    "/rs".to_string()
}

fn default_loader_root_path() -> String {
    "/st".to_string()
}

// -- Loader ------------------------------------------------------------------

/// Load and parse configuration from a YAML file at `path`.
pub fn load_config<P: AsRef<Path>>(path: P) -> anyhow::Result<Config> {
    let contents = std::fs::read_to_string(path.as_ref())?;
    let config: Config = serde_yaml::from_str(&contents)?;
    Ok(config)
}
