//! S3-backed storage adapters for an image-processing host.
//!
//! Implements the host's three storage extension points against one
//! S3-compatible object store:
//!
//! - [`Loader`] fetches original inputs (read-only, with optional
//!   bucket-from-path resolution),
//! - [`Storage`] caches source images plus their sidecar metadata
//!   (signing token, detector output),
//! - [`ResultStorage`] caches final rendered output keyed by request URL.
//!
//! All three are thin facades over [`client::S3Client`], which owns the
//! shared connection, the uniform status/body/last-modified read contract
//! and the freshness policy.

pub mod client;
pub mod config;
pub mod errors;
pub mod loader;
pub mod mime;
pub mod normalizer;
pub mod result_storage;
pub mod storage;

pub use client::{Expiry, GetResponse, S3Client};
pub use config::{load_config, Config, S3ClientConfig};
pub use errors::{Error, Result};
pub use loader::{Loader, LoaderErrorCode, LoaderResult};
pub use normalizer::normalize;
pub use result_storage::{ResultMetadata, ResultStorage, ResultStorageResult};
pub use storage::Storage;
