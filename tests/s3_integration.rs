//! Integration tests against a live S3-compatible endpoint.
//!
//! Point `IMGSTORE_TEST_ENDPOINT` at an S3-compatible server (for example
//! LocalStack: `http://localhost:4566`) to run these. Without the variable
//! every test skips itself, so the suite is safe in offline builds.
//!
//! The fixture bucket is created idempotently on each run; object keys are
//! suffixed with a per-call nanosecond stamp so reruns never collide.

use bytes::Bytes;
use imgstore_s3::{Config, Error, Expiry, Loader, LoaderErrorCode, ResultStorage, Storage};

const ENDPOINT_VAR: &str = "IMGSTORE_TEST_ENDPOINT";
const BUCKET: &str = "imgstore-tests";

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init();
}

/// Build the adapter configuration and make sure the fixture bucket
/// exists. Returns `None` (skipping the test) when no endpoint is set.
async fn setup() -> Option<Config> {
    let endpoint = std::env::var(ENDPOINT_VAR).ok()?;
    init_logging();

    let yaml = format!(
        r#"
default_location: "{endpoint}/{{bucket_name}}"
storage:
  bucket: {BUCKET}
  root_path: /it/st
  endpoint_url: {endpoint}
  access_key_id: test
  secret_access_key: test
result_storage:
  bucket: {BUCKET}
  root_path: /it/rs
  endpoint_url: {endpoint}
  access_key_id: test
  secret_access_key: test
loader:
  bucket: {BUCKET}
  root_path: ""
  endpoint_url: {endpoint}
  access_key_id: test
  secret_access_key: test
"#
    );
    let config: Config = serde_yaml::from_str(&yaml).expect("test configuration parses");

    ensure_bucket(&endpoint).await;
    Some(config)
}

/// Create the fixture bucket, ignoring "already exists" outcomes.
async fn ensure_bucket(endpoint: &str) {
    let sdk_config = aws_sdk_s3::config::Builder::new()
        .behavior_version(aws_sdk_s3::config::BehaviorVersion::latest())
        .region(aws_sdk_s3::config::Region::new("us-east-1"))
        .endpoint_url(endpoint)
        .force_path_style(true)
        .credentials_provider(aws_sdk_s3::config::Credentials::new(
            "test", "test", None, None, "tests",
        ))
        .build();
    let client = aws_sdk_s3::Client::from_conf(sdk_config);
    let _ = client.create_bucket().bucket(BUCKET).send().await;
}

fn unique_suffix() -> u128 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("clock after epoch")
        .as_nanos()
}

/// A path unique to this call, so reruns and parallel tests never collide.
fn unique_path(tag: &str) -> String {
    format!("/{tag}-{}", unique_suffix())
}

#[tokio::test]
async fn test_put_then_get_round_trips_bytes() {
    let Some(config) = setup().await else { return };
    let storage = Storage::new(&config);

    let path = unique_path("round-trip");
    storage
        .put(&path, Bytes::from_static(b"hello"))
        .await
        .expect("put succeeds");

    let body = storage.get(&path).await.expect("get succeeds");
    assert_eq!(&body[..], b"hello");
}

#[tokio::test]
async fn test_get_on_never_written_path_is_not_found() {
    let Some(config) = setup().await else { return };
    let storage = Storage::new(&config);

    let err = storage
        .get(&unique_path("never-written"))
        .await
        .expect_err("missing object is an error");
    assert!(matches!(err, Error::NotFound { .. }));
}

#[tokio::test]
async fn test_exists_lifecycle_across_put_and_remove() {
    let Some(config) = setup().await else { return };
    let storage = Storage::new(&config);
    let path = unique_path("lifecycle");

    assert!(!storage.exists(&path).await.expect("probe before write"));

    storage
        .put(&path, Bytes::from_static(b"payload"))
        .await
        .expect("put succeeds");
    assert!(storage.exists(&path).await.expect("probe after write"));

    storage.remove(&path).await.expect("remove succeeds");
    assert!(!storage.exists(&path).await.expect("probe after remove"));

    // Removing a path that was never written is a successful no-op.
    storage
        .remove(&unique_path("never-written"))
        .await
        .expect("remove of missing key succeeds");
}

#[tokio::test]
async fn test_get_data_recovers_missing_key_as_404() {
    let Some(config) = setup().await else { return };
    let storage = Storage::new(&config);

    let response = storage
        .client()
        .get_data(BUCKET, "it/st/no-such-key", Expiry::Never)
        .await
        .expect("missing key is not an error");
    assert_eq!(response.status, 404);
    assert!(response.body.is_empty());
    assert!(response.last_modified.is_none());
}

#[tokio::test]
async fn test_get_data_applies_expiry_statuses() {
    let Some(config) = setup().await else { return };
    let storage = Storage::new(&config);
    let client = storage.client();

    let key = format!("it/raw{}", unique_path("/expiry"));
    client
        .upload(&key, Bytes::from_static(b"stale?"), "text/plain")
        .await
        .expect("upload succeeds");

    // Window of zero: always expired, body withheld, timestamp kept so
    // callers can inspect staleness.
    let expired = client
        .get_data(BUCKET, &key, Expiry::Seconds(0))
        .await
        .expect("expired read is not an error");
    assert_eq!(expired.status, 410);
    assert!(expired.body.is_empty());
    assert!(expired.last_modified.is_some());

    // No window: served regardless of age.
    let fresh = client
        .get_data(BUCKET, &key, Expiry::Never)
        .await
        .expect("read succeeds");
    assert_eq!(fresh.status, 200);
    assert_eq!(&fresh.body[..], b"stale?");
}

#[tokio::test]
async fn test_get_data_passes_through_other_backend_statuses() {
    let Some(config) = setup().await else { return };
    let client = Storage::new(&config);

    // A bucket that was never created fails with NoSuchBucket, which is
    // not the recovered NoSuchKey case: the status passes through and the
    // body carries a diagnostic instead of being empty.
    let missing_bucket = format!("no-such-bucket-{}", unique_suffix());
    let response = client
        .client()
        .get_data(&missing_bucket, "any-key", Expiry::Never)
        .await
        .expect("backend error status is not a transport fault");
    assert_ne!(response.status, 200);
    assert!(!response.body.is_empty(), "diagnostic body expected");
    assert!(response.last_modified.is_none());
}

#[tokio::test]
async fn test_sidecars_are_isolated_from_each_other() {
    let Some(config) = setup().await else { return };

    let mut with_token = config.clone();
    with_token.store_security_key = true;
    with_token.security_key = Some("sekrit".to_string());
    let storage = Storage::new(&with_token);

    // Detector data alone does not make the security token appear.
    let detector_path = unique_path("detector-only");
    let data = serde_json::json!({"k": "v"});
    storage
        .put_detector_data(&detector_path, &data)
        .await
        .expect("detector put succeeds");
    assert_eq!(
        storage
            .get_detector_data(&detector_path)
            .await
            .expect("detector get succeeds"),
        data
    );
    let err = storage
        .get_security_token(&detector_path)
        .await
        .expect_err("no token was stored");
    assert!(matches!(err, Error::NotFound { .. }));

    // And a security token alone does not make detector data appear.
    let token_path = unique_path("token-only");
    storage
        .put_security_token(&token_path)
        .await
        .expect("token put succeeds")
        .expect("feature is enabled");
    assert_eq!(
        storage
            .get_security_token(&token_path)
            .await
            .expect("token get succeeds"),
        "sekrit"
    );
    let err = storage
        .get_detector_data(&token_path)
        .await
        .expect_err("no detector data was stored");
    assert!(matches!(err, Error::NotFound { .. }));
}

#[tokio::test]
async fn test_result_storage_round_trip_with_metadata() {
    let Some(config) = setup().await else { return };
    let results = ResultStorage::new(&config);

    let request_url = unique_path("img") + ".png";
    let png = Bytes::from_static(b"\x89PNG\r\n\x1a\nfake-image-data");
    results
        .put(&request_url, false, png.clone())
        .await
        .expect("put succeeds");

    let cached = results
        .get(&request_url, false)
        .await
        .expect("get succeeds")
        .expect("result is present");
    assert_eq!(cached.buffer, png);
    assert_eq!(cached.metadata.content_length, png.len());
    assert_eq!(cached.metadata.content_type, "image/png");
    assert!(cached.metadata.last_modified.is_some());
}

#[tokio::test]
async fn test_result_storage_get_misses_cleanly() {
    let Some(config) = setup().await else { return };
    let results = ResultStorage::new(&config);

    let cached = results
        .get(&(unique_path("cold") + ".jpg"), false)
        .await
        .expect("miss is not an error");
    assert!(cached.is_none());
}

#[tokio::test]
async fn test_loader_fetches_sources_and_reports_missing_ones() {
    let Some(config) = setup().await else { return };
    let loader = Loader::new(&config);

    let path = unique_path("source") + ".jpg";
    let key = path.trim_start_matches('/').to_string();
    loader
        .client()
        .upload(&key, Bytes::from_static(b"\xFF\xD8\xFF\xE0source"), "image/jpeg")
        .await
        .expect("fixture upload succeeds");

    let result = loader.load(&path).await.expect("load succeeds");
    assert!(result.successful);
    assert_eq!(&result.buffer[..], b"\xFF\xD8\xFF\xE0source");
    assert_eq!(result.size, result.buffer.len());
    assert!(result.updated_at.is_some());

    let missing = loader
        .load(&unique_path("missing-source"))
        .await
        .expect("missing source is not an error");
    assert!(!missing.successful);
    assert_eq!(missing.error, Some(LoaderErrorCode::NotFound));
    assert!(missing.diagnostic.is_some());
}
