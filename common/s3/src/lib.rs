//! Blob storage client used by crawler capture.
//!
//! A thin trait over the S3 operations the service needs (put an object, list
//! keys under a prefix, list "directories" under a prefix) so that handlers can
//! be tested against the in-memory mock instead of a live bucket. Works against
//! any S3-compatible backend (Backblaze B2, MinIO, localstack) via a custom
//! endpoint.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::{
    config::{Credentials, Region},
    error::SdkError,
    primitives::ByteStream,
    Client as AwsS3SdkClient,
};
use bytes::Bytes;
use metrics::{counter, histogram};
use thiserror::Error;
use tracing::{debug, error, info};

const S3_UPLOAD_BODY_SIZE_BYTES: &str = "s3_upload_body_size_bytes";
const S3_UPLOAD_DURATION_SECONDS: &str = "s3_upload_duration_seconds";
const S3_UPLOAD_TOTAL: &str = "s3_upload_total";
const S3_LIST_DURATION_SECONDS: &str = "s3_list_duration_seconds";
const S3_LIST_TOTAL: &str = "s3_list_total";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum S3Error {
    #[error("Failed to upload {key}: {reason}")]
    UploadFailed { key: String, reason: String },
    #[error("Failed to list objects under {prefix}: {reason}")]
    ListFailed { prefix: String, reason: String },
}

/// S3 client trait that both real and mock implementations use
#[async_trait]
pub trait S3Client: Send + Sync {
    /// Write `data` under `key`, replacing any existing object.
    async fn put_object(&self, key: &str, data: Bytes, content_type: &str) -> Result<(), S3Error>;

    /// Every key under `prefix`, in the order the backend returns them.
    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, S3Error>;

    /// The distinct common prefixes directly under `prefix`, each ending with
    /// `delimiter`.
    async fn list_common_prefixes(
        &self,
        prefix: &str,
        delimiter: &str,
    ) -> Result<Vec<String>, S3Error>;
}

/// Extract error reason from SdkError for metrics labeling
fn extract_error_reason<E: std::fmt::Debug>(err: &SdkError<E>) -> String {
    match err {
        SdkError::ConstructionFailure(_) => "construction_failure".to_string(),
        SdkError::TimeoutError(_) => "timeout".to_string(),
        SdkError::DispatchFailure(_) => "connection_error".to_string(),
        SdkError::ResponseError(err) => {
            format!("response_error_{}", err.raw().status().as_u16())
        }
        SdkError::ServiceError(err) => {
            format!("status_{}", err.raw().status().as_u16())
        }
        _ => "unknown".to_string(),
    }
}

/// Configuration for creating an S3 client.
pub struct S3Config {
    pub bucket: String,
    pub region: String,
    pub endpoint: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
}

/// Real S3 client implementation
#[derive(Clone)]
pub struct S3Impl {
    client: AwsS3SdkClient,
    bucket: String,
}

impl S3Impl {
    /// Uses the default AWS credential chain unless explicit credentials are
    /// provided in the config.
    pub async fn new(config: S3Config) -> Self {
        let region = Region::new(config.region.clone());

        let aws_config = aws_config::defaults(BehaviorVersion::latest())
            .region(region.clone())
            .load()
            .await;

        let mut s3_config_builder = aws_sdk_s3::config::Builder::from(&aws_config)
            .region(region)
            .force_path_style(true); // Required for B2/MinIO compatibility

        if let Some(endpoint) = &config.endpoint {
            s3_config_builder = s3_config_builder.endpoint_url(endpoint);
        }

        if let (Some(access_key), Some(secret_key)) =
            (&config.access_key_id, &config.secret_access_key)
        {
            let credentials = Credentials::new(access_key, secret_key, None, None, "env");
            s3_config_builder = s3_config_builder.credentials_provider(credentials);
        }

        let client = AwsS3SdkClient::from_conf(s3_config_builder.build());

        info!(
            bucket = %config.bucket,
            endpoint = ?config.endpoint,
            "S3 client initialized"
        );

        Self {
            client,
            bucket: config.bucket,
        }
    }

    /// Pages through `list_objects_v2`, handing each page to `collect`.
    async fn list_pages<F>(
        &self,
        prefix: &str,
        delimiter: Option<&str>,
        mut collect: F,
    ) -> Result<(), S3Error>
    where
        F: FnMut(&aws_sdk_s3::operation::list_objects_v2::ListObjectsV2Output),
    {
        let start = Instant::now();
        let mut continuation_token: Option<String> = None;

        loop {
            let mut req = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(prefix);
            if let Some(delimiter) = delimiter {
                req = req.delimiter(delimiter);
            }
            if let Some(token) = continuation_token.take() {
                req = req.continuation_token(token);
            }

            let response = match req.send().await {
                Ok(response) => response,
                Err(e) => {
                    let reason = extract_error_reason(&e);
                    counter!(S3_LIST_TOTAL, "outcome" => "error", "reason" => reason.clone())
                        .increment(1);
                    error!(
                        bucket = self.bucket,
                        prefix = prefix,
                        error = %e,
                        reason = reason,
                        "Failed to list S3 objects"
                    );
                    return Err(S3Error::ListFailed {
                        prefix: prefix.to_string(),
                        reason: e.to_string(),
                    });
                }
            };

            collect(&response);

            match (response.is_truncated(), response.next_continuation_token()) {
                (Some(true), Some(token)) => continuation_token = Some(token.to_string()),
                _ => break,
            }
        }

        histogram!(S3_LIST_DURATION_SECONDS).record(start.elapsed().as_secs_f64());
        counter!(S3_LIST_TOTAL, "outcome" => "success", "reason" => "ok").increment(1);
        Ok(())
    }
}

#[async_trait]
impl S3Client for S3Impl {
    async fn put_object(&self, key: &str, data: Bytes, content_type: &str) -> Result<(), S3Error> {
        let body_size = data.len();
        histogram!(S3_UPLOAD_BODY_SIZE_BYTES).record(body_size as f64);

        let start = Instant::now();
        let result = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(data))
            .content_type(content_type)
            .send()
            .await;

        histogram!(S3_UPLOAD_DURATION_SECONDS).record(start.elapsed().as_secs_f64());

        match result {
            Ok(_) => {
                counter!(S3_UPLOAD_TOTAL, "outcome" => "success", "reason" => "ok").increment(1);
                debug!(bucket = self.bucket, key = key, body_size, "uploaded object");
                Ok(())
            }
            Err(e) => {
                let reason = extract_error_reason(&e);
                counter!(S3_UPLOAD_TOTAL, "outcome" => "error", "reason" => reason.clone())
                    .increment(1);
                error!(
                    bucket = self.bucket,
                    key = key,
                    error = %e,
                    reason = reason,
                    "Failed to upload to S3"
                );
                Err(S3Error::UploadFailed {
                    key: key.to_string(),
                    reason: e.to_string(),
                })
            }
        }
    }

    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, S3Error> {
        let mut keys = Vec::new();
        self.list_pages(prefix, None, |page| {
            keys.extend(
                page.contents()
                    .iter()
                    .filter_map(|object| object.key().map(str::to_string)),
            );
        })
        .await?;
        Ok(keys)
    }

    async fn list_common_prefixes(
        &self,
        prefix: &str,
        delimiter: &str,
    ) -> Result<Vec<String>, S3Error> {
        let mut prefixes = Vec::new();
        self.list_pages(prefix, Some(delimiter), |page| {
            prefixes.extend(
                page.common_prefixes()
                    .iter()
                    .filter_map(|common| common.prefix().map(str::to_string)),
            );
        })
        .await?;
        Ok(prefixes)
    }
}

/// In-memory S3 client for testing - always available, no conditional compilation needed.
///
/// Clones share the same object map, so a test can keep a handle to inspect
/// what the service wrote.
#[derive(Clone, Default)]
pub struct MockS3Client {
    objects: Arc<Mutex<BTreeMap<String, Bytes>>>,
    put_error: Option<String>,
    list_error: Option<String>,
}

impl MockS3Client {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every put fail with `reason`.
    pub fn put_error(mut self, reason: &str) -> Self {
        self.put_error = Some(reason.to_string());
        self
    }

    /// Make every listing fail with `reason`.
    pub fn list_error(mut self, reason: &str) -> Self {
        self.list_error = Some(reason.to_string());
        self
    }

    /// Seed an object, bypassing `put_object`.
    pub fn insert(&self, key: &str, data: impl Into<Bytes>) {
        self.lock().insert(key.to_string(), data.into());
    }

    pub fn get(&self, key: &str) -> Option<Bytes> {
        self.lock().get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, Bytes>> {
        self.objects.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl S3Client for MockS3Client {
    async fn put_object(&self, key: &str, data: Bytes, _content_type: &str) -> Result<(), S3Error> {
        if let Some(reason) = &self.put_error {
            return Err(S3Error::UploadFailed {
                key: key.to_string(),
                reason: reason.clone(),
            });
        }
        self.lock().insert(key.to_string(), data);
        Ok(())
    }

    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, S3Error> {
        if let Some(reason) = &self.list_error {
            return Err(S3Error::ListFailed {
                prefix: prefix.to_string(),
                reason: reason.clone(),
            });
        }
        Ok(self
            .lock()
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn list_common_prefixes(
        &self,
        prefix: &str,
        delimiter: &str,
    ) -> Result<Vec<String>, S3Error> {
        if let Some(reason) = &self.list_error {
            return Err(S3Error::ListFailed {
                prefix: prefix.to_string(),
                reason: reason.clone(),
            });
        }
        // Same rollup S3 does: everything up to and including the first
        // delimiter after the prefix.
        let prefixes: BTreeSet<String> = self
            .lock()
            .keys()
            .filter_map(|key| {
                let rest = key.strip_prefix(prefix)?;
                let end = rest.find(delimiter)?;
                Some(format!("{prefix}{}", &rest[..end + delimiter.len()]))
            })
            .collect();
        Ok(prefixes.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_put_then_list_keys() {
        let client = MockS3Client::new();
        client
            .put_object("a/b/1.json.gz", Bytes::from_static(b"one"), "application/gzip")
            .await
            .unwrap();
        client
            .put_object("a/c/2.json.gz", Bytes::from_static(b"two"), "application/gzip")
            .await
            .unwrap();

        let keys = client.list_keys("a/b/").await.unwrap();
        assert_eq!(keys, vec!["a/b/1.json.gz".to_string()]);
        assert_eq!(client.get("a/c/2.json.gz"), Some(Bytes::from_static(b"two")));
    }

    #[tokio::test]
    async fn test_mock_common_prefixes_roll_up_children() {
        let client = MockS3Client::new();
        client.insert("d/1/user-a/00001__aaaaaaaa.json.gz", "x");
        client.insert("d/1/user-a/00002__bbbbbbbb.json.gz", "x");
        client.insert("d/1/user-b/00003__cccccccc.json.gz", "x");
        client.insert("d/1/loose-file", "x");
        client.insert("e/1/user-c/00004__dddddddd.json.gz", "x");

        let prefixes = client.list_common_prefixes("d/1/", "/").await.unwrap();
        assert_eq!(
            prefixes,
            vec!["d/1/user-a/".to_string(), "d/1/user-b/".to_string()]
        );
    }

    #[tokio::test]
    async fn test_mock_empty_listing() {
        let client = MockS3Client::new();
        assert!(client.list_keys("nothing/").await.unwrap().is_empty());
        assert!(client
            .list_common_prefixes("nothing/", "/")
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_mock_errors() {
        let client = MockS3Client::new().put_error("boom").list_error("down");

        let put = client
            .put_object("k", Bytes::from_static(b"v"), "application/gzip")
            .await;
        assert!(matches!(put, Err(S3Error::UploadFailed { .. })));
        assert!(client.is_empty());

        let list = client.list_keys("k").await;
        assert!(matches!(list, Err(S3Error::ListFailed { .. })));
    }

    #[tokio::test]
    async fn test_mock_clones_share_objects() {
        let client = MockS3Client::new();
        let handle = client.clone();
        client
            .put_object("k", Bytes::from_static(b"v"), "application/gzip")
            .await
            .unwrap();
        assert_eq!(handle.len(), 1);
        assert_eq!(handle.keys(), vec!["k".to_string()]);
    }
}
