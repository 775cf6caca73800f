use std::io::Read;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use flate2::read::GzDecoder;
use metrics::counter;
use serde_json::Value;
use tracing::instrument;

use crate::api::CaptureError;

const BATCH_FETCH_TOTAL: &str = "capture_batch_fetch_total";

/// Upper bound on a downloaded object. A full batch of 100 pages compresses to
/// well under a megabyte.
pub const MAX_DOWNLOAD_BYTES: usize = 8 * 1024 * 1024;
/// Upper bound on the JSON a downloaded object may inflate to.
pub const MAX_DECODED_BYTES: usize = 32 * 1024 * 1024;

/// Downloads stored batches through the bucket's public URL.
#[derive(Clone)]
pub struct PublicBatchClient {
    client: reqwest::Client,
    url_prefix: String,
    max_download_bytes: usize,
}

impl PublicBatchClient {
    /// `url_prefix` is joined verbatim with object keys, so it must end with `/`.
    pub fn new(url_prefix: String, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url_prefix,
            max_download_bytes: MAX_DOWNLOAD_BYTES,
        })
    }

    pub fn with_max_download_bytes(mut self, max_download_bytes: usize) -> Self {
        self.max_download_bytes = max_download_bytes;
        self
    }

    pub fn url_for(&self, key: &str) -> String {
        format!("{}{key}", self.url_prefix)
    }

    /// Fetch the object at `key`, gunzip it and parse it as JSON. The value is
    /// returned as stored, without checking it against the batch schema.
    #[instrument(skip(self))]
    pub async fn fetch_json(&self, key: &str) -> Result<Value, CaptureError> {
        let url = self.url_for(key);
        let result = self.download(&url).await.and_then(|body| decode_gzip_json(&body));

        match &result {
            Ok(_) => counter!(BATCH_FETCH_TOTAL, "outcome" => "success").increment(1),
            Err(e) => {
                tracing::warn!(url = %url, "failed to fetch batch: {}", e);
                counter!(BATCH_FETCH_TOTAL, "outcome" => "error").increment(1)
            }
        }
        result
    }

    async fn download(&self, url: &str) -> Result<Bytes, CaptureError> {
        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| CaptureError::FetchError(e.to_string()))?;

        let too_large = || {
            CaptureError::FetchError(format!(
                "body larger than {} bytes",
                self.max_download_bytes
            ))
        };

        let declared = response.content_length().unwrap_or(0);
        if usize::try_from(declared).map_or(true, |len| len > self.max_download_bytes) {
            return Err(too_large());
        }

        // Content-Length may be absent or wrong, so count while reading.
        let mut body = BytesMut::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| CaptureError::FetchError(e.to_string()))?
        {
            if body.len() + chunk.len() > self.max_download_bytes {
                return Err(too_large());
            }
            body.extend_from_slice(&chunk);
        }
        Ok(body.freeze())
    }
}

pub fn decode_gzip_json(data: &[u8]) -> Result<Value, CaptureError> {
    decode_gzip_json_limited(data, MAX_DECODED_BYTES)
}

fn decode_gzip_json_limited(data: &[u8], limit: usize) -> Result<Value, CaptureError> {
    let mut json = Vec::new();
    GzDecoder::new(data)
        .take(limit as u64 + 1)
        .read_to_end(&mut json)
        .map_err(|e| CaptureError::FetchError(format!("invalid gzip body: {e}")))?;
    if json.len() > limit {
        return Err(CaptureError::FetchError(format!(
            "body inflates past {limit} bytes"
        )));
    }

    serde_json::from_slice(&json)
        .map_err(|e| CaptureError::FetchError(format!("invalid JSON body: {e}")))
}
