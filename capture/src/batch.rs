use std::io::prelude::*;

use bytes::Bytes;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::api::CaptureError;

/// One crawled page.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Item {
    pub timestamp: i64,
    pub source: String,
    pub url: String,
    pub title: String,
    pub extract: String,
    pub links: Vec<String>,
}

/// Batch as submitted by a crawler, still carrying the raw user id.
#[derive(Debug, Deserialize)]
pub struct Batch {
    pub user_id: String,
    pub items: Vec<Item>,
}

/// Batch as stored and served: the raw user id is replaced by its hash and the
/// ingestion time is attached.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct HashedBatch {
    pub user_id_hash: String,
    /// Seconds since the unix epoch, with sub-second precision.
    pub timestamp: f64,
    pub items: Vec<Item>,
}

impl HashedBatch {
    pub fn new(user_id_hash: String, now: OffsetDateTime, items: Vec<Item>) -> Self {
        Self {
            user_id_hash,
            timestamp: epoch_seconds(now),
            items,
        }
    }

    /// Compact JSON, gzip compressed: the stored object body.
    pub fn to_gzip_json(&self) -> Result<Bytes, CaptureError> {
        let json = serde_json::to_vec(self).map_err(|e| {
            tracing::error!("failed to serialize batch: {}", e);
            CaptureError::EncodingError(e.to_string())
        })?;

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder
            .write_all(&json)
            .map_err(|e| CaptureError::EncodingError(e.to_string()))?;
        let compressed = encoder
            .finish()
            .map_err(|e| CaptureError::EncodingError(e.to_string()))?;

        Ok(Bytes::from(compressed))
    }
}

fn epoch_seconds(now: OffsetDateTime) -> f64 {
    now.unix_timestamp() as f64 + f64::from(now.nanosecond()) / 1_000_000_000.0
}
