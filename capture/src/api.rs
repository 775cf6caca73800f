use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use common_s3::S3Error;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::identity::{PUBLIC_USER_ID_LENGTH, USER_ID_LENGTH};
use crate::ingest::MAX_BATCH_SIZE;

#[derive(Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Ok,
}

#[derive(Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct StatusResponse {
    pub status: ResponseStatus,
}

#[derive(Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct BatchResponse {
    pub status: ResponseStatus,
    pub public_user_id: String,
}

#[derive(Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct BatchIdsResponse {
    pub batch_ids: Vec<String>,
}

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Batch size too large (maximum {max}), got {0}", max = MAX_BATCH_SIZE)]
    BatchTooLarge(usize),
    #[error("User ID length is incorrect, should be {len} characters", len = USER_ID_LENGTH)]
    InvalidUserIdLength,
    #[error("Incorrect public user ID length, should be {len}", len = PUBLIC_USER_ID_LENGTH)]
    InvalidPublicUserIdLength,
    #[error("Incorrect date format, should be YYYY-MM-DD")]
    InvalidDate,
    #[error("Invalid path segment: {0}")]
    InvalidPathSegment(String),

    #[error("failed to encode batch: {0}")]
    EncodingError(String),
    #[error("storage request failed: {0}")]
    StorageError(#[from] S3Error),
    #[error("failed to fetch batch: {0}")]
    FetchError(String),
}

impl CaptureError {
    /// Short label for metrics and logs.
    pub fn cause(&self) -> &'static str {
        match self {
            CaptureError::BatchTooLarge(_) => "batch_too_large",
            CaptureError::InvalidUserIdLength => "bad_user_id",
            CaptureError::InvalidPublicUserIdLength => "bad_public_user_id",
            CaptureError::InvalidDate => "bad_date",
            CaptureError::InvalidPathSegment(_) => "bad_path_segment",
            CaptureError::EncodingError(_) => "encoding",
            CaptureError::StorageError(_) => "storage",
            CaptureError::FetchError(_) => "fetch",
        }
    }
}

impl IntoResponse for CaptureError {
    fn into_response(self) -> Response {
        match self {
            CaptureError::BatchTooLarge(_)
            | CaptureError::InvalidUserIdLength
            | CaptureError::InvalidPublicUserIdLength
            | CaptureError::InvalidDate
            | CaptureError::InvalidPathSegment(_) => (StatusCode::BAD_REQUEST, self.to_string()),

            CaptureError::EncodingError(_) | CaptureError::StorageError(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }

            CaptureError::FetchError(_) => (StatusCode::BAD_GATEWAY, self.to_string()),
        }
        .into_response()
    }
}
