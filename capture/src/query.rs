use common_s3::S3Client;
use serde_json::Value;
use tracing::instrument;

use crate::api::CaptureError;
use crate::fetch::PublicBatchClient;
use crate::identity::validate_public_user_id;
use crate::keys::{
    batch_id_from_file_name, file_name, stored_batch_key, user_prefix, users_prefix, validate_date,
    validate_path_segment,
};

const DELIMITER: &str = "/";

/// Ids of every batch a user stored on `date`, oldest first.
#[instrument(skip(store))]
pub async fn batch_ids_for_user(
    store: &dyn S3Client,
    date: &str,
    public_user_id: &str,
) -> Result<Vec<String>, CaptureError> {
    validate_date(date)?;
    validate_public_user_id(public_user_id)?;
    validate_path_segment(date)?;
    validate_path_segment(public_user_id)?;

    let keys = store.list_keys(&user_prefix(date, public_user_id)).await?;

    let mut file_names: Vec<&str> = keys.iter().map(|key| file_name(key)).collect();
    file_names.sort_unstable();

    Ok(file_names
        .into_iter()
        .filter_map(|name| match batch_id_from_file_name(name) {
            Some(batch_id) => Some(batch_id.to_string()),
            None => {
                tracing::warn!(file_name = name, "skipping object that is not a batch");
                None
            }
        })
        .collect())
}

/// Public ids of every user that stored at least one batch on `date`.
#[instrument(skip(store))]
pub async fn users_for_date(store: &dyn S3Client, date: &str) -> Result<Vec<String>, CaptureError> {
    validate_date(date)?;
    validate_path_segment(date)?;

    let prefix = users_prefix(date);
    let prefixes = store.list_common_prefixes(&prefix, DELIMITER).await?;

    Ok(prefixes
        .iter()
        .filter_map(|common| common.strip_prefix(prefix.as_str()))
        .map(|user| user.trim_matches('/'))
        .filter(|user| !user.is_empty())
        .map(str::to_string)
        .collect())
}

/// Stored JSON of one batch, downloaded through the public URL.
#[instrument(skip(client))]
pub async fn fetch_batch(
    client: &PublicBatchClient,
    date: &str,
    public_user_id: &str,
    batch_id: &str,
) -> Result<Value, CaptureError> {
    validate_date(date)?;
    validate_public_user_id(public_user_id)?;
    for segment in [date, public_user_id, batch_id] {
        validate_path_segment(segment)?;
    }

    client
        .fetch_json(&stored_batch_key(date, public_user_id, batch_id))
        .await
}
