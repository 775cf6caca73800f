use metrics::{counter, histogram};
use tracing::instrument;

use crate::api::CaptureError;
use crate::batch::{Batch, HashedBatch};
use crate::identity::{hash_user_id, validate_user_id};
use crate::keys::batch_key;
use crate::prometheus::report_dropped_batches;
use crate::router;

pub const MAX_BATCH_SIZE: usize = 100;
pub const BATCH_CONTENT_TYPE: &str = "application/gzip";

/// Validate, pseudonymize, store and remember a submitted batch. Returns the
/// public user id the batch was filed under.
///
/// The last-batch slot is only updated once the store accepted the write, so
/// it never shows a batch that failed to persist.
#[instrument(skip_all, fields(batch_size = batch.items.len(), public_user_id, key))]
pub async fn process_batch(state: &router::State, batch: Batch) -> Result<String, CaptureError> {
    if batch.items.len() > MAX_BATCH_SIZE {
        report_dropped_batches("batch_too_large");
        return Err(CaptureError::BatchTooLarge(batch.items.len()));
    }

    validate_user_id(&batch.user_id).map_err(|err| {
        report_dropped_batches(err.cause());
        err
    })?;

    counter!("capture_batches_received_total").increment(1);
    histogram!("capture_items_batch_size").record(batch.items.len() as f64);

    let public_user_id = hash_user_id(&batch.user_id);
    tracing::Span::current().record("public_user_id", public_user_id.as_str());

    let now = state.timesource.current_time();
    let hashed = HashedBatch::new(public_user_id.clone(), now, batch.items);
    let data = hashed.to_gzip_json()?;

    let key = batch_key(now, &public_user_id, &state.suffixes.next_suffix());
    tracing::Span::current().record("key", key.as_str());

    // Keys only differ by second and random suffix, so a collision replaces
    // the earlier object.
    if let Err(err) = state
        .store
        .put_object(&key, data, BATCH_CONTENT_TYPE)
        .await
    {
        report_dropped_batches("storage");
        tracing::error!("failed to store batch: {}", err);
        return Err(err.into());
    }

    state.last_batch.replace(hashed);
    counter!("capture_batches_stored_total").increment(1);
    tracing::debug!("stored batch");

    Ok(public_user_id)
}
