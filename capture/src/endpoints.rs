use axum::extract::{Path, State};
use axum::Json;
use serde_json::Value;
use tracing::instrument;

use crate::api::{BatchIdsResponse, BatchResponse, CaptureError, ResponseStatus, StatusResponse};
use crate::batch::{Batch, HashedBatch};
use crate::{ingest, query, router};

pub async fn index() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: ResponseStatus::Ok,
    })
}

pub async fn create_batch(
    state: State<router::State>,
    Json(batch): Json<Batch>,
) -> Result<Json<BatchResponse>, CaptureError> {
    let public_user_id = ingest::process_batch(&state, batch).await?;

    Ok(Json(BatchResponse {
        status: ResponseStatus::Ok,
        public_user_id,
    }))
}

#[instrument(skip_all, fields(date, public_user_id, batch_count))]
pub async fn batch_ids(
    state: State<router::State>,
    Path((date, public_user_id)): Path<(String, String)>,
) -> Result<Json<BatchIdsResponse>, CaptureError> {
    tracing::Span::current().record("date", date.as_str());
    tracing::Span::current().record("public_user_id", public_user_id.as_str());

    let batch_ids = query::batch_ids_for_user(state.store.as_ref(), &date, &public_user_id)
        .await
        .map_err(log_query_error)?;
    tracing::Span::current().record("batch_count", batch_ids.len());

    Ok(Json(BatchIdsResponse { batch_ids }))
}

#[instrument(skip_all, fields(date, public_user_id, batch_id))]
pub async fn batch(
    state: State<router::State>,
    Path((date, public_user_id, batch_id)): Path<(String, String, String)>,
) -> Result<Json<Value>, CaptureError> {
    tracing::Span::current().record("date", date.as_str());
    tracing::Span::current().record("public_user_id", public_user_id.as_str());
    tracing::Span::current().record("batch_id", batch_id.as_str());

    let stored = query::fetch_batch(&state.public_batches, &date, &public_user_id, &batch_id)
        .await
        .map_err(log_query_error)?;

    Ok(Json(stored))
}

pub async fn latest_batch(state: State<router::State>) -> Json<Vec<HashedBatch>> {
    Json(state.last_batch.snapshot())
}

#[instrument(skip_all, fields(date))]
pub async fn users(
    state: State<router::State>,
    Path(date): Path<String>,
) -> Result<Json<Vec<String>>, CaptureError> {
    tracing::Span::current().record("date", date.as_str());

    let users = query::users_for_date(state.store.as_ref(), &date)
        .await
        .map_err(log_query_error)?;

    Ok(Json(users))
}

fn log_query_error(err: CaptureError) -> CaptureError {
    tracing::warn!(cause = err.cause(), "query rejected: {}", err);
    err
}
